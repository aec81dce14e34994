use crate::dataset::common_structs::Example;
use crate::dataset::data_loaders::annotated_image_dataset::AnnotatedImageDataset;
use crate::dataset::errors::{DatasetError, DatasetResult};
use crate::dataset::iterator_adapters::{shard_indices, Batching, Shuffling};
use crate::dataset::DataLoader;
use log::debug;
use ndarray::{stack, Array2, Array4, ArrayView1, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

/// Several examples stacked along a new first axis
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Dataset index of every row
    pub indices: Vec<usize>,
    /// [B, 3, 224, 224]
    pub images: Array4<f32>,
    /// [B, L]
    pub labels: Array2<f32>,
    /// [B, 2K]
    pub landmarks: Array2<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchLoaderOptions {
    pub batch_size: usize,
    pub shuffle: bool,
    /// Seeds both the shuffling and the per item augmentations
    pub seed: u64,
    /// Mixed into the seed so every epoch sees another order
    pub epoch: u64,
    pub rank: usize,
    pub world_size: usize,
    pub drop_last: bool,
}

impl Default for BatchLoaderOptions {
    fn default() -> Self {
        BatchLoaderOptions {
            batch_size: 16,
            shuffle: true,
            seed: 0,
            epoch: 0,
            rank: 0,
            world_size: 1,
            drop_last: false,
        }
    }
}

/// Seed of the generator used for one item. Only depends on the item, never on which
/// thread loads it or in which order.
fn item_seed(seed: u64, epoch: u64, index: usize) -> u64 {
    let mut z = seed
        ^ epoch.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (index as u64).wrapping_mul(0xD1B5_4A32_D192_ED03);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Visiting order of `len` items for one epoch. Seed and epoch go through [`item_seed`], with
/// an index no item can have, so neighbouring (seed, epoch) pairs do not share an order.
fn epoch_order(len: usize, shuffle: bool, seed: u64, epoch: u64) -> Vec<usize> {
    if !shuffle {
        return (0..len).collect();
    }
    let order_seed = item_seed(seed, epoch, usize::MAX);
    (0..len).shuffling(len, StdRng::seed_from_u64(order_seed)).collect()
}

/// Stacks examples into a batch. Every example must have the same shapes.
pub fn collate(indices: Vec<usize>, examples: &[Example]) -> DatasetResult<Batch> {
    let shape_error = |e: ndarray::ShapeError| {
        DatasetError::data_format(PathBuf::new(), 0, format!("cannot stack examples: {}", e))
    };
    let images: Vec<ArrayView3<f32>> = examples.iter().map(|e| e.image.view()).collect();
    let labels: Vec<ArrayView1<f32>> = examples.iter().map(|e| e.label.view()).collect();
    let landmarks: Vec<ArrayView1<f32>> = examples.iter().map(|e| e.landmarks.view()).collect();
    Ok(Batch {
        indices,
        images: stack(Axis(0), &images).map_err(shape_error)?,
        labels: stack(Axis(0), &labels).map_err(shape_error)?,
        landmarks: stack(Axis(0), &landmarks).map_err(shape_error)?,
    })
}

/// Iterates over a (shuffled, sharded) dataset batch by batch.
///
/// The items of a batch are loaded in parallel. The first failing item fails the whole batch,
/// what to do next is up to the caller.
pub struct BatchLoader {
    dataset: Arc<AnnotatedImageDataset>,
    batches: std::vec::IntoIter<Vec<usize>>,
    nb_batches: usize,
    seed: u64,
    epoch: u64,
    next_element_index: usize,
    max_elem_index: usize,
}

impl BatchLoader {
    pub fn new(dataset: Arc<AnnotatedImageDataset>, options: &BatchLoaderOptions) -> BatchLoader {
        let indices = epoch_order(dataset.len(), options.shuffle, options.seed, options.epoch);
        let shard = shard_indices(&indices, options.rank, options.world_size);
        let max_elem_index = shard.len();
        let batches: Vec<Vec<usize>> = shard
            .into_iter()
            .batching(options.batch_size, options.drop_last)
            .collect();
        debug!(
            "Worker {}/{}: {} items in {} batches",
            options.rank,
            options.world_size,
            max_elem_index,
            batches.len()
        );
        BatchLoader {
            dataset,
            nb_batches: batches.len(),
            batches: batches.into_iter(),
            seed: options.seed,
            epoch: options.epoch,
            next_element_index: 0,
            max_elem_index,
        }
    }

    /// Total number of batches of this epoch, including the ones already yielded
    pub fn nb_batches(&self) -> usize {
        self.nb_batches
    }

    pub fn dataset(&self) -> &AnnotatedImageDataset {
        &self.dataset
    }

    fn load_batch(&self, indices: Vec<usize>) -> DatasetResult<Batch> {
        let (seed, epoch) = (self.seed, self.epoch);
        let dataset = &self.dataset;
        let examples = indices
            .par_iter()
            .map(|&index| {
                let mut rng = StdRng::seed_from_u64(item_seed(seed, epoch, index));
                dataset.get(index, &mut rng)
            })
            .collect::<DatasetResult<Vec<Example>>>()?;
        collate(indices, &examples)
    }
}

impl Iterator for BatchLoader {
    type Item = DatasetResult<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.batches.next()?;
        self.next_element_index += indices.len();
        Some(self.load_batch(indices))
    }
}

impl DataLoader for BatchLoader {
    fn next_element_index(&self) -> usize {
        self.next_element_index
    }

    fn max_elem_index(&self) -> usize {
        self.max_elem_index
    }
}
