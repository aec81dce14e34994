use crate::dataset::common_structs::{BboxMode, CropBox, CropPolicy, Example, ExampleMeta, LandmarkMode};
use crate::dataset::data_augmenters::image_augmentations::{
    RandomHorizontalFlip, RandomResizedCrop, NETWORK_INPUT_SIZE,
};
use crate::dataset::data_loaders::annotation_files::{read_image_list, read_matrix, read_matrix_columns};
use crate::dataset::data_transformers::geometry::{crop_image, shift_landmarks, thumbnail};
use crate::dataset::data_transformers::img2tensor::{from_img_to_tensor, Normalize};
use crate::dataset::errors::{DatasetError, DatasetResult};
use image::{DynamicImage, GenericImageView};
use log::{debug, info, warn};
use ndarray::{Array1, Array2};
use rand::Rng;
use std::path::{Path, PathBuf};

/// Images with their labels, bounding boxes and landmarks, all loaded up front from flat
/// annotation files where row `i` of every file describes line `i` of the image list.
///
/// Items are built on demand by [`AnnotatedImageDataset::get`]. The dataset is never mutated
/// after construction so it can be shared between threads as long as each thread brings its
/// own random generator.
#[derive(Debug)]
pub struct AnnotatedImageDataset {
    img_root: PathBuf,
    img_list: Vec<String>,
    labels: Array2<f32>,
    bboxes: BboxMode,
    landmarks: LandmarkMode,
    img_size: (u32, u32),
    crop_policy: CropPolicy,
    bbox_file: Option<PathBuf>,
    random_crop: RandomResizedCrop,
    flip: RandomHorizontalFlip,
    normalize: Normalize,
}

/// Image after crop + thumbnail + RGB conversion, before the random part of the pipeline
struct PreparedImage {
    img: DynamicImage,
    original_size: (u32, u32),
    crop_box: Option<CropBox>,
    bbox_size: (i64, i64),
}

impl PreparedImage {
    /// Top-left corner landmarks are shifted by
    fn origin(&self) -> (i64, i64) {
        self.crop_box.map_or((0, 0), |crop| (crop.x1, crop.y1))
    }
}

fn check_rows(path: &Path, matrix: &Array2<f64>, expected: usize) -> DatasetResult<()> {
    if matrix.nrows() != expected {
        return Err(DatasetError::data_format(
            path,
            0,
            format!("{} rows but the image list has {} images", matrix.nrows(), expected),
        ));
    }
    Ok(())
}

impl AnnotatedImageDataset {
    /// Loads every annotation file into memory.
    ///
    /// `img_size` is the (width, height) images are shrunk to fit in, and the space landmarks
    /// are rescaled to. Without `bbox_file` images are not cropped. Without `landmark_file`
    /// the dataset still builds but [`get`](Self::get) fails for every index.
    pub fn new(
        img_root: impl AsRef<Path>,
        img_file: impl AsRef<Path>,
        label_file: impl AsRef<Path>,
        bbox_file: Option<&Path>,
        landmark_file: Option<&Path>,
        img_size: (u32, u32),
    ) -> DatasetResult<AnnotatedImageDataset> {
        let img_list = read_image_list(img_file.as_ref())?;
        let nb_imgs = img_list.len();

        let label_file = label_file.as_ref();
        let labels = read_matrix(label_file)?;
        check_rows(label_file, &labels, nb_imgs)?;

        let bboxes = match bbox_file {
            Some(path) => {
                let bboxes = read_matrix_columns(path, 4)?;
                check_rows(path, &bboxes, nb_imgs)?;
                BboxMode::Present(bboxes)
            }
            None => BboxMode::Absent,
        };

        let landmarks = match landmark_file {
            Some(path) => {
                let landmarks = read_matrix(path)?;
                check_rows(path, &landmarks, nb_imgs)?;
                if landmarks.ncols() % 2 != 0 {
                    return Err(DatasetError::data_format(
                        path,
                        1,
                        format!("{} columns, landmarks need (x, y) pairs", landmarks.ncols()),
                    ));
                }
                LandmarkMode::Present(landmarks)
            }
            None => LandmarkMode::Absent,
        };

        info!(
            "Loaded {} images with {} label columns, bboxes: {}, landmark coordinates: {}",
            nb_imgs,
            labels.ncols(),
            matches!(bboxes, BboxMode::Present(_)),
            match &landmarks {
                LandmarkMode::Present(matrix) => matrix.ncols().to_string(),
                LandmarkMode::Absent => "none".to_string(),
            }
        );

        Ok(AnnotatedImageDataset {
            img_root: img_root.as_ref().to_path_buf(),
            img_list,
            labels: labels.mapv(|value| value as f32),
            bboxes,
            landmarks,
            img_size,
            crop_policy: CropPolicy::default(),
            bbox_file: bbox_file.map(Path::to_path_buf),
            random_crop: RandomResizedCrop::new(NETWORK_INPUT_SIZE),
            flip: RandomHorizontalFlip::default(),
            normalize: Normalize::imagenet(),
        })
    }

    pub fn with_crop_policy(mut self, crop_policy: CropPolicy) -> AnnotatedImageDataset {
        self.crop_policy = crop_policy;
        self
    }

    pub fn len(&self) -> usize {
        self.img_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.img_list.is_empty()
    }

    pub fn img_size(&self) -> (u32, u32) {
        self.img_size
    }

    pub fn crop_policy(&self) -> CropPolicy {
        self.crop_policy
    }

    pub fn img_filename(&self, index: usize) -> DatasetResult<&str> {
        self.check_index(index)?;
        Ok(&self.img_list[index])
    }

    /// Number of values in every label row
    pub fn label_len(&self) -> usize {
        self.labels.ncols()
    }

    /// Number of values in every landmark row (twice the number of landmarks), if any
    pub fn landmark_len(&self) -> Option<usize> {
        match &self.landmarks {
            LandmarkMode::Present(matrix) => Some(matrix.ncols()),
            LandmarkMode::Absent => None,
        }
    }

    /// Builds training item `index`. The image goes through a random resized crop and a
    /// random horizontal flip drawn from `rng`; labels and landmarks are deterministic.
    pub fn get<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> DatasetResult<Example> {
        let prepared = self.prepare_image(index)?;

        let img = self.random_crop.apply(&prepared.img, rng);
        let img = self.flip.apply(img, rng);
        let mut image = from_img_to_tensor(&img.to_rgb8());
        self.normalize.apply(&mut image);

        let label = self.labels.row(index).to_owned();
        let landmarks = self.landmark_tensor(index, &prepared)?;
        Ok(Example {
            image,
            label,
            landmarks,
        })
    }

    /// [`get`](Self::get) with the thread local random generator
    pub fn sample(&self, index: usize) -> DatasetResult<Example> {
        self.get(index, &mut rand::thread_rng())
    }

    /// Geometry of item `index` without running the random image pipeline.
    /// Unlike [`get`](Self::get), a dataset without landmarks reports `landmarks: None`.
    pub fn example_meta(&self, index: usize) -> DatasetResult<ExampleMeta> {
        let prepared = self.prepare_image(index)?;
        let landmarks = match self.landmarks {
            LandmarkMode::Present(_) => Some(self.landmark_tensor(index, &prepared)?.to_vec()),
            LandmarkMode::Absent => None,
        };
        Ok(ExampleMeta {
            index,
            img_filename: self.img_list[index].clone(),
            original_size: prepared.original_size,
            crop_box: prepared.crop_box,
            bbox_size: prepared.bbox_size,
            resized_size: prepared.img.dimensions(),
            landmarks,
        })
    }

    /// The cropped and resized RGB image of item `index`, as the random pipeline receives it
    pub fn prepared_image(&self, index: usize) -> DatasetResult<DynamicImage> {
        Ok(self.prepare_image(index)?.img)
    }

    fn check_index(&self, index: usize) -> DatasetResult<()> {
        if index >= self.img_list.len() {
            return Err(DatasetError::IndexOutOfRange {
                index,
                len: self.img_list.len(),
                what: "images",
            });
        }
        Ok(())
    }

    fn prepare_image(&self, index: usize) -> DatasetResult<PreparedImage> {
        self.check_index(index)?;
        let img_path = self.img_root.join(&self.img_list[index]);
        let img = image::open(&img_path).map_err(|source| DatasetError::ImageDecode {
            path: img_path.clone(),
            source,
        })?;
        let original_size = img.dimensions();

        let (img, crop_box, bbox_size) = match &self.bboxes {
            BboxMode::Present(bboxes) => {
                let row = bboxes.row(index);
                let wanted = CropBox::inflated(row[0], row[1], row[2], row[3]);
                let (cropped, crop_box) = crop_image(&img, wanted, self.crop_policy).map_err(|rejection| {
                    DatasetError::data_format(
                        self.bbox_file.clone().unwrap_or_default(),
                        index + 1,
                        format!(
                            "{} for {} ({}x{}): {:?}",
                            rejection,
                            img_path.display(),
                            original_size.0,
                            original_size.1,
                            wanted
                        ),
                    )
                })?;
                if crop_box != wanted {
                    warn!("Clamped crop box of {} from {:?} to {:?}", img_path.display(), wanted, crop_box);
                }
                let bbox_size = (crop_box.width(), crop_box.height());
                (cropped, Some(crop_box), bbox_size)
            }
            BboxMode::Absent => (img, None, (self.img_size.0 as i64, self.img_size.1 as i64)),
        };

        let img = thumbnail(img, self.img_size);
        let img = DynamicImage::ImageRgb8(img.to_rgb8());
        debug!(
            "{}: original {:?}, crop {:?}, bbox size {:?}, resized {:?}",
            img_path.display(),
            original_size,
            crop_box,
            bbox_size,
            img.dimensions()
        );
        Ok(PreparedImage {
            img,
            original_size,
            crop_box,
            bbox_size,
        })
    }

    fn landmark_tensor(&self, index: usize, prepared: &PreparedImage) -> DatasetResult<Array1<f32>> {
        match &self.landmarks {
            LandmarkMode::Present(landmarks) => Ok(shift_landmarks(
                landmarks.row(index),
                prepared.origin(),
                prepared.original_size,
                self.img_size,
            )),
            LandmarkMode::Absent => Err(DatasetError::IndexOutOfRange {
                index,
                len: 0,
                what: "landmarks",
            }),
        }
    }
}
