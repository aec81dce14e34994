use anyhow::{ensure, Context};
use clap::Parser;
use fashion_dataset::dataset::data_transformers::img_drawing::landmarks_overlay;
use fashion_dataset::dataset::DataLoader;
use fashion_dataset::{AnnotatedImageDataset, BatchLoader, BatchLoaderOptions, DatasetConfig};
use itertools::Itertools;
use log::{info, warn};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Loads an annotated fashion dataset and runs it through the training pipeline
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
struct Args {
    /// Json file describing where the images and annotation files are
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    #[arg(long = "batch-size", default_value_t = 16)]
    batch_size: usize,

    /// Seed for shuffling and augmentations
    #[arg(long = "seed", default_value_t = 42)]
    seed: u64,

    #[arg(long = "epoch", default_value_t = 0)]
    epoch: u64,

    /// Keep the image list order
    #[arg(long = "no-shuffle")]
    no_shuffle: bool,

    #[arg(long = "rank", default_value_t = 0)]
    rank: usize,

    #[arg(long = "world-size", default_value_t = 1)]
    world_size: usize,

    #[arg(long = "drop-last")]
    drop_last: bool,

    /// Stop after this many batches
    #[arg(long = "max-batches")]
    max_batches: Option<usize>,

    /// Log failing batches and keep going instead of stopping
    #[arg(long = "skip-errors")]
    skip_errors: bool,

    /// Write the first images with their landmarks drawn, plus their geometry as json
    #[arg(long = "dump-dir")]
    dump_dir: Option<PathBuf>,

    #[arg(long = "dump-count", default_value_t = 8)]
    dump_count: usize,
}

fn dump_examples(dataset: &AnnotatedImageDataset, dir: &Path, count: usize) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let mut metas = vec![];
    for index in 0..count.min(dataset.len()) {
        let meta = dataset.example_meta(index)?;
        let img = dataset.prepared_image(index)?;
        let out_path = dir.join(format!("{:06}.png", index));
        let saved = match &meta.landmarks {
            Some(landmarks) => landmarks_overlay(&img, &meta, dataset.img_size(), landmarks).save(&out_path),
            None => img.save(&out_path),
        };
        saved.with_context(|| format!("cannot save {}", out_path.display()))?;
        metas.push(meta);
    }
    let meta_path = dir.join("meta.json");
    let file = File::create(&meta_path).with_context(|| format!("cannot create {}", meta_path.display()))?;
    serde_json::to_writer_pretty(file, &metas)?;
    info!("Wrote {} examples to {}", metas.len(), dir.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    ensure!(args.batch_size > 0, "--batch-size must be positive");
    ensure!(
        args.rank < args.world_size,
        "--rank {} must be below --world-size {}",
        args.rank,
        args.world_size
    );

    let config = DatasetConfig::from_json_file(&args.config)
        .with_context(|| format!("cannot load config {}", args.config.display()))?;
    let dataset = Arc::new(config.build().context("cannot load annotations")?);
    info!("{} images, crop policy {:?}", dataset.len(), dataset.crop_policy());

    if let Some(dump_dir) = &args.dump_dir {
        dump_examples(&dataset, dump_dir, args.dump_count)?;
    }

    let options = BatchLoaderOptions {
        batch_size: args.batch_size,
        shuffle: !args.no_shuffle,
        seed: args.seed,
        epoch: args.epoch,
        rank: args.rank,
        world_size: args.world_size,
        drop_last: args.drop_last,
    };
    let mut loader = BatchLoader::new(dataset, &options);
    let nb_batches = args.max_batches.map_or(loader.nb_batches(), |max| max.min(loader.nb_batches()));
    let start = Instant::now();
    let mut failed = 0;
    for batch_nb in 0..nb_batches {
        let batch = match loader.next() {
            Some(batch) => batch,
            None => break,
        };
        match batch {
            Ok(batch) => info!(
                "Batch {}/{} ({} of {} items): images [{}], labels [{}], landmarks [{}]",
                batch_nb + 1,
                nb_batches,
                loader.next_element_index(),
                loader.max_elem_index(),
                batch.images.shape().iter().join(", "),
                batch.labels.shape().iter().join(", "),
                batch.landmarks.shape().iter().join(", ")
            ),
            Err(e) if args.skip_errors => {
                failed += 1;
                warn!("Skipping batch {}: {}", batch_nb + 1, e);
            }
            Err(e) => return Err(e).with_context(|| format!("batch {} failed", batch_nb + 1)),
        }
    }
    info!(
        "Loaded {} batches ({} failed) in {:.2} s",
        nb_batches,
        failed,
        start.elapsed().as_secs_f32()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_shuffle_one_worker() {
        let args = Args::try_parse_from(["fashion_loader", "--config", "dataset.json"]).unwrap();
        assert_eq!(args.config, PathBuf::from("dataset.json"));
        assert_eq!(args.batch_size, 16);
        assert!(!args.no_shuffle);
        assert_eq!((args.rank, args.world_size), (0, 1));
        assert_eq!(args.max_batches, None);
        assert_eq!(args.dump_dir, None);
    }

    #[test]
    fn flags_are_kebab_case() {
        let args = Args::try_parse_from([
            "fashion_loader",
            "-c",
            "dataset.json",
            "--batch-size",
            "4",
            "--no-shuffle",
            "--rank",
            "1",
            "--world-size",
            "2",
            "--drop-last",
            "--max-batches",
            "3",
            "--skip-errors",
            "--dump-dir",
            "out",
            "--dump-count",
            "2",
        ])
        .unwrap();
        assert_eq!(args.batch_size, 4);
        assert!(args.no_shuffle && args.drop_last && args.skip_errors);
        assert_eq!((args.rank, args.world_size), (1, 2));
        assert_eq!(args.max_batches, Some(3));
        assert_eq!(args.dump_dir, Some(PathBuf::from("out")));
        assert_eq!(args.dump_count, 2);
        assert!(Args::try_parse_from(["fashion_loader", "-c", "d.json", "--batch_size", "4"]).is_err());
    }
}
