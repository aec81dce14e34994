//! Loads fashion images with their category labels, bounding boxes and landmarks and turns
//! them into normalized tensors ready to be batched for training.

pub mod config;
pub mod dataset;

pub use config::DatasetConfig;
pub use dataset::common_structs::{BboxMode, CropBox, CropPolicy, Example, ExampleMeta, LandmarkMode};
pub use dataset::data_loaders::annotated_image_dataset::AnnotatedImageDataset;
pub use dataset::data_loaders::batch_loader::{Batch, BatchLoader, BatchLoaderOptions};
pub use dataset::errors::{DatasetError, DatasetResult};
