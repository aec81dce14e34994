pub mod annotated_image_dataset;
pub mod annotation_files;
pub mod batch_loader;
