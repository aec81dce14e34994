use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

/// Everything that can go wrong while building the dataset or fetching an item from it.
/// Nothing is retried internally, the caller decides whether to skip, retry or abort.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A required annotation file is missing or unreadable
    #[error("cannot read {}: {source}", .path.display())]
    Configuration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An annotation file is not a rectangular numeric matrix or disagrees with the image list
    #[error("bad data in {} (line {line}): {message}", .path.display())]
    DataFormat {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("cannot decode image {}: {source}", .path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("index {index} is out of range for {what} ({len} rows)")]
    IndexOutOfRange {
        index: usize,
        len: usize,
        what: &'static str,
    },
}

impl DatasetError {
    pub(crate) fn data_format(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        DatasetError::DataFormat {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}
