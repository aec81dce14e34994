use crate::dataset::common_structs::CropPolicy;
use crate::dataset::data_loaders::annotated_image_dataset::AnnotatedImageDataset;
use crate::dataset::errors::{DatasetError, DatasetResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

fn default_img_size() -> (u32, u32) {
    (224, 224)
}

/// Where the annotation files of a dataset live and how items are prepared.
///
/// ```json
/// {
///   "img_root": "img",
///   "img_file": "Anno/train.txt",
///   "label_file": "Anno/train_labels.txt",
///   "bbox_file": "Anno/train_bbox.txt",
///   "landmark_file": "Anno/train_landmarks.txt",
///   "img_size": [224, 224],
///   "crop_policy": "pad"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub img_root: PathBuf,
    pub img_file: PathBuf,
    pub label_file: PathBuf,
    #[serde(default)]
    pub bbox_file: Option<PathBuf>,
    #[serde(default)]
    pub landmark_file: Option<PathBuf>,
    #[serde(default = "default_img_size")]
    pub img_size: (u32, u32),
    #[serde(default)]
    pub crop_policy: CropPolicy,
}

impl DatasetConfig {
    /// Reads the config from a json file. Relative paths are taken relative to the folder
    /// holding the file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> DatasetResult<DatasetConfig> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Configuration {
            path: path.to_owned(),
            source,
        })?;
        let config: DatasetConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| DatasetError::data_format(path, e.line(), e.to_string()))?;
        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.relative_to(parent))
    }

    /// Prefixes every relative path with `dir`
    pub fn relative_to(self, dir: &Path) -> DatasetConfig {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { dir.join(p) };
        DatasetConfig {
            img_root: resolve(self.img_root),
            img_file: resolve(self.img_file),
            label_file: resolve(self.label_file),
            bbox_file: self.bbox_file.map(resolve),
            landmark_file: self.landmark_file.map(resolve),
            img_size: self.img_size,
            crop_policy: self.crop_policy,
        }
    }

    pub fn build(&self) -> DatasetResult<AnnotatedImageDataset> {
        let dataset = AnnotatedImageDataset::new(
            &self.img_root,
            &self.img_file,
            &self.label_file,
            self.bbox_file.as_deref(),
            self.landmark_file.as_deref(),
            self.img_size,
        )?;
        Ok(dataset.with_crop_policy(self.crop_policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn optional_fields_have_defaults() {
        let config: DatasetConfig = serde_json::from_str(
            r#"{"img_root": "img", "img_file": "list.txt", "label_file": "labels.txt"}"#,
        )
        .unwrap();
        assert_eq!(config.bbox_file, None);
        assert_eq!(config.landmark_file, None);
        assert_eq!(config.img_size, (224, 224));
        assert_eq!(config.crop_policy, CropPolicy::Pad);
    }

    #[test]
    fn paths_are_relative_to_the_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("dataset.json");
        fs::write(
            &config_path,
            r#"{
                "img_root": "img",
                "img_file": "list.txt",
                "label_file": "/data/labels.txt",
                "bbox_file": "bbox.txt",
                "img_size": [300, 200],
                "crop_policy": "clamp"
            }"#,
        )
        .unwrap();
        let config = DatasetConfig::from_json_file(&config_path).unwrap();
        assert_eq!(config.img_root, dir.path().join("img"));
        assert_eq!(config.label_file, PathBuf::from("/data/labels.txt"));
        assert_eq!(config.bbox_file, Some(dir.path().join("bbox.txt")));
        assert_eq!(config.img_size, (300, 200));
        assert_eq!(config.crop_policy, CropPolicy::Clamp);
    }

    #[test]
    fn invalid_json_is_a_data_format_error() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("dataset.json");
        fs::write(&config_path, "{\"img_root\": ").unwrap();
        assert!(matches!(
            DatasetConfig::from_json_file(&config_path).unwrap_err(),
            DatasetError::DataFormat { .. }
        ));
        assert!(matches!(
            DatasetConfig::from_json_file(dir.path().join("missing.json")).unwrap_err(),
            DatasetError::Configuration { .. }
        ));
    }
}
