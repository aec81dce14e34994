use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};
// Frequently used structs in the provided data transformers/loaders/augmenters

/// Pixels added around every side of an annotated bounding box before cropping
pub const BBOX_MARGIN: i64 = 10;

/// Bounding boxes of every image, one (x1, y1, x2, y2) row per image, if a bbox file was given
#[derive(Debug, Clone, PartialEq)]
pub enum BboxMode {
    Absent,
    Present(Array2<f64>),
}

/// Interleaved (x, y) landmark coordinates of every image, if a landmark file was given
#[derive(Debug, Clone, PartialEq)]
pub enum LandmarkMode {
    Absent,
    Present(Array2<f64>),
}

/// What to do with the part of a crop box that falls outside the image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropPolicy {
    /// Keep the box as is, pixels outside the image are black
    #[default]
    Pad,
    /// Shrink the right/bottom edges of the box to the image bounds
    Clamp,
}

/// Crop region in source image pixels. Left/top inclusive, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl CropBox {
    /// Builds the crop box around an annotated bbox, grown by [`BBOX_MARGIN`] on every side.
    /// Only the top-left corner is kept non-negative.
    pub fn inflated(bx1: f64, by1: f64, bx2: f64, by2: f64) -> CropBox {
        CropBox {
            x1: (bx1.floor() as i64).saturating_sub(BBOX_MARGIN).max(0),
            y1: (by1.floor() as i64).saturating_sub(BBOX_MARGIN).max(0),
            x2: (bx2.floor() as i64).saturating_add(BBOX_MARGIN),
            y2: (by2.floor() as i64).saturating_add(BBOX_MARGIN),
        }
    }

    pub fn width(&self) -> i64 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> i64 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// The same box with its right/bottom edges cut at the image bounds
    pub fn clamped(&self, img_width: u32, img_height: u32) -> CropBox {
        CropBox {
            x1: self.x1,
            y1: self.y1,
            x2: self.x2.min(img_width as i64),
            y2: self.y2.min(img_height as i64),
        }
    }
}

/// One fully preprocessed training item
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    /// Normalized channel-first image, shape [3, 224, 224]
    pub image: Array3<f32>,
    /// Label row, shape [L]
    pub label: Array1<f32>,
    /// Shifted and rescaled interleaved landmarks, shape [2K]
    pub landmarks: Array1<f32>,
}

/// The deterministic part of fetching an item, without the random image pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExampleMeta {
    pub index: usize,
    pub img_filename: String,
    pub original_size: (u32, u32),
    pub crop_box: Option<CropBox>,
    pub bbox_size: (i64, i64),
    pub resized_size: (u32, u32),
    pub landmarks: Option<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_box_top_left_is_clamped_to_zero() {
        let crop = CropBox::inflated(5., 5., 50., 60.);
        assert_eq!(crop, CropBox { x1: 0, y1: 0, x2: 60, y2: 70 });
        assert_eq!((crop.width(), crop.height()), (60, 70));
    }

    #[test]
    fn crop_box_adds_margin() {
        let crop = CropBox::inflated(20., 20., 50., 60.);
        assert_eq!(crop, CropBox { x1: 10, y1: 10, x2: 60, y2: 70 });
    }

    #[test]
    fn crop_box_floors_fractional_corners() {
        let crop = CropBox::inflated(20.9, 31.2, 50.7, 60.1);
        assert_eq!(crop, CropBox { x1: 10, y1: 21, x2: 60, y2: 70 });
    }

    #[test]
    fn absurd_corners_do_not_overflow() {
        let crop = CropBox::inflated(-1e300, 0., 1e300, f64::NAN);
        assert_eq!((crop.x1, crop.y1), (0, 0));
        assert_eq!(crop.x2, i64::MAX);
        assert_eq!(crop.y2, BBOX_MARGIN);
        assert_eq!(crop.width(), i64::MAX);
    }

    #[test]
    fn clamped_only_touches_right_and_bottom() {
        let crop = CropBox { x1: 10, y1: 10, x2: 120, y2: 90 }.clamped(100, 100);
        assert_eq!(crop, CropBox { x1: 10, y1: 10, x2: 100, y2: 90 });
        assert!(CropBox { x1: 110, y1: 0, x2: 130, y2: 10 }.clamped(100, 100).is_empty());
    }
}
