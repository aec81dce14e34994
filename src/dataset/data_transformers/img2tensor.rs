use image::RgbImage;
use ndarray::{Array3, Axis};

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Converts an RGB image to a [3, height, width] tensor with values in [0, 1]
pub fn from_img_to_tensor(img: &RgbImage) -> Array3<f32> {
    let (width, height) = img.dimensions();
    Array3::from_shape_fn((3, height as usize, width as usize), |(ch, y, x)| {
        img.get_pixel(x as u32, y as u32)[ch] as f32 / 255.
    })
}

/// Per channel `(value - mean) / std`
#[derive(Debug, Clone, PartialEq)]
pub struct Normalize {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalize {
    pub fn imagenet() -> Normalize {
        Normalize {
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }

    pub fn apply(&self, tensor: &mut Array3<f32>) {
        for (ch, mut channel) in tensor.axis_iter_mut(Axis(0)).enumerate() {
            let (mean, std) = (self.mean[ch], self.std[ch]);
            channel.mapv_inplace(|value| (value - mean) / std);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_to_tensor() {
        let img = RgbImage::from_fn(4, 2, |x, y| Rgb([(x * 50) as u8, (y * 255) as u8, 51]));
        let tensor = from_img_to_tensor(&img);
        assert_eq!(tensor.dim(), (3, 2, 4));
        for ch in 0..3 {
            for y in 0..2 {
                for x in 0..4 {
                    let expected = img.get_pixel(x, y)[ch] as f32 / 255.;
                    assert!((tensor[[ch, y as usize, x as usize]] - expected).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn normalize_is_per_channel() {
        let mut tensor = Array3::from_elem((3, 2, 2), 0.5);
        Normalize::imagenet().apply(&mut tensor);
        for ch in 0..3 {
            let expected = (0.5 - IMAGENET_MEAN[ch]) / IMAGENET_STD[ch];
            assert!(tensor.index_axis(Axis(0), ch).iter().all(|v| (v - expected).abs() < 1e-6));
        }
    }
}
