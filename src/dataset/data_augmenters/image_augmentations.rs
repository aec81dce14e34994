use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use rand::Rng;

/// Side of the square images fed to the network
pub const NETWORK_INPUT_SIZE: u32 = 224;

/// Crops a random region (random area and aspect ratio) and resizes it to a fixed size.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomResizedCrop {
    /// Output (width, height)
    pub size: (u32, u32),
    /// Range of the crop area as a fraction of the image area
    pub scale: (f64, f64),
    /// Range of the crop width/height ratio
    pub ratio: (f64, f64),
}

impl RandomResizedCrop {
    pub fn new(size: u32) -> RandomResizedCrop {
        RandomResizedCrop {
            size: (size, size),
            scale: (0.08, 1.0),
            ratio: (3. / 4., 4. / 3.),
        }
    }

    /// Picks the region to crop as (left, top, width, height).
    /// After 10 unlucky draws falls back to a center crop clipped to the ratio range.
    pub fn crop_params<R: Rng + ?Sized>(&self, width: u32, height: u32, rng: &mut R) -> (u32, u32, u32, u32) {
        let area = width as f64 * height as f64;
        let log_ratio = (self.ratio.0.ln(), self.ratio.1.ln());
        for _ in 0..10 {
            let target_area = area * rng.gen_range(self.scale.0..=self.scale.1);
            let aspect_ratio = rng.gen_range(log_ratio.0..=log_ratio.1).exp();
            let crop_width = (target_area * aspect_ratio).sqrt().round() as u32;
            let crop_height = (target_area / aspect_ratio).sqrt().round() as u32;
            if crop_width > 0 && crop_width <= width && crop_height > 0 && crop_height <= height {
                let left = rng.gen_range(0..=width - crop_width);
                let top = rng.gen_range(0..=height - crop_height);
                return (left, top, crop_width, crop_height);
            }
        }

        let in_ratio = width as f64 / height as f64;
        let (crop_width, crop_height) = if in_ratio < self.ratio.0 {
            (width, ((width as f64 / self.ratio.0).round() as u32).clamp(1, height))
        } else if in_ratio > self.ratio.1 {
            (((height as f64 * self.ratio.1).round() as u32).clamp(1, width), height)
        } else {
            (width, height)
        };
        ((width - crop_width) / 2, (height - crop_height) / 2, crop_width, crop_height)
    }

    pub fn apply<R: Rng + ?Sized>(&self, img: &DynamicImage, rng: &mut R) -> DynamicImage {
        let (width, height) = img.dimensions();
        let (left, top, crop_width, crop_height) = self.crop_params(width, height, rng);
        img.crop_imm(left, top, crop_width, crop_height)
            .resize_exact(self.size.0, self.size.1, FilterType::Triangle)
    }
}

/// Mirrors the image left to right with probability `p`
#[derive(Debug, Clone, PartialEq)]
pub struct RandomHorizontalFlip {
    pub p: f64,
}

impl Default for RandomHorizontalFlip {
    fn default() -> Self {
        RandomHorizontalFlip { p: 0.5 }
    }
}

impl RandomHorizontalFlip {
    pub fn apply<R: Rng + ?Sized>(&self, img: DynamicImage, rng: &mut R) -> DynamicImage {
        if rng.gen_bool(self.p) {
            img.fliph()
        } else {
            img
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn crop_params_stay_inside_the_image() {
        let crop = RandomResizedCrop::new(NETWORK_INPUT_SIZE);
        let mut rng = StdRng::seed_from_u64(7);
        for &(width, height) in &[(224, 224), (50, 400), (640, 20), (1, 1), (3, 1000)] {
            for _ in 0..50 {
                let (left, top, crop_width, crop_height) = crop.crop_params(width, height, &mut rng);
                assert!(crop_width > 0 && crop_height > 0);
                assert!(left + crop_width <= width, "{:?}", (width, height));
                assert!(top + crop_height <= height, "{:?}", (width, height));
            }
        }
    }

    #[test]
    fn output_has_fixed_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(90, 37, Rgb([1, 2, 3])));
        let mut rng = StdRng::seed_from_u64(1);
        let out = RandomResizedCrop::new(NETWORK_INPUT_SIZE).apply(&img, &mut rng);
        assert_eq!(out.dimensions(), (224, 224));
    }

    #[test]
    fn same_seed_same_crop() {
        let crop = RandomResizedCrop::new(NETWORK_INPUT_SIZE);
        let first = crop.crop_params(500, 300, &mut StdRng::seed_from_u64(42));
        let second = crop.crop_params(500, 300, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn flip_probability_extremes() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(2, 1, |x, _| Rgb([x as u8 * 100, 0, 0])));
        let mut rng = StdRng::seed_from_u64(3);
        let flipped = RandomHorizontalFlip { p: 1.0 }.apply(img.clone(), &mut rng);
        assert_eq!(flipped.to_rgb8().get_pixel(0, 0), &Rgb([100, 0, 0]));
        let kept = RandomHorizontalFlip { p: 0.0 }.apply(img, &mut rng);
        assert_eq!(kept.to_rgb8().get_pixel(0, 0), &Rgb([0, 0, 0]));
    }
}
