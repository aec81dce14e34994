use crate::dataset::common_structs::{CropBox, CropPolicy, BBOX_MARGIN};
use image::imageops::FilterType;
use image::{imageops, DynamicImage, GenericImageView, RgbaImage};
use ndarray::{Array1, ArrayView1};
use thiserror::Error;

/// Black border allowed around the image when padding, as a multiple of the image side
pub const MAX_PAD_FACTOR: u64 = 4;

/// Why a crop box cannot be applied to an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CropRejection {
    #[error("crop box has no area")]
    Empty,
    #[error("crop box does not overlap the image")]
    OutsideImage,
    #[error("crop box is far bigger than the image")]
    TooLarge,
}

/// Crops `img` to `crop`. Returns the cropped image and the box actually used.
///
/// With [`CropPolicy::Pad`] the box must still overlap the image, and may not be bigger than
/// [`MAX_PAD_FACTOR`] times the image (plus the bbox margin) on either side.
pub fn crop_image(
    img: &DynamicImage,
    crop: CropBox,
    policy: CropPolicy,
) -> Result<(DynamicImage, CropBox), CropRejection> {
    let (img_width, img_height) = img.dimensions();
    let crop = match policy {
        CropPolicy::Pad => crop,
        CropPolicy::Clamp => crop.clamped(img_width, img_height),
    };
    if crop.is_empty() {
        return Err(CropRejection::Empty);
    }
    let overlap_x1 = crop.x1.max(0);
    let overlap_y1 = crop.y1.max(0);
    let overlap_x2 = crop.x2.min(img_width as i64);
    let overlap_y2 = crop.y2.min(img_height as i64);
    if overlap_x2 <= overlap_x1 || overlap_y2 <= overlap_y1 {
        return Err(CropRejection::OutsideImage);
    }

    let crop_width = u32::try_from(crop.width()).map_err(|_| CropRejection::TooLarge)?;
    let crop_height = u32::try_from(crop.height()).map_err(|_| CropRejection::TooLarge)?;
    let max_side = |side: u32| side as u64 * MAX_PAD_FACTOR + 2 * BBOX_MARGIN as u64;
    if crop_width as u64 > max_side(img_width) || crop_height as u64 > max_side(img_height) {
        return Err(CropRejection::TooLarge);
    }

    let fits_inside = crop.x1 >= 0
        && crop.y1 >= 0
        && crop.x2 <= img_width as i64
        && crop.y2 <= img_height as i64;
    if fits_inside {
        let cropped = img.crop_imm(crop.x1 as u32, crop.y1 as u32, crop_width, crop_height);
        return Ok((cropped, crop));
    }

    // Part of the box lies outside the image, fill that part with zeros
    let mut canvas = RgbaImage::new(crop_width, crop_height);
    let visible = img
        .crop_imm(
            overlap_x1 as u32,
            overlap_y1 as u32,
            (overlap_x2 - overlap_x1) as u32,
            (overlap_y2 - overlap_y1) as u32,
        )
        .to_rgba8();
    imageops::replace(&mut canvas, &visible, overlap_x1 - crop.x1, overlap_y1 - crop.y1);
    Ok((DynamicImage::ImageRgba8(canvas), crop))
}

/// Size `(width, height)` scaled down to fit in `max_size`, keeping the aspect ratio.
/// Never grows the image.
pub fn thumbnail_size(size: (u32, u32), max_size: (u32, u32)) -> (u32, u32) {
    let (width, height) = size;
    let (max_width, max_height) = max_size;
    if width == 0 || height == 0 {
        return size;
    }
    let scale = (max_width as f64 / width as f64)
        .min(max_height as f64 / height as f64)
        .min(1.0);
    if scale >= 1.0 {
        return size;
    }
    let new_width = ((width as f64 * scale).round() as u32).clamp(1, max_width.max(1));
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, max_height.max(1));
    (new_width, new_height)
}

/// Shrinks the image to fit in `max_size` with a Lanczos filter, keeping the aspect ratio
pub fn thumbnail(img: DynamicImage, max_size: (u32, u32)) -> DynamicImage {
    let size = img.dimensions();
    let (new_width, new_height) = thumbnail_size(size, max_size);
    if (new_width, new_height) == size {
        return img;
    }
    img.resize_exact(new_width, new_height, FilterType::Lanczos3)
}

/// Moves interleaved (x, y) landmarks into the crop's frame and rescales them to `target_size`.
///
/// Even positions are x, odd positions are y. Coordinates left of / above `origin` become 0.
/// The rescaling uses the size of the image *before* cropping.
pub fn shift_landmarks(
    landmarks: ArrayView1<f64>,
    origin: (i64, i64),
    original_size: (u32, u32),
    target_size: (u32, u32),
) -> Array1<f32> {
    let (x1, y1) = (origin.0 as f64, origin.1 as f64);
    let (width, height) = (original_size.0 as f64, original_size.1 as f64);
    let (target_width, target_height) = (target_size.0 as f64, target_size.1 as f64);
    landmarks
        .iter()
        .enumerate()
        .map(|(i, &coord)| {
            if i % 2 == 0 {
                ((coord - x1).max(0.) / width * target_width) as f32
            } else {
                ((coord - y1).max(0.) / height * target_height) as f32
            }
        })
        .collect()
}
