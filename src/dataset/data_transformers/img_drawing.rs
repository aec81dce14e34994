use crate::dataset::common_structs::ExampleMeta;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use itertools::Itertools;

pub fn draw_landmarks(img: &mut RgbImage, landmarks: &[f32]) {
    draw_landmarks_with_color(img, landmarks, [255, 0, 0]);
}

/// Draws a cross on every interleaved (x, y) landmark and a box around the image border
pub fn draw_landmarks_with_color(img: &mut RgbImage, landmarks: &[f32], rgb_color: [u8; 3]) {
    let color = Rgb(rgb_color);
    let (width, height) = img.dimensions();
    if width > 0 && height > 0 {
        draw_hollow_rect_mut(img, Rect::at(0, 0).of_size(width, height), color);
    }
    for (x, y) in landmarks.iter().tuples() {
        draw_cross_mut(img, color, x.round() as i32, y.round() as i32);
    }
}

/// Maps landmarks from the `img_size` space [`get`](crate::AnnotatedImageDataset::get) returns
/// them in back to pixels of the prepared image described by `meta`.
///
/// Landmarks are scaled by the size of the image before cropping, so a point is first brought
/// back to a crop-relative offset in source pixels, then scaled by how much the crop was shrunk.
pub fn landmarks_in_image_space(meta: &ExampleMeta, img_size: (u32, u32), landmarks: &[f32]) -> Vec<f32> {
    let (crop_width, crop_height) = meta
        .crop_box
        .map_or((meta.original_size.0 as f64, meta.original_size.1 as f64), |crop| {
            (crop.width() as f64, crop.height() as f64)
        });
    let scale_x = meta.original_size.0 as f64 / img_size.0 as f64 * meta.resized_size.0 as f64 / crop_width;
    let scale_y = meta.original_size.1 as f64 / img_size.1 as f64 * meta.resized_size.1 as f64 / crop_height;
    landmarks
        .iter()
        .enumerate()
        .map(|(i, &coord)| {
            let scale = if i % 2 == 0 { scale_x } else { scale_y };
            (coord as f64 * scale) as f32
        })
        .collect()
}

/// Draws the landmarks of an item on its prepared image, kept at its own size
pub fn landmarks_overlay(
    img: &DynamicImage,
    meta: &ExampleMeta,
    img_size: (u32, u32),
    landmarks: &[f32],
) -> RgbImage {
    let mut canvas = img.to_rgb8();
    draw_landmarks(&mut canvas, &landmarks_in_image_space(meta, img_size, landmarks));
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::common_structs::CropBox;

    #[test]
    fn crosses_are_drawn_at_landmarks() {
        let mut img = RgbImage::new(20, 20);
        draw_landmarks(&mut img, &[10., 10., 5.2, 14.8]);
        assert_eq!(img.get_pixel(10, 10), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(5, 15), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(3, 3), &Rgb([0, 0, 0]));
    }

    fn meta(original_size: (u32, u32), crop_box: Option<CropBox>, resized_size: (u32, u32)) -> ExampleMeta {
        ExampleMeta {
            index: 0,
            img_filename: "a.png".to_string(),
            original_size,
            crop_box,
            bbox_size: crop_box.map_or((224, 224), |crop| (crop.width(), crop.height())),
            resized_size,
            landmarks: None,
        }
    }

    fn assert_close(got: &[f32], want: &[f32]) {
        assert_eq!(got.len(), want.len());
        for (g, w) in got.iter().zip(want) {
            assert!((g - w).abs() < 1e-3, "{:?} != {:?}", got, want);
        }
    }

    #[test]
    fn cropped_landmarks_land_back_on_the_crop() {
        // 100x200 image cropped to (10, 20, 70, 160), small enough to keep its size
        let meta = meta((100, 200), Some(CropBox { x1: 10, y1: 20, x2: 70, y2: 160 }), (60, 140));
        // source point (30, 50) is 20 right and 30 below the crop corner
        let mapped = landmarks_in_image_space(&meta, (224, 224), &[44.8, 33.6]);
        assert_close(&mapped, &[20., 30.]);

        let img = DynamicImage::ImageRgb8(RgbImage::new(60, 140));
        let overlay = landmarks_overlay(&img, &meta, (224, 224), &[44.8, 33.6]);
        assert_eq!(overlay.dimensions(), (60, 140));
        assert_eq!(overlay.get_pixel(20, 30), &Rgb([255, 0, 0]));
        assert_eq!(overlay.get_pixel(30, 60), &Rgb([0, 0, 0]));
    }

    #[test]
    fn shrunk_crop_scales_landmarks_down() {
        // a 400x400 crop of a 1000x500 image, thumbnailed to 224x224
        let meta = meta((1000, 500), Some(CropBox { x1: 100, y1: 50, x2: 500, y2: 450 }), (224, 224));
        // source point (300, 250) is 200 right and 200 below the crop corner
        let landmark = [200. / 1000. * 224., 200. / 500. * 224.];
        let mapped = landmarks_in_image_space(&meta, (224, 224), &landmark);
        assert_close(&mapped, &[112., 112.]);
    }

    #[test]
    fn uncropped_landmarks_follow_the_thumbnail() {
        let meta = meta((640, 480), None, (224, 168));
        let landmark = [120. / 640. * 224., 60. / 480. * 224.];
        let mapped = landmarks_in_image_space(&meta, (224, 224), &landmark);
        assert_close(&mapped, &[42., 21.]);
    }
}
