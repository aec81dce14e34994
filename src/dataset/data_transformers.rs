pub mod geometry;
pub mod img2tensor;
pub mod img_drawing;
