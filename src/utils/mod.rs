pub mod geometry;
pub mod image_conversion;
pub mod ransac;

pub use geometry::{Affine2, ImageSize, Point2};
pub use image_conversion::*;
pub use ransac::{estimate_affine_2d, AffineFit, RansacConfig};
