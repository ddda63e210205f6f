#![allow(dead_code)]

use image::{GrayImage, Luma, Rgb, RgbImage};
use opencv::core::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use template_locator::utils::geometry::{Affine2, ImageSize, Point2};
use template_locator::utils::image_conversion::{gray_to_mat, rgb_to_bgr_mat};

/// Scene background; also the value of every template's margin.
pub const BACKGROUND: u8 = 96;

/// Uniform frame around the textured core of a synthetic template.
pub const MARGIN: u32 = 48;

pub const CELL: u32 = 8;

/// Template with a random-block core inside a background-valued margin.
pub fn textured_template(core_width: u32, core_height: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let cols = core_width.div_ceil(CELL);
    let rows = core_height.div_ceil(CELL);
    let cells: Vec<u8> = (0..cols * rows).map(|_| rng.gen()).collect();

    let width = core_width + 2 * MARGIN;
    let height = core_height + 2 * MARGIN;
    GrayImage::from_fn(width, height, |x, y| {
        let inside = x >= MARGIN && x < MARGIN + core_width && y >= MARGIN && y < MARGIN + core_height;
        if inside {
            let cx = (x - MARGIN) / CELL;
            let cy = (y - MARGIN) / CELL;
            Luma([cells[(cy * cols + cx) as usize]])
        } else {
            Luma([BACKGROUND])
        }
    })
}

pub fn size_of(image: &GrayImage) -> ImageSize {
    ImageSize::new(image.width() as i32, image.height() as i32)
}

/// Transform placing a template of `size` so that its center lands on
/// `center`, scaled and rotated about that center.
pub fn placement(size: ImageSize, center: (f64, f64), scale: f64, angle_degrees: f64) -> Affine2 {
    let linear = Affine2::similarity(scale, angle_degrees, 0.0, 0.0);
    let mid = linear.apply(Point2::new(size.width as f64 / 2.0, size.height as f64 / 2.0));
    Affine2::similarity(scale, angle_degrees, center.0 - mid.x, center.1 - mid.y)
}

/// Unscaled, unrotated placement with the template's top-left at `(x, y)`.
pub fn at(x: i32, y: i32) -> Affine2 {
    Affine2::similarity(1.0, 0.0, x as f64, y as f64)
}

/// Render templates into a flat scene through their placements, sampling
/// bilinearly from the template.
pub fn render_scene(width: u32, height: u32, placed: &[(&GrayImage, Affine2)]) -> GrayImage {
    let mut scene = GrayImage::from_pixel(width, height, Luma([BACKGROUND]));
    for (template, transform) in placed {
        let [[a, b, tx], [c, d, ty]] = transform.m;
        let det = a * d - b * c;
        for y in 0..height {
            for x in 0..width {
                let dx = x as f64 - tx;
                let dy = y as f64 - ty;
                let u = (d * dx - b * dy) / det;
                let v = (-c * dx + a * dy) / det;
                if let Some(value) = sample(template, u, v) {
                    scene.put_pixel(x, y, Luma([value]));
                }
            }
        }
    }
    scene
}

fn sample(image: &GrayImage, u: f64, v: f64) -> Option<u8> {
    let max_u = (image.width() - 1) as f64;
    let max_v = (image.height() - 1) as f64;
    if u < 0.0 || v < 0.0 || u > max_u || v > max_v {
        return None;
    }
    let x0 = u.floor() as u32;
    let y0 = v.floor() as u32;
    let x1 = (x0 + 1).min(image.width() - 1);
    let y1 = (y0 + 1).min(image.height() - 1);
    let fx = u - x0 as f64;
    let fy = v - y0 as f64;
    let p = |x: u32, y: u32| image.get_pixel(x, y)[0] as f64;
    let top = p(x0, y0) * (1.0 - fx) + p(x1, y0) * fx;
    let bottom = p(x0, y1) * (1.0 - fx) + p(x1, y1) * fx;
    Some((top * (1.0 - fy) + bottom * fy).round() as u8)
}

/// Scene of a few large flat shapes: corners, but nothing template-like.
pub fn shapes_scene(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let (fx, fy) = (x as f64, y as f64);
        let in_circle = (fx - 150.0).hypot(fy - 140.0) < 90.0;
        let in_box = (320..540).contains(&x) && (200..330).contains(&y);
        let value = if in_circle {
            200
        } else if in_box {
            30
        } else {
            BACKGROUND as u32 + (x + y) / 40
        };
        Luma([value.min(255) as u8])
    })
}

/// Color version of a gray image: gray goes to red, green and blue fixed.
pub fn tint_red(image: &GrayImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        Rgb([image.get_pixel(x, y)[0], 60, 200])
    })
}

pub fn mat(image: &GrayImage) -> Mat {
    gray_to_mat(image).unwrap()
}

pub fn color_mat(image: &RgbImage) -> Mat {
    rgb_to_bgr_mat(image).unwrap()
}
