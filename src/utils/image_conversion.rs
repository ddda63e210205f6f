use crate::Result;
use image::{DynamicImage, GrayImage, RgbImage};
use opencv::core::{Mat, Vec3b, CV_8UC1, CV_8UC3};
use opencv::prelude::*;

/// Convert a GrayImage to a single-channel OpenCV Mat
pub fn gray_to_mat(image: &GrayImage) -> Result<Mat> {
    let (width, height) = image.dimensions();
    let mut mat = Mat::zeros(height as i32, width as i32, CV_8UC1)?.to_mat()?;

    for (x, y, pixel) in image.enumerate_pixels() {
        *mat.at_2d_mut::<u8>(y as i32, x as i32)? = pixel[0];
    }

    Ok(mat)
}

/// Convert an RgbImage to a 3-channel BGR Mat, the channel order screen
/// captures arrive in.
pub fn rgb_to_bgr_mat(image: &RgbImage) -> Result<Mat> {
    let (width, height) = image.dimensions();
    let mut mat = Mat::zeros(height as i32, width as i32, CV_8UC3)?.to_mat()?;

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        *mat.at_2d_mut::<Vec3b>(y as i32, x as i32)? = Vec3b::from([b, g, r]);
    }

    Ok(mat)
}

/// Convert any decoded image, keeping color when it has any.
pub fn dynamic_to_mat(image: &DynamicImage) -> Result<Mat> {
    if image.color().has_color() {
        rgb_to_bgr_mat(&image.to_rgb8())
    } else {
        gray_to_mat(&image.to_luma8())
    }
}

/// Load and validate image from path
pub fn load_image(path: &std::path::Path) -> Result<Mat> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "Image file does not exist: {}",
            path.display()
        ));
    }

    let img = image::open(path)?;
    validate_image_size(img.width(), img.height())?;
    dynamic_to_mat(&img)
}

/// Validate that image has reasonable dimensions
pub fn validate_image_size(width: u32, height: u32) -> Result<()> {
    validate_image_size_with_limits(width, height, 8, 10000)
}

/// Validate image size with custom limits
pub fn validate_image_size_with_limits(
    width: u32,
    height: u32,
    min_size: u32,
    max_size: u32,
) -> Result<()> {
    if width < min_size || height < min_size {
        return Err(anyhow::anyhow!(
            "Image too small: {}x{}, minimum: {}x{}",
            width,
            height,
            min_size,
            min_size
        ));
    }

    if width > max_size || height > max_size {
        return Err(anyhow::anyhow!(
            "Image too large: {}x{}, maximum: {}x{}",
            width,
            height,
            max_size,
            max_size
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_gray_round_trip_pixels() {
        let image = GrayImage::from_fn(5, 3, |x, y| Luma([(x * 10 + y) as u8]));
        let mat = gray_to_mat(&image).unwrap();
        assert_eq!(mat.rows(), 3);
        assert_eq!(mat.cols(), 5);
        assert_eq!(*mat.at_2d::<u8>(2, 4).unwrap(), 42);
    }

    #[test]
    fn test_rgb_becomes_bgr() {
        let image = RgbImage::from_pixel(2, 2, Rgb([10, 20, 30]));
        let mat = rgb_to_bgr_mat(&image).unwrap();
        assert_eq!(mat.channels(), 3);
        let px = *mat.at_2d::<Vec3b>(1, 1).unwrap();
        assert_eq!((px[0], px[1], px[2]), (30, 20, 10));
    }

    #[test]
    fn test_size_limits() {
        assert!(validate_image_size(64, 64).is_ok());
        assert!(validate_image_size(4, 64).is_err());
        assert!(validate_image_size(64, 20000).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_image(std::path::Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
