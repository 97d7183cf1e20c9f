use crate::VisionError;
use image::{DynamicImage, GrayImage};
use tracing::debug;

/// Gaussian sigma equivalent to a 5x5 kernel with automatic sigma.
pub const DEFAULT_BLUR_SIGMA: f32 = 1.1;

/// Convert an 8-bit frame to grayscale.
///
/// Accepts RGB, RGBA, luma and luma-alpha frames. Zero-sized frames and
/// 16-bit or float pixel formats are rejected as invalid.
pub fn to_grayscale(frame: &DynamicImage) -> Result<GrayImage, VisionError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(VisionError::invalid(format!(
            "frame has no pixels ({}x{})",
            frame.width(),
            frame.height()
        )));
    }

    match frame {
        DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_) => Ok(frame.to_luma8()),
        other => Err(VisionError::invalid(format!(
            "unsupported pixel format {:?}",
            other.color()
        ))),
    }
}

/// Grayscale + blur. Every matcher call runs on this output, never on raw
/// color pixels.
pub fn preprocess(frame: &DynamicImage, blur_sigma: f32) -> Result<GrayImage, VisionError> {
    let gray = to_grayscale(frame)?;
    if blur_sigma <= 0.0 {
        return Ok(gray);
    }
    let blurred = image::imageops::blur(&gray, blur_sigma);
    debug!(
        "Preprocessed {}x{} frame (grayscale, blur sigma={})",
        blurred.width(),
        blurred.height(),
        blur_sigma
    );
    Ok(blurred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb, RgbImage};

    #[test]
    fn test_grayscale_of_blank_frame() {
        let frame = DynamicImage::ImageRgb8(RgbImage::new(8, 4));
        let gray = preprocess(&frame, DEFAULT_BLUR_SIGMA).unwrap();
        assert_eq!(gray.dimensions(), (8, 4));
        assert!(gray.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_grayscale_keeps_white() {
        let frame = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 255, 255])));
        let gray = to_grayscale(&frame).unwrap();
        assert!(gray.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_one_pixel_frame() {
        let frame = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([10, 20, 30])));
        let gray = preprocess(&frame, DEFAULT_BLUR_SIGMA).unwrap();
        assert_eq!(gray.dimensions(), (1, 1));
    }

    #[test]
    fn test_rejects_empty_frame() {
        let frame = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(matches!(
            to_grayscale(&frame),
            Err(VisionError::InvalidImage { .. })
        ));
    }

    #[test]
    fn test_rejects_sixteen_bit_frame() {
        let buf: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::new(4, 4);
        let frame = DynamicImage::ImageLuma16(buf);
        assert!(to_grayscale(&frame).is_err());
    }
}
