use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::morphology::{grayscale_close, grayscale_dilate, grayscale_erode, Mask};
use thiserror::Error;
use tracing::debug;

/// Radius of the local neighbourhood used by the adaptive threshold.
pub const SCAN_WINDOW_RADIUS: u32 = 11;
/// Offset subtracted from the Gaussian-weighted local mean before comparing.
pub const SCAN_OFFSET: i16 = 10;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Load an image file, rejecting zero-area inputs.
pub fn load_image(path: &Path) -> Result<DynamicImage, NormalizeError> {
    let img = image::open(path)?;
    ensure_nonzero(img.width(), img.height())?;
    Ok(img)
}

/// Decode raw image bytes (JPEG / PNG / WEBP / …), rejecting zero-area inputs.
pub fn load_image_from_bytes(data: &[u8]) -> Result<DynamicImage, NormalizeError> {
    let img = image::load_from_memory(data)?;
    ensure_nonzero(img.width(), img.height())?;
    Ok(img)
}

/// Convert a colour photograph into a scanned-paper colour scheme: grayscale
/// followed by a Gaussian-weighted local adaptive threshold.
///
/// A single global threshold fails under uneven lighting; comparing each
/// pixel against its own neighbourhood mean (minus [`SCAN_OFFSET`]) separates
/// ink from paper per region. The output is strictly binary: every pixel is
/// 0 or 255.
pub fn to_scanned_form(image: &DynamicImage) -> Result<GrayImage, NormalizeError> {
    ensure_nonzero(image.width(), image.height())?;

    let gray = image.to_luma8();
    // Sigma chosen so the Gaussian weights fall off within the window radius.
    let sigma = SCAN_WINDOW_RADIUS as f32 / 3.0;
    let local_mean = gaussian_blur_f32(&gray, sigma);

    let mut binary = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let threshold = local_mean.get_pixel(x, y)[0] as i16 - SCAN_OFFSET;
        let value = if pixel[0] as i16 > threshold { 255 } else { 0 };
        binary.put_pixel(x, y, Luma([value]));
    }

    debug!(
        width = binary.width(),
        height = binary.height(),
        "applied scan conversion"
    );
    Ok(binary)
}

/// Remove speckle noise: `iterations` repetitions of a dilate/erode pair with
/// a unit structuring element, a morphological close, then a 3×3 median blur.
///
/// The unit element keeps character strokes untouched while the median blur
/// does the speckle removal; higher `iterations` trades fine detail for more
/// aggressive cleanup. `iterations` must be at least 1.
pub fn remove_noise(image: GrayImage, iterations: u32) -> Result<GrayImage, NormalizeError> {
    ensure_nonzero(image.width(), image.height())?;
    if iterations == 0 {
        return Err(NormalizeError::InvalidImage(
            "noise removal requires at least one iteration".to_string(),
        ));
    }

    let unit = Mask::square(0);
    let mut image = image;
    for _ in 0..iterations {
        image = grayscale_dilate(&image, &unit);
        image = grayscale_erode(&image, &unit);
    }
    image = grayscale_close(&image, &unit);
    Ok(median_filter(&image, 1, 1))
}

/// Widen character strokes: invert polarity, dilate with a 2×2 element
/// `iterations` times, invert back.
///
/// This is a pre-step so line detection sees solid strokes; it is not meant
/// as a final OCR input.
pub fn thicken_font(image: GrayImage, iterations: u32) -> Result<GrayImage, NormalizeError> {
    ensure_nonzero(image.width(), image.height())?;

    let mut image = image;
    image::imageops::invert(&mut image);

    // 2×2 element anchored at its top-left corner, growing strokes one pixel
    // right and down per pass.
    let element = Mask::from_image(&GrayImage::from_pixel(2, 2, Luma([255])), 0, 0);
    for _ in 0..iterations {
        image = grayscale_dilate(&image, &element);
    }

    image::imageops::invert(&mut image);
    Ok(image)
}

/// Encode a grayscale image as PNG bytes.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, NormalizeError> {
    encode_dynamic_png(&DynamicImage::ImageLuma8(image.clone()))
}

/// Encode any image as PNG bytes.
pub fn encode_dynamic_png(image: &DynamicImage) -> Result<Vec<u8>, NormalizeError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| NormalizeError::Encode(e.to_string()))?;
    Ok(buf)
}

fn ensure_nonzero(width: u32, height: u32) -> Result<(), NormalizeError> {
    if width == 0 || height == 0 {
        return Err(NormalizeError::InvalidImage(format!(
            "image has zero area ({width}x{height})"
        )));
    }
    Ok(())
}
