//! Image preprocessing for both acquisition variants.
//!
//! The local OCR variant wants a binarized page: grayscale conversion
//! followed by Otsu's automatic global threshold. The vision variant wants
//! a compact JPEG data URL. Both start from `decode_image`, which guards
//! against oversized or truncated inputs before handing bytes to the
//! decoder.

use std::io::Cursor;

use base64::Engine as _;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use tracing::debug;

use super::AcquireError;

/// Maximum input image size (in bytes) before rejecting.
/// Prevents OOM on corrupt/adversarial files.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// Smallest plausible image file (a minimal PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Decode image bytes with size guards.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, AcquireError> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AcquireError::ImageDecode(format!(
            "Image too large: {} bytes (max {MAX_IMAGE_BYTES})",
            bytes.len()
        )));
    }
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(AcquireError::ImageDecode(format!(
            "Image too small to be valid: {} bytes",
            bytes.len()
        )));
    }
    image::load_from_memory(bytes)
        .map_err(|e| AcquireError::ImageDecode(format!("Failed to decode image: {e}")))
}

/// Grayscale + Otsu global-threshold binarization.
///
/// Standard preparation for OCR engines: text becomes solid black on a
/// white page regardless of scan lighting.
pub fn binarize(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let threshold = otsu_threshold(&gray);
    debug!(threshold, "Binarizing image with Otsu threshold");

    let mut out = gray;
    for pixel in out.pixels_mut() {
        *pixel = if pixel.0[0] > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        };
    }
    out
}

/// Otsu's method: pick the threshold that maximizes between-class variance
/// of the grayscale histogram.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 127;
    }

    let weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0f64;
    let mut count_background = 0u64;
    let mut best_threshold = 0u8;
    let mut best_variance = 0.0f64;

    for level in 0..256usize {
        count_background += histogram[level];
        if count_background == 0 {
            continue;
        }
        let count_foreground = total - count_background;
        if count_foreground == 0 {
            break;
        }

        sum_background += level as f64 * histogram[level] as f64;

        let mean_background = sum_background / count_background as f64;
        let mean_foreground = (weighted_sum - sum_background) / count_foreground as f64;

        let variance = count_background as f64
            * count_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_threshold = level as u8;
        }
    }

    best_threshold
}

/// Re-encode an image as a JPEG data URL for the vision backend.
///
/// JPEG keeps the payload small; alpha channels are flattened to RGB first
/// because the JPEG encoder rejects RGBA.
pub fn to_jpeg_data_url(image: &DynamicImage) -> Result<String, AcquireError> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());

    let mut cursor = Cursor::new(Vec::new());
    rgb.write_to(&mut cursor, ImageFormat::Jpeg)
        .map_err(|e| AcquireError::ImageEncode(format!("JPEG encoding failed: {e}")))?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(cursor.get_ref());
    Ok(format!("data:image/jpeg;base64,{encoded}"))
}
