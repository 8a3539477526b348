//! Page preprocessing: grayscale conversion and fixed-threshold binarisation.
//!
//! Tesseract's own Otsu binarisation struggles with the faint table rules and
//! stamp bleed on scanned rolls. A hard threshold at 200 keeps the print and
//! drops the background tint, which is what the extraction pattern was tuned on.
//!
//! Grayscale uses ITU-R 601-2 luma in PIL's 16-bit fixed point with rounding,
//! not the Rec. 709 weights of `DynamicImage::to_luma8`, so thresholds carry
//! over unchanged from tools built on PIL's `"L"` mode.

use image::{DynamicImage, GrayImage, Luma};
use std::io::Cursor;
use tracing::debug;

/// Value written for pixels below the threshold.
pub const BLACK: u8 = 0;
/// Value written for pixels at or above the threshold.
pub const WHITE: u8 = 255;

/// Convert to 8-bit grayscale with ITU-R 601-2 luma weights.
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([luma_601(r, g, b)])
    })
}

/// `0.299 R + 0.587 G + 0.114 B`, rounded. The weights sum to `1 << 16`, so
/// the result never exceeds 255.
fn luma_601(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

/// Map every pixel to [`BLACK`] if it is darker than `threshold`, else [`WHITE`].
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = gray.clone();
    for Luma([v]) in out.pixels_mut() {
        *v = if *v < threshold { BLACK } else { WHITE };
    }
    out
}

/// Grayscale then binarise.
pub fn prepare_page(img: &DynamicImage, threshold: u8) -> GrayImage {
    let binary = binarize(&to_grayscale(img), threshold);
    debug!(
        "Binarised {}x{} page at threshold {}",
        binary.width(),
        binary.height(),
        threshold
    );
    binary
}

/// PNG-encode a page for the OCR engine. PNG is lossless, so the
/// binarisation survives intact.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}
