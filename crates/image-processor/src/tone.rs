//! Contrast-boosted grayscale conversion.
//!
//! Thermal heads lose fine gray detail, so contrast is raised before
//! dithering to keep small text legible at 203 DPI.

use image::{GrayImage, Luma, Rgba, RgbaImage};
use tracing::debug;

use crate::ALPHA_VISIBLE;

const CONTRAST_GAIN: f64 = 1.2;
const CONTRAST_OFFSET: f64 = -20.0;

const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

fn boost(c: u8) -> f64 {
    (f64::from(c) * CONTRAST_GAIN + CONTRAST_OFFSET).clamp(0.0, 255.0)
}

/// Map a single RGBA sample to its boosted intensity.
pub fn tone_pixel(px: Rgba<u8>) -> u8 {
    let [r, g, b, a] = px.0;
    if a < ALPHA_VISIBLE {
        return 255;
    }
    let luma = LUMA_R * boost(r) + LUMA_G * boost(g) + LUMA_B * boost(b);
    // Truncation, not rounding.
    luma as u8
}

/// Convert an RGBA page into a contrast-boosted grayscale plane of the
/// same dimensions.
pub fn tone_map(img: &RgbaImage) -> GrayImage {
    let (width, height) = img.dimensions();
    debug!(width, height, "Tone mapping page");

    let mut out = GrayImage::new(width, height);
    for (x, y, px) in img.enumerate_pixels() {
        out.put_pixel(x, y, Luma([tone_pixel(*px)]));
    }
    out
}
