//! Dithering algorithms for converting grayscale planes to black-and-white.
//!
//! Provides Floyd-Steinberg error-diffusion dithering and a binary-plane check.

use image::GrayImage;
use tracing::debug;

/// Default threshold value for binarization.
const THRESHOLD: u8 = 128;

/// Apply Floyd-Steinberg dithering to a grayscale plane.
///
/// Takes ownership of the plane and binarizes it in place, row-major.
/// Quantization error is pushed to unvisited neighbors, each update
/// clamped to `0..=255` before that neighbor is itself visited:
/// - Right:        7/16
/// - Bottom-left:  3/16
/// - Bottom:       5/16
/// - Bottom-right: 1/16
///
/// Every sample of the returned plane is exactly 0 or 255.
pub fn floyd_steinberg_dither(mut plane: GrayImage) -> GrayImage {
    let (width, height) = plane.dimensions();
    debug!(width, height, "Applying Floyd-Steinberg dithering");

    let (w, h) = (width as usize, height as usize);
    let buffer: &mut [u8] = &mut plane;

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let old_pixel = i32::from(buffer[idx]);
            let new_pixel: i32 = if old_pixel < i32::from(THRESHOLD) { 0 } else { 255 };
            buffer[idx] = new_pixel as u8;

            distribute_error(buffer, x, y, w, h, old_pixel - new_pixel);
        }
    }

    debug!("Floyd-Steinberg dithering complete");
    plane
}

/// Distribute quantization error to neighboring pixels.
fn distribute_error(buffer: &mut [u8], x: usize, y: usize, width: usize, height: usize, error: i32) {
    let mut add = |nx: usize, ny: usize, weight: i32| {
        let idx = ny * width + nx;
        let val = i32::from(buffer[idx]) + error * weight / 16;
        buffer[idx] = val.clamp(0, 255) as u8;
    };

    // Right: 7/16
    if x + 1 < width {
        add(x + 1, y, 7);
    }
    if y + 1 < height {
        // Bottom-left: 3/16
        if x > 0 {
            add(x - 1, y + 1, 3);
        }
        // Bottom: 5/16
        add(x, y + 1, 5);
        // Bottom-right: 1/16
        if x + 1 < width {
            add(x + 1, y + 1, 1);
        }
    }
}

/// Whether every sample is exactly 0 or 255.
pub fn is_binary(img: &GrayImage) -> bool {
    img.as_raw().iter().all(|&v| v == 0 || v == 255)
}
