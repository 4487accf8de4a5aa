//! QR symbols rendered as raster planes.
//!
//! Used for printers that do not implement the native `GS ( k` QR
//! commands: the symbol is drawn here and printed as an ordinary image.

use image::{GrayImage, Luma};
use qrcode::QrCode;
use tracing::debug;

use crate::{RenderError, Result};

/// Render `data` as a binary QR plane at most `target_width` dots wide.
///
/// Modules are scaled by an integer factor (at least 1) so every module
/// stays square; the result is already 0/255 and needs no dithering.
pub fn render_qr(data: &str, target_width: u32) -> Result<GrayImage> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| RenderError::MalformedInput(format!("QR encode error: {e}")))?;
    let modules = code.to_colors();
    let module_count = code.width() as u32;

    let scale = (target_width / module_count).max(1);
    let img_size = module_count * scale;
    debug!(module_count, scale, img_size, "Rendering QR symbol");

    let mut img = GrayImage::from_pixel(img_size, img_size, Luma([255u8]));

    for (i, color) in modules.iter().enumerate() {
        if *color != qrcode::Color::Dark {
            continue;
        }
        let x = (i as u32) % module_count;
        let y = (i as u32) / module_count;
        for dy in 0..scale {
            for dx in 0..scale {
                img.put_pixel(x * scale + dx, y * scale + dy, Luma([0u8]));
            }
        }
    }

    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_qr_is_square_and_binary() {
        let img = render_qr("https://example.com/receipt/42", 200).unwrap();
        assert!(img.width() > 0 && img.width() <= 200);
        assert_eq!(img.width(), img.height());
        assert!(crate::is_binary(&img));
    }

    #[test]
    fn render_qr_scales_by_whole_modules() {
        // "test" fits a version 1 symbol: 21 modules.
        let img = render_qr("test", 100).unwrap();
        assert_eq!(img.width(), 21 * 4);
        // Top-left finder pattern corner is dark.
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn render_qr_never_scales_below_one() {
        let img = render_qr("test", 5).unwrap();
        assert_eq!(img.width(), 21);
    }
}
