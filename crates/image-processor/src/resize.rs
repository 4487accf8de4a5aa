//! Width fitting for thermal printer output.
//!
//! A page is scaled so that its full width maps onto the printer's dot
//! width. The trimmed crop of that page takes the same factor, so narrow
//! content (a page number, a rule) keeps its printed size instead of being
//! stretched across the paper. Lanczos3 filtering throughout.

use image::RgbaImage;
use image::imageops::{self, FilterType};
use tracing::debug;

/// Dimensions of a `crop_w` x `crop_h` crop once its page, `page_width`
/// pixels wide, is scaled to `target_width`.
///
/// Never wider than `target_width`, never zero in either direction.
pub fn scaled_dimensions(crop_w: u32, crop_h: u32, page_width: u32, target_width: u32) -> (u32, u32) {
    let ratio = f64::from(target_width) / f64::from(page_width.max(1));
    let scale = |v: u32| ((f64::from(v) * ratio).round() as u32).max(1);
    (scale(crop_w).min(target_width.max(1)), scale(crop_h))
}

/// Resize a trimmed crop by the factor that fits its page to `target_width`.
///
/// Returns a copy of the crop when the factor leaves it unchanged.
pub fn fit_to_page_width(crop: &RgbaImage, page_width: u32, target_width: u32) -> RgbaImage {
    let (orig_w, orig_h) = crop.dimensions();
    let (new_width, new_height) = scaled_dimensions(orig_w, orig_h, page_width, target_width);

    if (new_width, new_height) == (orig_w, orig_h) {
        debug!(width = orig_w, "Page already at target scale, skipping resize");
        return crop.clone();
    }

    debug!(
        orig_w,
        orig_h,
        page_width,
        new_width,
        new_height,
        "Resizing page content to target scale"
    );

    imageops::resize(crop, new_width, new_height, FilterType::Lanczos3)
}
