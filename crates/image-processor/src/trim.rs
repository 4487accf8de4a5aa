//! Content trimming: crop a page to the bounding box of its ink.
//!
//! Removing page margins lets consecutive pages butt up against each
//! other on continuous-feed paper without blank gaps between them.

use image::{RgbaImage, imageops};
use tracing::debug;

use crate::{ALPHA_VISIBLE, RenderError, Result};

/// Channel value at or above which a pixel counts as paper.
pub const DEFAULT_BACKGROUND_THRESHOLD: u8 = 240;

/// Padding applied on every side of the content box.
const DEFAULT_PADDING: u32 = 2;

/// Extra rows below the content so the cutter does not clip the last line.
const DEFAULT_TRAILING_PADDING: u32 = 8;

/// Parameters for [`trim_content`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimOptions {
    /// A visible pixel is content when any of R, G, B is below this.
    pub threshold: u8,
    /// Pixels added around the content box, clamped to the image.
    pub padding: u32,
    /// Additional rows added below the content box, clamped to the image.
    pub trailing_padding: u32,
}

impl Default for TrimOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BACKGROUND_THRESHOLD,
            padding: DEFAULT_PADDING,
            trailing_padding: DEFAULT_TRAILING_PADDING,
        }
    }
}

impl TrimOptions {
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_padding(mut self, padding: u32, trailing_padding: u32) -> Self {
        self.padding = padding;
        self.trailing_padding = trailing_padding;
        self
    }
}

/// Inclusive pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl ContentBounds {
    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }
}

fn is_content(px: &image::Rgba<u8>, threshold: u8) -> bool {
    let [r, g, b, a] = px.0;
    a >= ALPHA_VISIBLE && (r < threshold || g < threshold || b < threshold)
}

/// Find the tight bounding box of content pixels, without padding.
///
/// Returns `None` when every pixel is background.
pub fn content_bounds(img: &RgbaImage, threshold: u8) -> Option<ContentBounds> {
    let mut bounds: Option<ContentBounds> = None;

    for (x, y, px) in img.enumerate_pixels() {
        if !is_content(px, threshold) {
            continue;
        }
        let b = bounds.get_or_insert(ContentBounds {
            left: x,
            top: y,
            right: x,
            bottom: y,
        });
        b.left = b.left.min(x);
        b.right = b.right.max(x);
        // Row-major scan: `top` is fixed by the first hit.
        b.bottom = y;
    }

    bounds
}

/// Expand `bounds` by the configured padding, clamped to `width` x `height`.
pub fn pad_bounds(bounds: ContentBounds, width: u32, height: u32, opts: &TrimOptions) -> ContentBounds {
    ContentBounds {
        left: bounds.left.saturating_sub(opts.padding),
        top: bounds.top.saturating_sub(opts.padding),
        right: bounds.right.saturating_add(opts.padding).min(width - 1),
        bottom: bounds
            .bottom
            .saturating_add(opts.padding)
            .saturating_add(opts.trailing_padding)
            .min(height - 1),
    }
}

/// Crop `img` to its padded content box.
///
/// Returns [`RenderError::EmptyContent`] for a page with no content; the
/// caller skips such pages.
pub fn trim_content(img: &RgbaImage, opts: &TrimOptions) -> Result<RgbaImage> {
    let (width, height) = img.dimensions();
    let bounds = content_bounds(img, opts.threshold).ok_or(RenderError::EmptyContent)?;
    let padded = pad_bounds(bounds, width, height, opts);

    debug!(
        width,
        height,
        left = padded.left,
        top = padded.top,
        crop_w = padded.width(),
        crop_h = padded.height(),
        "Trimmed page to content"
    );

    Ok(imageops::crop_imm(img, padded.left, padded.top, padded.width(), padded.height()).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn no_padding() -> TrimOptions {
        TrimOptions::default().with_padding(0, 0)
    }

    #[test]
    fn test_all_white_is_empty() {
        let img = RgbaImage::from_pixel(384, 10, WHITE);
        let result = trim_content(&img, &TrimOptions::default());
        assert!(matches!(result, Err(RenderError::EmptyContent)));
    }

    #[test]
    fn test_transparent_dark_pixels_are_background() {
        let img = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 127]));
        assert!(content_bounds(&img, 240).is_none());
    }

    #[test]
    fn test_single_pixel_row_trims_to_column() {
        let mut img = RgbaImage::from_pixel(8, 1, WHITE);
        img.put_pixel(3, 0, BLACK);

        let bounds = content_bounds(&img, 240).unwrap();
        assert_eq!(
            bounds,
            ContentBounds {
                left: 3,
                top: 0,
                right: 3,
                bottom: 0
            }
        );

        let exact = trim_content(&img, &no_padding()).unwrap();
        assert_eq!(exact.dimensions(), (1, 1));

        // Default padding (2) widens the column to x = 1..=5, not the full row.
        let padded = trim_content(&img, &TrimOptions::default()).unwrap();
        assert_eq!(padded.dimensions(), (5, 1));
        assert_eq!(*padded.get_pixel(2, 0), BLACK);
    }

    #[test]
    fn test_any_channel_below_threshold_is_content() {
        let mut img = RgbaImage::from_pixel(4, 4, WHITE);
        img.put_pixel(2, 1, Rgba([255, 239, 255, 255]));
        let bounds = content_bounds(&img, 240).unwrap();
        assert_eq!((bounds.left, bounds.top), (2, 1));

        // At the threshold the pixel is still paper.
        img.put_pixel(2, 1, Rgba([240, 240, 240, 255]));
        assert!(content_bounds(&img, 240).is_none());
    }

    #[test]
    fn test_bounds_contain_all_content() {
        let mut img = RgbaImage::from_pixel(40, 30, WHITE);
        let marks = [(5, 7), (31, 4), (12, 25), (20, 20)];
        for &(x, y) in &marks {
            img.put_pixel(x, y, BLACK);
        }

        let b = content_bounds(&img, 240).unwrap();
        for &(x, y) in &marks {
            assert!(x >= b.left && x <= b.right && y >= b.top && y <= b.bottom);
        }
        assert_eq!(b, ContentBounds { left: 5, top: 4, right: 31, bottom: 25 });

        // Background columns/rows outside the box are removed on every side.
        let trimmed = trim_content(&img, &no_padding()).unwrap();
        assert_eq!(trimmed.dimensions(), (27, 22));
    }

    #[test]
    fn test_padding_clamped_to_image() {
        let mut img = RgbaImage::from_pixel(10, 10, WHITE);
        img.put_pixel(0, 9, BLACK);
        let trimmed = trim_content(&img, &TrimOptions::default()).unwrap();
        // left/bottom clamp at the edges; right gets +2, top gets -2.
        assert_eq!(trimmed.dimensions(), (3, 3));
    }

    #[test]
    fn test_trailing_padding_extends_bottom_only() {
        let mut img = RgbaImage::from_pixel(10, 40, WHITE);
        img.put_pixel(5, 10, BLACK);
        let opts = TrimOptions::default().with_padding(1, 6);
        let trimmed = trim_content(&img, &opts).unwrap();
        // rows 9..=17, columns 4..=6
        assert_eq!(trimmed.dimensions(), (3, 9));
    }

    #[test]
    fn test_trim_is_deterministic() {
        let mut img = RgbaImage::from_pixel(64, 64, WHITE);
        for i in 10..40 {
            img.put_pixel(i, i / 2 + 3, Rgba([100, 120, 130, 255]));
        }
        let a = trim_content(&img, &TrimOptions::default()).unwrap();
        let b = trim_content(&img, &TrimOptions::default()).unwrap();
        assert_eq!(a, b);
    }
}
