//! Image stages for thermal receipt output.
//!
//! Every stage here is a pure function: decoded RGBA pages come in, a
//! binary plane ready for the raster encoder comes out. Pages are
//! trimmed to their content, fitted to the printer width, contrast-boosted
//! into grayscale and dithered with Floyd-Steinberg error diffusion.

pub mod dither;
pub mod qr;
pub mod rasterize;
pub mod resize;
pub mod tone;
pub mod trim;

pub use dither::{floyd_steinberg_dither, is_binary};
pub use rasterize::{ImageRasterizer, PageIter, PageRasterizer, rasterizer_for};
pub use resize::fit_to_page_width;
pub use tone::tone_map;
pub use trim::{TrimOptions, trim_content};

/// Narrow preset (58mm paper, 203 DPI).
pub const PAPER_WIDTH_58MM: u32 = 384;

/// Wide preset (80mm paper, 203 DPI).
pub const PAPER_WIDTH_80MM: u32 = 576;

/// Alpha below this value is treated as background by every stage.
pub const ALPHA_VISIBLE: u8 = 128;

/// Errors produced while turning a document into printable planes.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Document could not be decoded: {0}")]
    Decode(String),

    #[error("Page has no printable content")]
    EmptyContent,

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Unsupported document: {0}")]
    UnsupportedDocument(String),
}

/// Result type alias for image-processor operations.
pub type Result<T> = std::result::Result<T, RenderError>;
