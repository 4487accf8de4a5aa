//! Page rasterizers: decode a source document into RGBA pages.
//!
//! Raster images decode to a single page. PDF documents (cargo feature
//! `pdf`) are rendered page by page through pdfium at the requested DPI.
//! Pages are produced lazily; an iterator cannot be restarted, the
//! document must be rendered again instead.

use image::RgbaImage;
use tracing::debug;

use crate::{RenderError, Result};

/// Lazily produced pages of one document, in document order.
///
/// A page that fails to render is yielded as an `Err` item so the caller
/// can skip it and keep going.
pub type PageIter<'a> = Box<dyn Iterator<Item = Result<RgbaImage>> + 'a>;

/// Turns document bytes into per-page RGBA bitmaps.
pub trait PageRasterizer {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Start rendering `document` at `dpi`.
    ///
    /// Fails with [`RenderError::Decode`] when the document as a whole is
    /// unreadable.
    fn render<'a>(&'a self, document: &'a [u8], dpi: u32) -> Result<PageIter<'a>>;
}

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Whether the bytes look like a PDF document.
pub fn is_pdf(document: &[u8]) -> bool {
    document.starts_with(PDF_MAGIC)
}

/// Pick a rasterizer for `document` by sniffing its header.
pub fn rasterizer_for(document: &[u8]) -> Result<Box<dyn PageRasterizer>> {
    if is_pdf(document) {
        #[cfg(feature = "pdf")]
        {
            return Ok(Box::new(pdf::PdfRasterizer::new()?));
        }
        #[cfg(not(feature = "pdf"))]
        {
            return Err(RenderError::UnsupportedDocument(
                "PDF input requires the `pdf` feature".into(),
            ));
        }
    }
    Ok(Box::new(ImageRasterizer))
}

/// Decodes PNG, JPEG, GIF, BMP and the other formats `image` supports.
///
/// The image keeps its own resolution; `dpi` is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRasterizer;

impl PageRasterizer for ImageRasterizer {
    fn name(&self) -> &str {
        "image"
    }

    fn render<'a>(&'a self, document: &'a [u8], _dpi: u32) -> Result<PageIter<'a>> {
        let img = image::load_from_memory(document).map_err(|e| RenderError::Decode(e.to_string()))?;
        debug!(width = img.width(), height = img.height(), "Decoded raster image");
        Ok(Box::new(std::iter::once(Ok(img.to_rgba8()))))
    }
}

#[cfg(feature = "pdf")]
pub mod pdf {
    //! PDF rendering through pdfium.

    use image::RgbaImage;
    use pdfium_render::prelude::*;
    use tracing::debug;

    use super::{PageIter, PageRasterizer};
    use crate::{RenderError, Result};

    const PDF_POINTS_PER_INCH: f32 = 72.0;

    pub struct PdfRasterizer {
        pdfium: Pdfium,
    }

    impl PdfRasterizer {
        /// Bind to the system pdfium library.
        pub fn new() -> Result<Self> {
            let bindings = Pdfium::bind_to_system_library()
                .map_err(|e| RenderError::UnsupportedDocument(format!("pdfium unavailable: {e}")))?;
            Ok(Self {
                pdfium: Pdfium::new(bindings),
            })
        }
    }

    struct PdfPages<'a> {
        document: PdfDocument<'a>,
        next: u16,
        count: u16,
        dpi: u32,
    }

    impl Iterator for PdfPages<'_> {
        type Item = Result<RgbaImage>;

        fn next(&mut self) -> Option<Self::Item> {
            if self.next >= self.count {
                return None;
            }
            let index = self.next;
            self.next += 1;
            Some(render_page(&self.document, index, self.dpi))
        }
    }

    fn render_page(document: &PdfDocument<'_>, index: u16, dpi: u32) -> Result<RgbaImage> {
        let page_num = index + 1;
        let page = document
            .pages()
            .get(index)
            .map_err(|e| RenderError::Decode(format!("page {page_num}: {e}")))?;

        let scale = dpi as f32 / PDF_POINTS_PER_INCH;
        let config = PdfRenderConfig::new()
            .set_target_width((page.width().value * scale) as i32)
            .set_target_height((page.height().value * scale) as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| RenderError::Decode(format!("page {page_num}: {e}")))?;
        let image = bitmap.as_image().to_rgba8();
        debug!(page = page_num, width = image.width(), height = image.height(), "Rendered PDF page");
        Ok(image)
    }

    impl PageRasterizer for PdfRasterizer {
        fn name(&self) -> &str {
            "pdf"
        }

        fn render<'a>(&'a self, document: &'a [u8], dpi: u32) -> Result<PageIter<'a>> {
            let document = self
                .pdfium
                .load_pdf_from_byte_slice(document, None)
                .map_err(|e| RenderError::Decode(e.to_string()))?;
            let count = document.pages().len();
            debug!(pages = count, dpi, "Loaded PDF document");
            Ok(Box::new(PdfPages {
                document,
                next: 0,
                count,
                dpi,
            }))
        }
    }
}
