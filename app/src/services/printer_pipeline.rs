//! Document-to-job pipeline.
//!
//! Pages are pulled from the rasterizer a batch at a time, one page per
//! rayon worker. Each page is trimmed, scaled by its page-to-paper factor,
//! tone mapped and dithered; the full page bitmap is dropped as soon as it
//! is trimmed. Batches are joined back in page order before encoding, so
//! the byte stream always follows the document.

use anyhow::Context;
use image::{GrayImage, RgbaImage};
use image_processor::qr::render_qr;
use image_processor::{
    RenderError, TrimOptions, fit_to_page_width, floyd_steinberg_dither, rasterizer_for, tone_map, trim_content,
};
use rayon::prelude::*;
use thermal_printer::protocol::Alignment;
use thermal_printer::protocol::qr::QrErrorLevel;
use thermal_printer::{JobBuilder, PrintJob};
use tracing::{debug, info, warn};

/// Turn rendered pages into a print job. Pure, no I/O.
///
/// Pages that failed to render, trim to nothing or cannot be encoded are
/// skipped; the job still carries its init and feed/cut framing when no
/// page survives. At most one batch of full pages is held at a time.
pub fn render_job<I>(pages: I, target_width: u32, trim: &TrimOptions) -> Result<PrintJob, RenderError>
where
    I: IntoIterator<Item = image_processor::Result<RgbaImage>>,
{
    if target_width == 0 {
        return Err(RenderError::MalformedInput("target width must be positive".into()));
    }

    let batch_size = rayon::current_num_threads().max(1);
    let mut pages = pages.into_iter().enumerate();
    let mut builder = JobBuilder::new();
    let mut total = 0usize;

    loop {
        let batch: Vec<(usize, image_processor::Result<RgbaImage>)> = pages.by_ref().take(batch_size).collect();
        if batch.is_empty() {
            break;
        }
        total += batch.len();

        let planes: Vec<(usize, Option<GrayImage>)> = batch
            .into_par_iter()
            .map(|(index, page)| {
                let page_no = index + 1;
                let plane = match page {
                    Ok(img) => prepare_page(page_no, img, target_width, trim),
                    Err(e) => {
                        warn!(page = page_no, error = %e, "Skipping page that failed to render");
                        None
                    }
                };
                (page_no, plane)
            })
            .collect();

        for (page, plane) in planes {
            let Some(plane) = plane else { continue };
            if let Err(e) = builder.image(&plane) {
                warn!(page, error = %e, "Skipping page that failed to encode");
            }
        }
    }

    let job = builder.finish();
    info!(
        pages = total,
        printed = job.image_blocks(),
        bytes = job.len(),
        "Rendered print job"
    );
    Ok(job)
}

/// Trim -> fit -> tone -> dither for one page. `None` means a blank page.
fn prepare_page(page: usize, img: RgbaImage, target_width: u32, trim: &TrimOptions) -> Option<GrayImage> {
    let page_width = img.width();
    let trimmed = match trim_content(&img, trim) {
        Ok(t) => t,
        Err(RenderError::EmptyContent) => {
            debug!(page, "Page is blank, skipping");
            return None;
        }
        Err(e) => {
            warn!(page, error = %e, "Skipping page that failed to trim");
            return None;
        }
    };
    drop(img);

    let fitted = fit_to_page_width(&trimmed, page_width, target_width);
    Some(floyd_steinberg_dither(tone_map(&fitted)))
}

/// Rasterize a whole document and render it into a job.
///
/// A document that cannot be opened at all fails the request with
/// [`RenderError::Decode`].
pub fn render_document(
    document: &[u8],
    dpi: u32,
    target_width: u32,
    trim: &TrimOptions,
) -> Result<PrintJob, RenderError> {
    let rasterizer = rasterizer_for(document)?;
    debug!(rasterizer = rasterizer.name(), dpi, "Rasterizing document");
    let pages = rasterizer.render(document, dpi)?;
    render_job(pages, target_width, trim)
}

/// Text printed under a QR symbol.
#[derive(Debug, Clone, Copy)]
pub struct Caption<'a> {
    pub text: &'a str,
    /// Character magnification, 1..=8.
    pub scale: u8,
}

/// Build a job holding one QR symbol, optionally captioned.
///
/// `native` uses the printer's own `GS ( k` encoder; otherwise the symbol is
/// rendered here and sent as a raster image for printers that lack it.
pub fn qr_job(
    text: &str,
    target_width: u32,
    module_size: u8,
    native: bool,
    caption: Option<Caption<'_>>,
) -> anyhow::Result<PrintJob> {
    let mut builder = JobBuilder::new();
    if native {
        builder
            .qr(text.as_bytes(), module_size, QrErrorLevel::M)
            .context("failed to encode QR command")?;
    } else {
        let plane = render_qr(text, target_width).context("failed to render QR image")?;
        builder.image(&plane).context("failed to encode QR image")?;
    }
    if let Some(caption) = caption {
        builder
            .feed(1)
            .text_line(caption.text, Alignment::Center, true, caption.scale);
    }
    Ok(builder.finish())
}
