//! Print job assembly.
//!
//! A job is an ordered list of byte segments:
//! `[init][align] [block]* [feed][cut]`, where each block is a raster
//! image, a QR symbol or text. The output depends only on the inputs.

use image::GrayImage;

use super::qr::{self, QrErrorLevel};
use super::raster::encode_raster_bands;
use super::{ALIGN_CENTER, Alignment, FEED, FULL_CUT, INIT, feed_lines, text};
use crate::Result;

/// One logical receipt, ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    segments: Vec<Vec<u8>>,
    image_blocks: usize,
}

impl PrintJob {
    /// Ordered segments making up the job.
    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    /// Number of raster image blocks (one per printed page).
    pub fn image_blocks(&self) -> usize {
        self.image_blocks
    }

    /// Total byte length of the job.
    pub fn len(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenate all segments into the wire byte stream.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for segment in &self.segments {
            out.extend_from_slice(segment);
        }
        out
    }

    /// Wrap an already encoded byte stream, e.g. one loaded from disk.
    pub fn from_raw(bytes: Vec<u8>) -> Self {
        Self {
            segments: vec![bytes],
            image_blocks: 0,
        }
    }
}

/// Builds a [`PrintJob`] between the fixed header and trailer.
#[derive(Debug, Clone)]
pub struct JobBuilder {
    segments: Vec<Vec<u8>>,
    image_blocks: usize,
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JobBuilder {
    /// Start a job with printer reset and center alignment.
    pub fn new() -> Self {
        Self {
            segments: vec![INIT.to_vec(), ALIGN_CENTER.to_vec()],
            image_blocks: 0,
        }
    }

    /// Append a binary plane as a raster image block.
    ///
    /// Planes taller than one `GS v 0` block allows are banded; the bands
    /// still count as a single image.
    pub fn image(&mut self, plane: &GrayImage) -> Result<&mut Self> {
        let block = encode_raster_bands(plane)?;
        Ok(self.raster_block(block))
    }

    /// Append an already encoded raster image block.
    pub fn raster_block(&mut self, block: Vec<u8>) -> &mut Self {
        self.segments.push(block);
        self.image_blocks += 1;
        self
    }

    /// Append a native QR symbol.
    pub fn qr(&mut self, data: &[u8], module_size: u8, level: QrErrorLevel) -> Result<&mut Self> {
        let seq = qr::qr_code(data, module_size, level)?;
        self.segments.push(seq);
        Ok(self)
    }

    /// Append a line of text with the given alignment, weight and
    /// magnification (1..=8, applied to both axes).
    ///
    /// Alignment, weight and size are restored afterwards so later images
    /// stay centered at normal density.
    pub fn text_line(&mut self, line: &str, alignment: Alignment, bold: bool, scale: u8) -> &mut Self {
        let mut seg = Vec::new();
        seg.extend_from_slice(&alignment.command());
        if bold {
            seg.extend_from_slice(&text::set_bold(true));
        }
        if scale > 1 {
            seg.extend_from_slice(&text::set_char_size(scale, scale));
        }
        seg.extend(text::line(line));
        if scale > 1 {
            seg.extend_from_slice(&text::set_char_size(1, 1));
        }
        if bold {
            seg.extend_from_slice(&text::set_bold(false));
        }
        if alignment != Alignment::Center {
            seg.extend_from_slice(&ALIGN_CENTER);
        }
        self.segments.push(seg);
        self
    }

    /// Append `ESC d n` to advance the paper by `lines`.
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.segments.push(feed_lines(lines).to_vec());
        self
    }

    /// Close the job with paper feed and full cut.
    pub fn finish(mut self) -> PrintJob {
        self.segments.push(FEED.to_vec());
        self.segments.push(FULL_CUT.to_vec());
        PrintJob {
            segments: self.segments,
            image_blocks: self.image_blocks,
        }
    }
}
