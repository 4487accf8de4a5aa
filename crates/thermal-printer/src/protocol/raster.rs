//! `GS v 0` raster bit-image encoding.
//!
//! Layout: `1D 76 30 00 xL xH yL yH` followed by `ceil(W/8) * H` bytes,
//! rows top to bottom, byte columns left to right, bit 7 = leftmost dot.
//! A set bit burns a dot.
//!
//! The height field is 16 bits, so taller planes go out as consecutive
//! blocks of at most [`MAX_BAND_ROWS`] rows. Bands print back to back with
//! no gap.

use image::GrayImage;
use image::imageops;
use tracing::debug;

use super::GS;
use crate::{PrinterError, Result};

/// `GS v 0` with normal (1x1) density.
pub const RASTER_HEADER: [u8; 4] = [GS, 0x76, 0x30, 0x00];

/// Most rows one `GS v 0` block can describe.
pub const MAX_BAND_ROWS: u32 = u16::MAX as u32;

/// Bytes needed for one raster row of `width` dots.
pub fn width_bytes(width: u32) -> usize {
    (width as usize).div_ceil(8)
}

/// Pack one row of 0/255 samples into MSB-first bytes (0 = mark).
fn pack_row(row: &[u8], out: &mut Vec<u8>) {
    for chunk in row.chunks(8) {
        let mut byte_val: u8 = 0;
        for (i, &px) in chunk.iter().enumerate() {
            if px == 0 {
                byte_val |= 0x80 >> i;
            }
        }
        out.push(byte_val);
    }
}

/// Encode a binary plane as a complete raster image block.
///
/// The plane must already be at printer width; nothing is resized here.
/// Any sample other than 0 or 255 is a caller bug and is reported as
/// [`PrinterError::MalformedInput`], as are dimensions that do not fit the
/// 16-bit header fields.
pub fn encode_raster(plane: &GrayImage) -> Result<Vec<u8>> {
    let (width, height) = plane.dimensions();
    let row_bytes = width_bytes(width);

    if row_bytes > usize::from(u16::MAX) || height > u32::from(u16::MAX) {
        return Err(PrinterError::MalformedInput(format!(
            "raster {width}x{height} exceeds GS v 0 limits"
        )));
    }
    if let Some(pos) = plane.as_raw().iter().position(|&v| v != 0 && v != 255) {
        let w = width.max(1) as usize;
        return Err(PrinterError::MalformedInput(format!(
            "non-binary sample {} at ({}, {})",
            plane.as_raw()[pos],
            pos % w,
            pos / w
        )));
    }

    let mut out = Vec::with_capacity(RASTER_HEADER.len() + 4 + row_bytes * height as usize);
    out.extend_from_slice(&RASTER_HEADER);
    out.extend_from_slice(&(row_bytes as u16).to_le_bytes());
    out.extend_from_slice(&(height as u16).to_le_bytes());

    if width > 0 {
        for row in plane.as_raw().chunks(width as usize) {
            pack_row(row, &mut out);
        }
    }

    debug!(width, height, row_bytes, total = out.len(), "Encoded raster block");
    Ok(out)
}

/// Encode a plane of any height as one or more raster blocks.
///
/// Planes up to [`MAX_BAND_ROWS`] tall produce exactly the output of
/// [`encode_raster`]. Taller planes are split top to bottom into bands
/// whose blocks are concatenated.
pub fn encode_raster_bands(plane: &GrayImage) -> Result<Vec<u8>> {
    let (width, height) = plane.dimensions();
    if height <= MAX_BAND_ROWS {
        return encode_raster(plane);
    }

    let bands = height.div_ceil(MAX_BAND_ROWS);
    let mut out = Vec::with_capacity((RASTER_HEADER.len() + 4) * bands as usize + width_bytes(width) * height as usize);
    let mut top = 0;
    while top < height {
        let rows = MAX_BAND_ROWS.min(height - top);
        let band = imageops::crop_imm(plane, 0, top, width, rows).to_image();
        out.extend(encode_raster(&band)?);
        top += rows;
    }

    debug!(width, height, bands, "Split tall raster into bands");
    Ok(out)
}
