//! Native QR code commands (`GS ( k`, function 167..181 family).
//!
//! A symbol is printed in five steps: select model, set module size, set
//! error correction, store data, print. [`qr_code`] emits all five.

use super::GS;
use crate::{PrinterError, Result};

/// `GS ( k` prefix.
const FN_PREFIX: [u8; 3] = [GS, 0x28, 0x6b];

/// QR symbol "cn" code.
const CN_QR: u8 = 0x31;

/// Largest payload whose `length + 3` still fits the 16-bit length field.
pub const MAX_DATA_LEN: usize = u16::MAX as usize - 3;

/// Error correction level (`fn 169`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QrErrorLevel {
    /// ~7% recovery
    L,
    /// ~15% recovery
    #[default]
    M,
    /// ~25% recovery
    Q,
    /// ~30% recovery
    H,
}

impl QrErrorLevel {
    fn code(self) -> u8 {
        match self {
            QrErrorLevel::L => 0x30,
            QrErrorLevel::M => 0x31,
            QrErrorLevel::Q => 0x32,
            QrErrorLevel::H => 0x33,
        }
    }
}

fn function(params: &[u8]) -> Vec<u8> {
    let len = params.len() as u16;
    let mut buf = Vec::with_capacity(5 + params.len());
    buf.extend_from_slice(&FN_PREFIX);
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(params);
    buf
}

/// Select QR model 2 (`fn 165`).
pub fn select_model() -> Vec<u8> {
    function(&[CN_QR, 0x41, 0x32, 0x00])
}

/// Set module size in dots (`fn 167`), clamped to 1..=16.
pub fn set_module_size(dots: u8) -> Vec<u8> {
    function(&[CN_QR, 0x43, dots.clamp(1, 16)])
}

/// Set error correction level (`fn 169`).
pub fn set_error_correction(level: QrErrorLevel) -> Vec<u8> {
    function(&[CN_QR, 0x45, level.code()])
}

/// Store symbol data (`fn 180`). The length field covers `data.len() + 3`.
pub fn store_data(data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() || data.len() > MAX_DATA_LEN {
        return Err(PrinterError::MalformedInput(format!(
            "QR payload length {} outside 1..={MAX_DATA_LEN}",
            data.len()
        )));
    }
    let mut params = Vec::with_capacity(3 + data.len());
    params.extend_from_slice(&[CN_QR, 0x50, 0x30]);
    params.extend_from_slice(data);
    Ok(function(&params))
}

/// Print the stored symbol (`fn 181`).
pub fn print_symbol() -> Vec<u8> {
    function(&[CN_QR, 0x51, 0x30])
}

/// Full command sequence printing `data` as a QR symbol.
pub fn qr_code(data: &[u8], module_size: u8, level: QrErrorLevel) -> Result<Vec<u8>> {
    let mut out = select_model();
    out.extend(set_module_size(module_size));
    out.extend(set_error_correction(level));
    out.extend(store_data(data)?);
    out.extend(print_symbol());
    Ok(out)
}
