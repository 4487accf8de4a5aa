//! ESC/POS command family.
//!
//! Fixed control commands live here; raster images, QR symbols and text
//! have their own modules. [`job`] assembles them into a [`job::PrintJob`].

pub mod job;
pub mod qr;
pub mod raster;
pub mod text;

pub const ESC: u8 = 0x1b;
pub const GS: u8 = 0x1d;
pub const LF: u8 = 0x0a;

/// `ESC @`: reset the printer to power-on state.
pub const INIT: [u8; 2] = [ESC, 0x40];

/// `ESC a 1`: center subsequent images and text.
pub const ALIGN_CENTER: [u8; 3] = [ESC, 0x61, 0x01];

/// `ESC d 4`: print the buffer and feed four lines.
pub const FEED: [u8; 3] = feed_lines(4);

/// `GS V B 0`: feed to the cutter and cut fully.
pub const FULL_CUT: [u8; 4] = [GS, 0x56, 0x42, 0x00];

/// Horizontal alignment for `ESC a n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    pub fn command(self) -> [u8; 3] {
        let n = match self {
            Alignment::Left => 0,
            Alignment::Center => 1,
            Alignment::Right => 2,
        };
        [ESC, 0x61, n]
    }
}

/// `ESC d n`: print and feed `lines` lines.
pub const fn feed_lines(lines: u8) -> [u8; 3] {
    [ESC, 0x64, lines]
}
