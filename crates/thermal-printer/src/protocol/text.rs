//! Text and character formatting commands.

use super::{ESC, GS, LF};

/// `ESC E n`: emphasized (bold) on or off.
pub fn set_bold(on: bool) -> [u8; 3] {
    [ESC, 0x45, u8::from(on)]
}

/// `GS ! n`: character magnification, each factor clamped to 1..=8.
pub fn set_char_size(width: u8, height: u8) -> [u8; 3] {
    let w = width.clamp(1, 8) - 1;
    let h = height.clamp(1, 8) - 1;
    [GS, 0x21, (w << 4) | h]
}

/// Encode a line of text followed by LF.
///
/// Printers default to a single-byte code page, so anything outside
/// printable ASCII becomes `?`. Tabs are kept.
pub fn line(text: &str) -> Vec<u8> {
    let mut out: Vec<u8> = text
        .chars()
        .map(|c| match c {
            ' '..='~' | '\t' => c as u8,
            _ => b'?',
        })
        .collect();
    out.push(LF);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_toggle() {
        assert_eq!(set_bold(true), [0x1b, 0x45, 0x01]);
        assert_eq!(set_bold(false), [0x1b, 0x45, 0x00]);
    }

    #[test]
    fn char_size_packs_nibbles() {
        assert_eq!(set_char_size(1, 1), [0x1d, 0x21, 0x00]);
        assert_eq!(set_char_size(2, 3), [0x1d, 0x21, 0x12]);
        assert_eq!(set_char_size(0, 20), [0x1d, 0x21, 0x07]);
    }

    #[test]
    fn line_replaces_non_ascii() {
        assert_eq!(line("Total: 5€"), b"Total: 5?\n".to_vec());
        assert_eq!(line("a\tb\r"), b"a\tb?\n".to_vec());
    }
}
