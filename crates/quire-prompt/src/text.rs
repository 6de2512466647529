//! Encoding policy for prompt text
//!
//! Every text this crate emits is UTF-8 with `\n` line endings and no
//! byte-order mark.

use std::fmt::{self, Display, Formatter};

/// UTF-8 byte-order mark
pub const BOM: char = '\u{feff}';

const BOM_BYTES: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Drop every BOM and fold `\r\n` and lone `\r` into `\n`
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = if text.contains(BOM) {
        text.replace(BOM, "")
    } else {
        text.to_string()
    };
    if out.contains('\r') {
        out = out.replace("\r\n", "\n").replace('\r', "\n");
    }
    out
}

/// Violation of the output encoding policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingViolation {
    /// Byte-order mark at the given byte offset
    ByteOrderMark { offset: usize },
    /// Carriage return at the given byte offset
    CarriageReturn { offset: usize },
}

impl Display for EncodingViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByteOrderMark { offset } => write!(f, "byte-order mark at byte {offset}"),
            Self::CarriageReturn { offset } => write!(f, "carriage return at byte {offset}"),
        }
    }
}

/// Check a byte stream against the encoding policy
///
/// # Errors
/// Returns the first violation found
pub fn check_bytes(bytes: &[u8]) -> Result<(), EncodingViolation> {
    if let Some(offset) = bytes.iter().position(|b| *b == b'\r') {
        return Err(EncodingViolation::CarriageReturn { offset });
    }
    if let Some(offset) = bytes.windows(3).position(|w| w == BOM_BYTES) {
        return Err(EncodingViolation::ByteOrderMark { offset });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_bom_and_crlf() {
        assert_eq!(normalize("\u{feff}a\r\nb\rc\n"), "a\nb\nc\n");
        assert_eq!(normalize("plain\n"), "plain\n");
    }

    #[test]
    fn check_bytes_finds_cr() {
        assert_eq!(
            check_bytes(b"ab\r\n"),
            Err(EncodingViolation::CarriageReturn { offset: 2 })
        );
    }

    #[test]
    fn check_bytes_finds_embedded_bom() {
        let text = format!("ok{BOM}");
        assert_eq!(
            check_bytes(text.as_bytes()),
            Err(EncodingViolation::ByteOrderMark { offset: 2 })
        );
    }

    #[test]
    fn normalized_text_passes_policy() {
        let text = normalize("\u{feff}line one\r\nline two\r");
        assert!(check_bytes(text.as_bytes()).is_ok());
    }
}
