//! Helpers for turning raw field bytes into text.
//!
//! The formats handled here store text as one byte per character. Bytes are decoded as
//! Windows-1252 (a superset of ISO-8859-1 for printable characters); undecodable bytes are
//! replaced rather than failing the parse.

use encoding::all::WINDOWS_1252;
use encoding::{DecoderTrap, Encoding};

/// Strip trailing NUL padding. Embedded NULs are kept.
pub fn trim_nul_padding(raw: &[u8]) -> &[u8] {
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &raw[..end]
}

/// Decode a single-byte-per-character field, dropping trailing NUL padding.
pub fn decode_single_byte(raw: &[u8]) -> String {
    let trimmed = trim_nul_padding(raw);
    WINDOWS_1252
        .decode(trimmed, DecoderTrap::Replace)
        .unwrap_or_else(|_| trimmed.iter().map(|&b| char::from(b)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_nuls_are_stripped() {
        assert_eq!(trim_nul_padding(b"ab\0\0"), b"ab");
        assert_eq!(trim_nul_padding(b"a\0b\0"), b"a\0b");
        assert_eq!(trim_nul_padding(b"\0\0"), b"");
    }

    #[test]
    fn test_decodes_high_bytes() {
        assert_eq!(decode_single_byte(b"caf\xe9\0"), "caf\u{e9}");
        assert_eq!(decode_single_byte(b"fmt "), "fmt ");
    }
}
