//! Structural file sniffing by header pattern.
//!
//! Patterns are written the way format documentation usually lists magic numbers, as
//! space-separated hex bytes, with `xx` marking a byte whose value does not matter:
//!
//! ```
//! use metaextract::sniff::HeaderPattern;
//!
//! let riff = HeaderPattern::parse("52 49 46 46 xx xx xx xx 57 41 56 45").unwrap();
//! assert!(riff.matches(b"RIFF\x24\x00\x00\x00WAVE"));
//! assert!(!riff.matches(b"RIFX\x24\x00\x00\x00WAVE"));
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::trace;

use crate::err::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPattern {
    bytes: Vec<Option<u8>>,
}

impl HeaderPattern {
    pub fn parse(pattern: &str) -> Result<Self, ParseError> {
        let bytes = pattern
            .split_whitespace()
            .enumerate()
            .map(|(i, token)| {
                if token.eq_ignore_ascii_case("xx") {
                    Ok(None)
                } else {
                    u8::from_str_radix(token, 16).map(Some).map_err(|_| {
                        ParseError::malformed(
                            "header pattern",
                            i as u64,
                            format!("`{}` is not a hex byte or `xx`", token),
                        )
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HeaderPattern { bytes })
    }

    /// Number of leading bytes the pattern looks at.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn matches(&self, header: &[u8]) -> bool {
        header.len() >= self.bytes.len()
            && self
                .bytes
                .iter()
                .zip(header)
                .all(|(expected, actual)| expected.is_none_or(|e| e == *actual))
    }

    /// Read just enough of `path` to test the pattern. Unreadable or short files do not match.
    pub fn check_file(&self, path: &Path) -> bool {
        let mut header = Vec::with_capacity(self.len());
        let read = File::open(path)
            .and_then(|f| f.take(self.len() as u64).read_to_end(&mut header));

        match read {
            Ok(_) => self.matches(&header),
            Err(e) => {
                trace!("cannot sniff {}: {}", path.display(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_rejects_bad_tokens() {
        assert!(HeaderPattern::parse("52 4G").is_err());
        assert!(HeaderPattern::parse("123").is_err());
    }

    #[test]
    fn test_short_input_never_matches() {
        let pattern = HeaderPattern::parse("DB A5 xx").unwrap();
        assert!(!pattern.matches(&[0xDB, 0xA5]));
        assert!(pattern.matches(&[0xDB, 0xA5, 0x00]));
    }

    #[test]
    fn test_check_file_is_repeatable() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"RIFF\x04\x00\x00\x00WAVEfmt ").unwrap();
        tmp.flush().unwrap();

        let pattern = HeaderPattern::parse("52 49 46 46 xx xx xx xx 57 41 56 45").unwrap();
        assert!(pattern.check_file(tmp.path()));
        assert!(pattern.check_file(tmp.path()));
        assert!(!pattern.check_file(Path::new("/definitely/not/here.wav")));
    }
}
