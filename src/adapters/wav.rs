//! Microsoft WAV audio, including the Broadcast Wave Format (`bext`) extension.
//!
//! A WAV file is a RIFF container: a 12 byte header (`RIFF`, total length, `WAVE`) followed by
//! chunks, each a 4 byte tag, a 4 byte body length and the body. The walker reads every chunk
//! through an element tree chosen by its tag, then jumps to the next chunk using the declared
//! length, whatever the element actually consumed.

use std::borrow::Cow;
use std::path::Path;

use log::{debug, warn};

use crate::adapter::{Adapter, write_file_info};
use crate::byte_source::{ByteSource, FileByteSource};
use crate::context::ParseContext;
use crate::element::Element;
use crate::err::{ParseError, Result};
use crate::sniff::HeaderPattern;

/// All WAV files start with this header: `RIFF`, any length, `WAVE`, `fmt `.
pub const WAV_HEADER: &str = "52 49 46 46 xx xx xx xx 57 41 56 45 66 6D 74 20";

/// Tag and length of every chunk preceding its body.
const CHUNK_PREAMBLE: u64 = 8;

/// Where the first chunk starts.
const FIRST_CHUNK_OFFSET: u64 = 12;

/// Upper bound for the free-text coding history of a `bext` chunk.
const MAX_CODING_HISTORY: u64 = 1 << 20;

/// A chunk visited by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveChunk {
    pub tag: [u8; 4],
    /// Offset of the tag.
    pub start: u64,
    /// Declared body length.
    pub length: u64,
    /// Where the walker repositioned the source after this chunk.
    pub next: u64,
}

pub struct WaveAdapter {
    header: HeaderPattern,
    riff: Element,
    format: Element,
    data: Element,
    bext: Element,
    generic: Element,
}

impl Default for WaveAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveAdapter {
    pub fn new() -> Self {
        let riff = Element::compound([
            ("length", Element::u32()),
            ("subtype", Element::fixed_string(4)),
        ]);

        let format = Element::compound([
            ("length", Element::u32()),
            ("format", Element::u16()),
            ("channels", Element::u16()),
            ("samples_per_sec", Element::u32()),
            ("avg_bytes_per_sec", Element::u32()),
            ("block_align", Element::u16()),
            ("bits_per_sample", Element::u16()),
        ]);

        let bext = Element::compound([
            ("length", Element::u32()),
            ("description", Element::fixed_string(256)),
            ("originator", Element::fixed_string(32)),
            ("originator_reference", Element::fixed_string(32)),
            ("origination_date", Element::fixed_string(10)),
            ("origination_date_format", Element::constant("'yyyy-mm-dd'")),
            ("origination_time", Element::fixed_string(8)),
            ("origination_time_format", Element::constant("'hh:mm:ss'")),
            ("time_reference_low", Element::u32()),
            ("time_reference_high", Element::u32()),
            ("version", Element::u16()),
            ("umid", Element::positional(64)),
            ("reserved", Element::positional(190)),
            ("coding_history", Element::remainder("length", MAX_CODING_HISTORY)),
        ]);

        let generic = Element::compound([("length", Element::u32())]);

        WaveAdapter {
            header: HeaderPattern::parse(WAV_HEADER).expect("WAV_HEADER is a valid pattern"),
            riff,
            format,
            data: generic.clone(),
            bext,
            generic,
        }
    }

    pub fn accepts_source(&self, source: &mut dyn ByteSource) -> Result<bool> {
        let restore = source.position();
        source.set_position(0)?;
        let n = (self.header.len() as u64).min(source.len()) as usize;
        let header = source.read_bytes(n, "RIFF header")?;
        source.set_position(restore)?;
        Ok(self.header.matches(&header))
    }

    /// Walk the RIFF header and every chunk, recording them in the innermost scope of `ctx`.
    pub fn walk(&self, source: &mut dyn ByteSource, ctx: &mut ParseContext) -> Result<Vec<WaveChunk>> {
        // Skip the `RIFF` literal.
        source.set_position(4)?;
        self.riff.read(source, ctx, "RIFF")?;
        let total_length = ctx.get_u64_in_scope("RIFF.length")?;
        debug!("RIFF declares {} bytes", total_length);

        let mut chunks = vec![];
        let mut bytes_consumed = FIRST_CHUNK_OFFSET;

        while bytes_consumed < total_length {
            // Every chunk advances by at least its preamble, so this only trips on arithmetic
            // errors in the loop itself.
            check_chunk_bound(chunks.len() as u64, total_length, source.position())?;

            let chunk_start = source.position();
            let mut tag = [0_u8; 4];
            source.read_into(&mut tag, "chunk tag")?;

            let (group, element) = match &tag {
                b"fmt " => (Cow::Borrowed("fmt"), &self.format),
                b"data" => (Cow::Borrowed("data"), &self.data),
                b"bext" => (Cow::Borrowed("bext"), &self.bext),
                other => (group_name(other), &self.generic),
            };

            let read = element.read(source, ctx, &group)?;
            let length = ctx.get_u64_in_scope(&format!("{}.length", group))?;

            let body_start = chunk_start + CHUNK_PREAMBLE;
            let next = body_start + length;
            debug!(
                "chunk `{}` at {}: declared {} bytes, read {}",
                group,
                chunk_start,
                length,
                read.consumed.saturating_sub(4)
            );
            if read.consumed.saturating_sub(4) > length {
                warn!(
                    "chunk `{}` at {} declares {} bytes but {} were read; trusting the declaration",
                    group,
                    chunk_start,
                    length,
                    read.consumed - 4
                );
            }
            if next > source.len() {
                return Err(ParseError::Truncated {
                    what: "chunk body",
                    offset: body_start,
                    need: length,
                    have: source.len().saturating_sub(body_start),
                });
            }

            source.set_position(next)?;
            bytes_consumed += length + CHUNK_PREAMBLE;
            chunks.push(WaveChunk {
                tag,
                start: chunk_start,
                length,
                next,
            });
        }

        Ok(chunks)
    }
}

/// Fails once `visited` chunks already cover every preamble that fits in `total_length` bytes.
fn check_chunk_bound(visited: u64, total_length: u64, offset: u64) -> Result<()> {
    let max_chunks = total_length / CHUNK_PREAMBLE;
    if visited >= max_chunks {
        return Err(ParseError::malformed(
            "RIFF chunk list",
            offset,
            format!("more than {} chunks in {} bytes", max_chunks, total_length),
        ));
    }
    Ok(())
}

/// Group name for a chunk without a dedicated element: the tag without padding, restricted to
/// characters that are safe in paths and rendered element names.
fn group_name(tag: &[u8; 4]) -> Cow<'static, str> {
    let name: String = tag
        .iter()
        .map(|&b| char::from(b))
        .collect::<String>()
        .trim_end_matches([' ', '\0'])
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    match name.chars().next() {
        None => Cow::Borrowed("unknown"),
        Some(first) if first.is_ascii_digit() => Cow::Owned(format!("_{}", name)),
        Some(_) => Cow::Owned(name),
    }
}

impl Adapter for WaveAdapter {
    fn name(&self) -> &'static str {
        "Microsoft WAV Audio Adapter"
    }

    fn description(&self) -> &'static str {
        "Adapts all Microsoft WAV audio files, includes BWF"
    }

    fn version(&self) -> &'static str {
        "2.0"
    }

    fn input_media_type(&self) -> &'static str {
        "audio/wav"
    }

    fn output_schema_id(&self) -> &'static str {
        "wav.dtd"
    }

    fn accepts(&self, file: &Path) -> bool {
        self.header.check_file(file)
    }

    fn parse(&self, file: &Path, ctx: &mut ParseContext) -> Result<()> {
        let mut source = FileByteSource::open(file)?;

        ctx.start("WAV");
        write_file_info(file, ctx)?;
        self.walk(&mut source, ctx)?;
        ctx.end("WAV")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_source::MemoryByteSource;
    use crate::ensure_env_logger_initialized;

    #[test]
    fn test_group_names() {
        assert_eq!(group_name(b"LIST"), "LIST");
        assert_eq!(group_name(b"id3 "), "id3");
        assert_eq!(group_name(b"\0\0\0\0"), "unknown");
        assert_eq!(group_name(b"a-b\0"), "a_b");
        assert_eq!(group_name(b"2abc"), "_2abc");
    }

    #[test]
    fn test_chunk_bound() {
        // 52 bytes hold at most 6 chunk preambles.
        for visited in 0..6 {
            check_chunk_bound(visited, 52, 12).unwrap();
        }
        let err = check_chunk_bound(6, 52, 60).unwrap_err();
        assert_eq!(err.kind(), crate::err::ErrorKind::Malformed);
        assert!(err.to_string().contains("more than 6 chunks in 52 bytes"));

        // A RIFF length below one preamble allows no chunk at all.
        assert!(check_chunk_bound(0, 7, 12).is_err());
    }

    #[test]
    fn test_accepts_source_keeps_position() {
        ensure_env_logger_initialized();
        let adapter = WaveAdapter::new();
        let mut source = MemoryByteSource::new(b"RIFF\x04\x00\x00\x00WAVEfmt ".to_vec());
        source.set_position(7).unwrap();
        assert!(adapter.accepts_source(&mut source).unwrap());
        assert_eq!(source.position(), 7);

        let mut short = MemoryByteSource::new(b"RIFF".to_vec());
        assert!(!adapter.accepts_source(&mut short).unwrap());
    }

    #[test]
    fn test_element_trees_have_expected_widths() {
        let adapter = WaveAdapter::new();
        assert_eq!(adapter.riff.fixed_width(), Some(8));
        assert_eq!(adapter.format.fixed_width(), Some(20));
        assert_eq!(adapter.generic.fixed_width(), Some(4));
        // The coding history is sized by the chunk length.
        assert_eq!(adapter.bext.fixed_width(), None);
    }
}
