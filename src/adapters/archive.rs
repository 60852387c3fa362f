//! Plumbing shared by the web archive adapters: optionally gzip-compressed input, line and
//! block reads over a record stream, and sorted content counters.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use hashbrown::HashMap;

use crate::context::ParseContext;
use crate::err::{ParseError, Result};
use crate::value::Value;

pub(crate) const GZIP_HEADER: &str = "1F 8B";

/// Bytes of every record block kept for inspection unless configured otherwise.
pub(crate) const DEFAULT_PAYLOAD_LIMIT: usize = 64 * 1024;

/// Longest prefix of the first line read when sniffing.
const SNIFF_LINE_LIMIT: u64 = 64;

/// `file` as a buffered stream, decoding every gzip member in turn when `compressed`.
pub(crate) fn open_archive(file: &Path, compressed: bool) -> io::Result<Box<dyn BufRead>> {
    let file = BufReader::new(File::open(file)?);
    Ok(if compressed {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(file)
    })
}

/// Up to the first line of the (decoded) archive, terminator included.
pub(crate) fn first_line(file: &Path, compressed: bool) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    open_archive(file, compressed)?
        .take(SNIFF_LINE_LIMIT)
        .read_until(b'\n', &mut line)?;
    Ok(line)
}

/// A byte stream read as lines and length-delimited blocks, tracking the decoded offset.
pub(crate) struct BlockReader<R: BufRead> {
    reader: R,
    payload_limit: usize,
    offset: u64,
}

impl<R: BufRead> BlockReader<R> {
    pub(crate) fn new(reader: R, payload_limit: usize) -> Self {
        BlockReader {
            reader,
            payload_limit,
            offset: 0,
        }
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    /// One line without its terminator. Returns the raw bytes consumed, 0 at end of input.
    pub(crate) fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        buf.clear();
        let n = self.reader.read_until(b'\n', buf).map_err(external)?;
        self.offset += n as u64;
        while matches!(buf.last().copied(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(n)
    }

    /// Skip blank lines and read the next non-empty one. Returns its offset, `None` at end
    /// of input.
    pub(crate) fn next_line(&mut self, buf: &mut Vec<u8>) -> Result<Option<u64>> {
        loop {
            let start = self.offset;
            if self.read_line(buf)? == 0 {
                return Ok(None);
            }
            if !buf.is_empty() {
                return Ok(Some(start));
            }
        }
    }

    /// Consume a block of `length` bytes, keeping at most `payload_limit` of them.
    pub(crate) fn read_block(&mut self, what: &'static str, length: u64) -> Result<Vec<u8>> {
        let block_start = self.offset;
        let keep = length.min(self.payload_limit as u64);
        let mut payload = Vec::with_capacity(keep as usize);
        let kept = (&mut self.reader)
            .take(keep)
            .read_to_end(&mut payload)
            .map_err(external)? as u64;
        let skipped = if kept == keep {
            io::copy(&mut (&mut self.reader).take(length - keep), &mut io::sink())
                .map_err(external)?
        } else {
            0
        };
        self.offset += kept + skipped;

        if kept + skipped < length {
            return Err(ParseError::Truncated {
                what,
                offset: block_start,
                need: length,
                have: kept + skipped,
            });
        }
        Ok(payload)
    }
}

/// Reader and decoder failures surface as external errors.
pub(crate) fn external(e: io::Error) -> ParseError {
    ParseError::External {
        reason: e.to_string(),
    }
}

/// `payload` split into lines without their terminators. A trailing partial line is dropped
/// when the payload is shorter than the `length` of its block.
pub(crate) fn block_lines(payload: &[u8], length: u64) -> impl Iterator<Item = &[u8]> {
    let truncated = (payload.len() as u64) < length;
    let mut lines: Vec<&[u8]> = payload.split(|&b| b == b'\n').collect();
    if truncated || payload.last() == Some(&b'\n') {
        lines.pop();
    }
    lines
        .into_iter()
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

/// Occurrence counts keyed by name.
#[derive(Debug, Default)]
pub(crate) struct Counter(HashMap<String, u64>);

impl Counter {
    pub(crate) fn add(&mut self, name: &str) {
        *self.0.entry_ref(name.trim()).or_default() += 1;
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    /// Counts sorted by name, ignoring case. Names differing only in case stay apart.
    pub(crate) fn sorted(self) -> Vec<(String, u64)> {
        let mut counts: Vec<_> = self.0.into_iter().collect();
        counts.sort_by(|(a, _), (b, _)| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });
        counts
    }

    /// One `group` with `name` and `count` per entry, in sorted order.
    pub(crate) fn write(self, ctx: &mut ParseContext, group: &str) -> Result<()> {
        for (name, count) in self.sorted() {
            ctx.start(group);
            ctx.value("name", name);
            ctx.value("count", Value::int(count));
            ctx.end(group)?;
        }
        Ok(())
    }
}
