//! A minimal WARC record reader.
//!
//! Each record is a version line (`WARC/1.0`), `Name: value` header lines, an empty line, a
//! block of `Content-Length` bytes and two CRLFs. Only the first `payload_limit` bytes of every
//! block are kept; the rest is skipped.

use std::io::BufRead;

use log::trace;

use crate::adapters::archive::{BlockReader, block_lines};
use crate::err::{ParseError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarcRecord {
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub content_length: u64,
    /// Start of the record block, at most `payload_limit` bytes.
    pub payload: Vec<u8>,
}

impl WarcRecord {
    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn warc_type(&self) -> Option<&str> {
        self.header("WARC-Type")
    }

    /// Payload split into lines without their terminators. A trailing partial line is dropped
    /// when the payload was cut short.
    pub fn payload_lines(&self) -> impl Iterator<Item = &[u8]> {
        block_lines(&self.payload, self.content_length)
    }
}

pub struct WarcRecords<R: BufRead> {
    reader: BlockReader<R>,
    done: bool,
}

impl<R: BufRead> WarcRecords<R> {
    pub fn new(reader: R, payload_limit: usize) -> Self {
        WarcRecords {
            reader: BlockReader::new(reader, payload_limit),
            done: false,
        }
    }

    fn next_record(&mut self) -> Result<Option<WarcRecord>> {
        let mut line = Vec::new();

        // Records are separated by blank lines; tolerate any number of them.
        let Some(record_start) = self.reader.next_line(&mut line)? else {
            return Ok(None);
        };

        if !line.starts_with(b"WARC/") {
            return Err(ParseError::malformed(
                "WARC record",
                record_start,
                format!(
                    "expected a version line, found `{}`",
                    String::from_utf8_lossy(&line)
                ),
            ));
        }
        let version = String::from_utf8_lossy(&line).into_owned();

        let mut headers = vec![];
        loop {
            let header_start = self.reader.offset();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(ParseError::Truncated {
                    what: "WARC record header",
                    offset: header_start,
                    need: 1,
                    have: 0,
                });
            }
            if line.is_empty() {
                break;
            }
            let text = String::from_utf8_lossy(&line);
            let Some((name, value)) = text.split_once(':') else {
                return Err(ParseError::malformed(
                    "WARC header line",
                    header_start,
                    format!("no `:` in `{}`", text),
                ));
            };
            headers.push((name.trim().to_owned(), value.trim().to_owned()));
        }

        let content_length = headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("Content-Length"))
            .ok_or_else(|| {
                ParseError::malformed("WARC record", record_start, "no Content-Length header")
            })
            .and_then(|(_, v)| {
                v.parse::<u64>().map_err(|_| {
                    ParseError::malformed(
                        "WARC record",
                        record_start,
                        format!("Content-Length `{}` is not a number", v),
                    )
                })
            })?;

        let payload = self.reader.read_block("WARC record block", content_length)?;

        trace!(
            "WARC record at {}: {} headers, {} byte block",
            record_start,
            headers.len(),
            content_length
        );

        Ok(Some(WarcRecord {
            version,
            headers,
            content_length,
            payload,
        }))
    }
}

impl<R: BufRead> Iterator for WarcRecords<R> {
    type Item = Result<WarcRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
