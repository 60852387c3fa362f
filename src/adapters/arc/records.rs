//! A minimal ARC record reader.
//!
//! Every record is one header line of space separated fields, starting with
//! `URL IP-address Archive-date Content-type` and ending with `Archive-length`, followed by
//! `Archive-length` bytes of content and a newline. Version 2 headers carry extra fields in
//! between; only the first four and the last one are read.

use std::io::BufRead;

use log::trace;

use crate::adapters::archive::BlockReader;
use crate::err::{ParseError, Result};

/// Prefix of the URL of the file description record every archive starts with.
pub const FILEDESC_SCHEME: &str = "filedesc://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcRecord {
    pub url: String,
    pub ip: String,
    pub date: String,
    pub mime_type: String,
    pub length: u64,
    /// Start of the record content, at most `payload_limit` bytes.
    pub payload: Vec<u8>,
}

impl ArcRecord {
    pub fn is_file_description(&self) -> bool {
        self.url.starts_with(FILEDESC_SCHEME)
    }
}

pub struct ArcRecords<R: BufRead> {
    reader: BlockReader<R>,
    done: bool,
}

impl<R: BufRead> ArcRecords<R> {
    pub fn new(reader: R, payload_limit: usize) -> Self {
        ArcRecords {
            reader: BlockReader::new(reader, payload_limit),
            done: false,
        }
    }

    fn next_record(&mut self) -> Result<Option<ArcRecord>> {
        let mut line = Vec::new();
        let Some(record_start) = self.reader.next_line(&mut line)? else {
            return Ok(None);
        };

        let text = String::from_utf8_lossy(&line);
        let fields: Vec<&str> = text.split_ascii_whitespace().collect();
        let (url, ip, date, mime_type, length) = match fields.as_slice() {
            [url, ip, date, mime_type, .., length] => (*url, *ip, *date, *mime_type, *length),
            _ => {
                return Err(ParseError::malformed(
                    "ARC record header",
                    record_start,
                    format!("expected at least 5 fields, found `{}`", text),
                ));
            }
        };
        let length = length.parse::<u64>().map_err(|_| {
            ParseError::malformed(
                "ARC record header",
                record_start,
                format!("archive length `{}` is not a number", length),
            )
        })?;

        let payload = self.reader.read_block("ARC record content", length)?;
        trace!("ARC record at {}: `{}`, {} bytes", record_start, url, length);

        Ok(Some(ArcRecord {
            url: url.to_owned(),
            ip: ip.to_owned(),
            date: date.to_owned(),
            mime_type: mime_type.to_owned(),
            length,
            payload,
        }))
    }
}

impl<R: BufRead> Iterator for ArcRecords<R> {
    type Item = Result<ArcRecord>;

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::ErrorKind;
    use pretty_assertions::assert_eq;

    const TWO_RECORDS: &[u8] = b"filedesc://a.arc 0.0.0.0 20080430204825 text/plain 12\n\
1 0 Archive\n\
\n\
http://example.com/ 10.0.0.1 20080430204826 text/html 200 - - 0 a.arc 5\n\
hello\n";

    #[test]
    fn test_reads_v1_and_v2_headers() {
        let records = ArcRecords::new(TWO_RECORDS, 1024)
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert!(records[0].is_file_description());
        assert_eq!(records[0].mime_type, "text/plain");
        assert_eq!(records[0].payload, b"1 0 Archive\n");

        assert!(!records[1].is_file_description());
        assert_eq!(records[1].url, "http://example.com/");
        assert_eq!(records[1].ip, "10.0.0.1");
        assert_eq!(records[1].date, "20080430204826");
        assert_eq!(records[1].mime_type, "text/html");
        assert_eq!(records[1].length, 5);
        assert_eq!(records[1].payload, b"hello");
    }

    #[test]
    fn test_short_header_is_malformed() {
        let mut records = ArcRecords::new(&b"http://example.com/ 10.0.0.1 5\nhello\n"[..], 1024);
        assert_eq!(
            records.next().unwrap().unwrap_err().kind(),
            ErrorKind::Malformed
        );
        assert!(records.next().is_none());
    }

    #[test]
    fn test_length_past_end_is_truncated() {
        let data = b"http://example.com/ 10.0.0.1 20080430204826 text/html 50\nshort";
        let mut records = ArcRecords::new(&data[..], 1024);
        let err = records.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }
}
