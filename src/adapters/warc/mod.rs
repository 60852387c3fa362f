//! Web ARChive (WARC, ISO 28500) files.
//!
//! Only gzip-compressed archives (`.warc.gz`, one gzip member per record) are handled.
//! Uncompressed archives are not accepted.

mod records;

use std::io::BufRead;
use std::path::Path;

use log::{debug, trace};

use crate::adapter::{Adapter, write_file_info};
use crate::adapters::archive::{
    Counter, DEFAULT_PAYLOAD_LIMIT, GZIP_HEADER, first_line, open_archive,
};
use crate::context::ParseContext;
use crate::err::Result;
use crate::sniff::HeaderPattern;
use crate::value::Value;

pub use self::records::{WarcRecord, WarcRecords};

/// Payload lines searched for an HTTP `Content-Type`.
const MAX_CONTENT_TYPE_LINES: usize = 100;

const NOT_RECORDED: &str = "not recorded";

/// `warcinfo` fields reported, as (field in the record, reported name).
const WARCINFO_FIELDS: [(&str, &str); 8] = [
    ("software", "software"),
    ("hostname", "hostname"),
    ("ip", "ip"),
    ("operator", "operator"),
    ("created", "created"),
    ("robots", "robots"),
    ("format", "format"),
    ("conformsTo", "conforms_to"),
];

pub struct WarcAdapter {
    gzip: HeaderPattern,
    types_of_interest: Vec<String>,
    payload_limit: usize,
    record_details: bool,
}

impl Default for WarcAdapter {
    fn default() -> Self {
        Self::new(["response", "resource", "continuation", "revisit"])
    }
}

/// Everything collected in one pass over the records.
#[derive(Debug, Default)]
struct Summary {
    warcinfo: Option<Vec<(&'static str, String)>>,
    record_types: Counter,
    mime_types: Counter,
    records: Vec<RecordDetail>,
}

#[derive(Debug)]
struct RecordDetail {
    record_type: String,
    target_uri: Option<String>,
    date: Option<String>,
    content_type: String,
    content_length: u64,
}

impl WarcAdapter {
    /// `types_of_interest` (compared case-insensitively) select the records described one by
    /// one when record details are enabled. The summary always covers every record.
    pub fn new<I, S>(types_of_interest: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WarcAdapter {
            gzip: HeaderPattern::parse(GZIP_HEADER).expect("GZIP_HEADER is a valid pattern"),
            types_of_interest: types_of_interest.into_iter().map(Into::into).collect(),
            payload_limit: DEFAULT_PAYLOAD_LIMIT,
            record_details: false,
        }
    }

    /// Also emit one `record` group per record of interest.
    pub fn with_record_details(mut self, record_details: bool) -> Self {
        self.record_details = record_details;
        self
    }

    /// Bytes of every record block kept for inspection.
    pub fn with_payload_limit(mut self, payload_limit: usize) -> Self {
        self.payload_limit = payload_limit;
        self
    }

    fn is_of_interest(&self, record_type: &str) -> bool {
        self.types_of_interest
            .iter()
            .any(|t| t.eq_ignore_ascii_case(record_type))
    }

    fn summarize<R: BufRead>(&self, records: WarcRecords<R>) -> Result<Summary> {
        let mut summary = Summary::default();

        for record in records {
            let record = record?;
            let record_type = record.warc_type().unwrap_or_default().trim().to_owned();
            trace!("record `{}`, {} bytes", record_type, record.content_length);

            if record_type == "warcinfo" && summary.warcinfo.is_none() {
                summary.warcinfo = Some(warcinfo_fields(&record));
            }

            let content_type = content_type(&record);
            summary.mime_types.add(&content_type);

            if self.record_details && self.is_of_interest(&record_type) {
                summary.records.push(RecordDetail {
                    record_type: record_type.clone(),
                    target_uri: record.header("WARC-Target-URI").map(str::to_owned),
                    date: record.header("WARC-Date").map(str::to_owned),
                    content_type,
                    content_length: record.content_length,
                });
            }
            if !record_type.is_empty() {
                summary.record_types.add(&record_type);
            }
        }

        Ok(summary)
    }
}

/// The first occurrence of every known `name: value` line of a `warcinfo` block.
fn warcinfo_fields(record: &WarcRecord) -> Vec<(&'static str, String)> {
    let mut found: Vec<Option<String>> = vec![None; WARCINFO_FIELDS.len()];
    for line in record.payload_lines() {
        let line = String::from_utf8_lossy(line);
        for (slot, (field, _)) in found.iter_mut().zip(WARCINFO_FIELDS) {
            if slot.is_none() {
                if let Some(value) = line
                    .strip_prefix(field)
                    .and_then(|rest| rest.strip_prefix(": "))
                {
                    *slot = Some(value.to_owned());
                }
            }
        }
    }

    WARCINFO_FIELDS
        .iter()
        .zip(found)
        .filter_map(|((_, name), value)| value.map(|v| (*name, v)))
        .collect()
}

/// HTTP `Content-Type` of the captured payload.
fn content_type(record: &WarcRecord) -> String {
    record
        .payload_lines()
        .take(MAX_CONTENT_TYPE_LINES)
        .find_map(|line| {
            line.strip_prefix(b"Content-Type: ")
                .map(|v| String::from_utf8_lossy(v).trim().to_owned())
        })
        .unwrap_or_else(|| NOT_RECORDED.to_owned())
}

impl Adapter for WarcAdapter {
    fn name(&self) -> &'static str {
        "Internet Archive WARC File Adapter"
    }

    fn description(&self) -> &'static str {
        "Adapts gzip compressed Internet Archive WARC files"
    }

    fn version(&self) -> &'static str {
        "1.0"
    }

    fn input_media_type(&self) -> &'static str {
        "application/warc"
    }

    fn output_schema_id(&self) -> &'static str {
        "warc.dtd"
    }

    fn accepts(&self, file: &Path) -> bool {
        if !self.gzip.check_file(file) {
            return false;
        }

        match first_line(file, true) {
            Ok(line) => line.starts_with(b"WARC/"),
            Err(e) => {
                debug!("{} is gzip but not readable as WARC: {}", file.display(), e);
                false
            }
        }
    }

    fn parse(&self, file: &Path, ctx: &mut ParseContext) -> Result<()> {
        let records = WarcRecords::new(open_archive(file, true)?, self.payload_limit);
        let summary = self.summarize(records)?;
        debug!(
            "{}: {} record types, {} content types",
            file.display(),
            summary.record_types.len(),
            summary.mime_types.len()
        );

        ctx.start("WARC");
        write_file_info(file, ctx)?;

        if let Some(fields) = summary.warcinfo {
            ctx.start("warcinfo");
            for (name, value) in fields {
                ctx.value(name, value);
            }
            ctx.end("warcinfo")?;
        }

        ctx.start("summary");
        ctx.value("compressed", true);
        summary.record_types.write(ctx, "record_type")?;
        summary.mime_types.write(ctx, "mime_type")?;
        ctx.end("summary")?;

        for record in summary.records {
            ctx.start("record");
            ctx.value("type", record.record_type);
            if let Some(uri) = record.target_uri {
                ctx.value("target_uri", uri);
            }
            if let Some(date) = record.date {
                ctx.value("date", date);
            }
            ctx.value("content_type", record.content_type);
            ctx.value("content_length", Value::int(record.content_length));
            ctx.end("record")?;
        }

        ctx.end("WARC")
    }
}
