//! Internet Archive ARC files, compressed (one gzip member per record) or not.
//!
//! The first record describes the archive. From ARC 1.1 on, its content ends with an
//! `arcmetadata` XML document naming the crawler and the crawl.

mod records;

use std::path::Path;

use log::{debug, trace, warn};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::adapter::{Adapter, write_file_info};
use crate::adapters::archive::{
    Counter, DEFAULT_PAYLOAD_LIMIT, GZIP_HEADER, first_line, open_archive,
};
use crate::context::ParseContext;
use crate::err::Result;
use crate::sniff::HeaderPattern;

pub use self::records::{ArcRecord, ArcRecords, FILEDESC_SCHEME};

const ARC_NS: &[u8] = b"http://archive.org/arc/1.0/";
const DC_NS: &[u8] = b"http://purl.org/dc/elements/1.1/";
const DCTERMS_NS: &[u8] = b"http://purl.org/dc/terms/";

/// Children of `arc:arcmetadata` reported, as (namespace, local name, reported name).
const METADATA_FIELDS: [(&[u8], &[u8], &str); 8] = [
    (ARC_NS, b"software", "software"),
    (ARC_NS, b"hostname", "hostname"),
    (ARC_NS, b"ip", "ip"),
    (ARC_NS, b"operator", "operator"),
    (DC_NS, b"date", "created"),
    (ARC_NS, b"robots", "robots"),
    (DC_NS, b"format", "format"),
    (DCTERMS_NS, b"conformsTo", "conforms_to"),
];

pub struct ArcAdapter {
    gzip: HeaderPattern,
    payload_limit: usize,
}

impl Default for ArcAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything collected in one pass over the records.
#[derive(Debug, Default)]
struct Summary {
    metadata: Option<Vec<(&'static str, String)>>,
    mime_types: Counter,
    records: u64,
}

impl ArcAdapter {
    pub fn new() -> Self {
        ArcAdapter {
            gzip: HeaderPattern::parse(GZIP_HEADER).expect("GZIP_HEADER is a valid pattern"),
            payload_limit: DEFAULT_PAYLOAD_LIMIT,
        }
    }

    /// Bytes of every record kept for inspection. The archive description record must fit
    /// for its metadata to be read.
    pub fn with_payload_limit(mut self, payload_limit: usize) -> Self {
        self.payload_limit = payload_limit;
        self
    }

    fn is_compressed(&self, file: &Path) -> bool {
        self.gzip.check_file(file)
    }

    fn summarize(&self, records: impl Iterator<Item = Result<ArcRecord>>) -> Result<Summary> {
        let mut summary = Summary::default();

        for record in records {
            let record = record?;
            if summary.records == 0 && record.is_file_description() {
                summary.metadata = archive_metadata(&record);
            }
            summary.mime_types.add(&record.mime_type);
            summary.records += 1;
        }

        Ok(summary)
    }
}

/// Fields of the `arcmetadata` document in the archive description `record`, if it has one.
fn archive_metadata(record: &ArcRecord) -> Option<Vec<(&'static str, String)>> {
    let Some(xml_start) = record.payload.iter().position(|&b| b == b'<') else {
        debug!("archive description `{}` carries no XML metadata", record.url);
        return None;
    };
    let xml = String::from_utf8_lossy(&record.payload[xml_start..]);

    match metadata_fields(&xml) {
        Ok(fields) => Some(
            METADATA_FIELDS
                .iter()
                .zip(fields)
                .map(|((_, _, name), value)| (*name, value.unwrap_or_default()))
                .collect(),
        ),
        Err(e) => {
            warn!("archive metadata of `{}` is not readable: {}", record.url, e);
            None
        }
    }
}

fn in_namespace(resolved: &ResolveResult, namespace: &[u8]) -> bool {
    matches!(resolved, ResolveResult::Bound(Namespace(ns)) if *ns == namespace)
}

fn field_index(resolved: &ResolveResult, local_name: &[u8]) -> Option<usize> {
    METADATA_FIELDS
        .iter()
        .position(|(ns, name, _)| *name == local_name && in_namespace(resolved, ns))
}

/// Text of the first element of every `METADATA_FIELDS` entry found directly below an
/// `arc:arcmetadata` element.
fn metadata_fields(xml: &str) -> std::result::Result<Vec<Option<String>>, quick_xml::Error> {
    let mut reader = NsReader::from_str(xml);

    let mut found: Vec<Option<String>> = vec![None; METADATA_FIELDS.len()];
    // One entry per open element: whether it is `arc:arcmetadata`.
    let mut open: Vec<bool> = vec![];
    // Field being read, with the depth of its element.
    let mut capture: Option<(usize, usize, String)> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match event {
            Event::Start(e) => {
                let local_name = e.local_name();
                if capture.is_none() && open.last() == Some(&true) {
                    if let Some(field) = field_index(&resolved, local_name.as_ref()) {
                        if found[field].is_none() {
                            capture = Some((field, open.len(), String::new()));
                        }
                    }
                }
                open.push(
                    in_namespace(&resolved, ARC_NS) && local_name.as_ref() == b"arcmetadata",
                );
            }
            Event::Empty(e) => {
                if capture.is_none() && open.last() == Some(&true) {
                    if let Some(field) = field_index(&resolved, e.local_name().as_ref()) {
                        if found[field].is_none() {
                            found[field] = Some(String::new());
                        }
                    }
                }
            }
            Event::End(_) => {
                open.pop();
                if let Some((field, depth, text)) = capture.take() {
                    if open.len() == depth {
                        let text = text.trim();
                        trace!("arcmetadata field {} = `{}`", METADATA_FIELDS[field].2, text);
                        found[field] = Some(text.to_owned());
                    } else {
                        capture = Some((field, depth, text));
                    }
                }
            }
            Event::Text(t) => {
                if let Some((_, _, text)) = capture.as_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some((_, _, text)) = capture.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(found)
}

impl Adapter for ArcAdapter {
    fn name(&self) -> &'static str {
        "Internet Archive ARC File Adapter"
    }

    fn description(&self) -> &'static str {
        "Adapts Internet archive ARC files (both compressed and uncompressed)"
    }

    fn version(&self) -> &'static str {
        "1.0"
    }

    fn input_media_type(&self) -> &'static str {
        "x-application/arc"
    }

    fn output_schema_id(&self) -> &'static str {
        "arc.dtd"
    }

    fn accepts(&self, file: &Path) -> bool {
        match first_line(file, self.is_compressed(file)) {
            Ok(line) => line.starts_with(FILEDESC_SCHEME.as_bytes()),
            Err(e) => {
                debug!("{} is not readable as ARC: {}", file.display(), e);
                false
            }
        }
    }

    fn parse(&self, file: &Path, ctx: &mut ParseContext) -> Result<()> {
        let compressed = self.is_compressed(file);
        let records = ArcRecords::new(open_archive(file, compressed)?, self.payload_limit);
        let summary = self.summarize(records)?;
        debug!(
            "{}: {} records, {} content types",
            file.display(),
            summary.records,
            summary.mime_types.len()
        );

        ctx.start("ARC");
        write_file_info(file, ctx)?;

        if let Some(fields) = summary.metadata {
            ctx.start("arcmetadata");
            for (name, value) in fields {
                ctx.value(name, value);
            }
            ctx.end("arcmetadata")?;
        }

        ctx.start("summary");
        ctx.value("compressed", compressed);
        summary.mime_types.write(ctx, "mime_type")?;
        ctx.end("summary")?;

        ctx.end("ARC")
    }
}
