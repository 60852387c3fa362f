
use fixtures::*;

use metaextract::adapters::WarcAdapter;
use metaextract::err::ErrorKind;
use metaextract::{Adapter, AdapterRegistry, Dispatch, ParseContext};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn counts(stream: &metaextract::EventStream, group: &str) -> Vec<(String, i64)> {
    let mut out = vec![];
    let mut name = None;
    for (path, value) in stream.leaves() {
        if path.ends_with(&format!("{}.name", group)) {
            name = value.as_str().map(str::to_owned);
        } else if path.ends_with(&format!("{}.count", group)) {
            let count = value.as_integer().unwrap() as i64;
            out.push((name.take().unwrap(), count));
        }
    }
    out
}

#[test]
fn test_compressed_warc_summary() {
    ensure_env_logger_initialized();
    let dir = tempdir().unwrap();
    let path = write_sample(&dir, "crawl.warc.gz", &gzip_members(&sample_warc_records()));

    let adapter = WarcAdapter::default();
    assert!(adapter.accepts(&path));

    let mut ctx = ParseContext::new();
    adapter.parse(&path, &mut ctx).unwrap();

    assert_eq!(ctx.get_str("WARC.warcinfo.software").unwrap(), "Heritrix/3.4");
    assert_eq!(ctx.get_str("WARC.warcinfo.hostname").unwrap(), "crawler01");
    assert_eq!(ctx.get_str("WARC.warcinfo.operator").unwrap(), "Archivist");
    assert!(ctx.get_str("WARC.warcinfo.conforms_to").unwrap().starts_with("http://"));
    // Not present in the warcinfo block.
    assert!(ctx.get("WARC.warcinfo.robots").is_err());

    let stream = ctx.drain().unwrap();
    assert_eq!(stream.child_groups("WARC"), vec!["file", "warcinfo", "summary"]);
    assert_eq!(
        counts(&stream, "record_type"),
        vec![
            ("request".to_owned(), 1),
            ("response".to_owned(), 3),
            ("warcinfo".to_owned(), 1),
        ]
    );
    // Every record is counted; warcinfo and request blocks carry no HTTP Content-Type.
    assert_eq!(
        counts(&stream, "mime_type"),
        vec![
            ("image/png".to_owned(), 1),
            ("not recorded".to_owned(), 2),
            ("text/html".to_owned(), 2),
        ]
    );
    assert!(!stream.child_groups("WARC").contains(&"record"));
}

fn record_types(stream: &metaextract::EventStream) -> Vec<String> {
    stream
        .leaves()
        .filter(|(path, _)| *path == "WARC.record.type")
        .filter_map(|(_, value)| value.as_str().map(str::to_owned))
        .collect()
}

#[test]
fn test_types_of_interest_select_detailed_records() {
    let dir = tempdir().unwrap();
    let path = write_sample(&dir, "crawl.warc.gz", &gzip_members(&sample_warc_records()));

    let adapter = WarcAdapter::new(["REQUEST"]).with_record_details(true);
    let mut ctx = ParseContext::new();
    adapter.parse(&path, &mut ctx).unwrap();
    assert_eq!(ctx.get_str("WARC.record.target_uri").unwrap(), "http://example.com/");
    assert_eq!(ctx.get_str("WARC.record.content_type").unwrap(), "not recorded");

    let stream = ctx.drain().unwrap();
    assert_eq!(record_types(&stream), vec!["request"]);
    // The summary still covers every record.
    assert_eq!(
        counts(&stream, "record_type"),
        vec![
            ("request".to_owned(), 1),
            ("response".to_owned(), 3),
            ("warcinfo".to_owned(), 1),
        ]
    );
    assert_eq!(counts(&stream, "mime_type").len(), 3);
}

#[test]
fn test_record_details() {
    let dir = tempdir().unwrap();
    let path = write_sample(&dir, "crawl.warc.gz", &gzip_members(&sample_warc_records()));

    let adapter = WarcAdapter::default().with_record_details(true);
    let mut ctx = ParseContext::new();
    adapter.parse(&path, &mut ctx).unwrap();
    assert_eq!(ctx.get_str("WARC.record.target_uri").unwrap(), "http://example.com/logo.png");
    assert_eq!(ctx.get_str("WARC.record.content_type").unwrap(), "image/png");

    let stream = ctx.drain().unwrap();
    assert_eq!(record_types(&stream), vec!["response", "response", "response"]);
}

#[test]
fn test_corrupt_member_fails_as_external() {
    let dir = tempdir().unwrap();
    let mut data = gzip_members(&sample_warc_records());
    let cut = data.len() - 20;
    data.truncate(cut);
    let path = write_sample(&dir, "cut.warc.gz", &data);

    let adapter = WarcAdapter::default();
    assert!(adapter.accepts(&path));

    let registry = {
        let mut registry = AdapterRegistry::new();
        registry.register(adapter);
        registry
    };
    let mut ctx = ParseContext::new();
    let err = registry.dispatch(&path, &mut ctx).unwrap_err();
    assert_eq!(err.adapter(), Some("Internet Archive WARC File Adapter"));
    assert!(matches!(err.kind(), ErrorKind::External | ErrorKind::Truncated));
}

/// Uncompressed archives are a known limitation: they are not accepted, so the registry
/// reports them as unrecognized instead of producing a WARC summary.
#[test]
fn test_uncompressed_warc_is_not_supported() {
    let dir = tempdir().unwrap();
    let raw: Vec<u8> = sample_warc_records().concat();
    let path = write_sample(&dir, "crawl.warc", &raw);

    assert!(!WarcAdapter::default().accepts(&path));

    let registry = AdapterRegistry::with_default_adapters();
    let mut ctx = ParseContext::new();
    assert_eq!(registry.dispatch(&path, &mut ctx).unwrap(), Dispatch::Unrecognized);
}

#[test]
fn test_other_gzip_content_is_not_accepted() {
    let dir = tempdir().unwrap();
    let path = write_sample(
        &dir,
        "notes.txt.gz",
        &gzip_members(&[b"hello, this is not an archive\n".to_vec()]),
    );
    assert!(!WarcAdapter::default().accepts(&path));
}
