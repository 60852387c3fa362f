
use fixtures::*;

use metaextract::err::ErrorKind;
use metaextract::{
    AdapterRegistry, Dispatch, Extractor, ExtractorSettings, Outcome, OutputFormat, ParseContext,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_default_adapters_identify_their_formats() {
    ensure_env_logger_initialized();
    let dir = tempdir().unwrap();
    let registry = AdapterRegistry::with_default_adapters();

    let wav = write_sample(&dir, "a.wav", &minimal_wav());
    let word = write_sample(&dir, "a.doc", &word2_document(0x80, 0x100, 0x100));
    let mut other_fib = word2_document(0x80, 0x100, 0x100);
    other_fib[2] = 0x2C;
    let other_word = write_sample(&dir, "b.doc", &other_fib);
    let warc = write_sample(&dir, "a.warc.gz", &gzip_members(&sample_warc_records()));
    let arc = write_sample(&dir, "a.arc", &sample_arc_records().concat());
    let text = write_sample(&dir, "a.txt", b"just some text, nothing to see here");

    let name = |path: &PathBuf| registry.identify(path).map(|a| a.name());
    assert_eq!(name(&wav), Some("Microsoft WAV Audio Adapter"));
    assert_eq!(name(&word), Some("Microsoft Word 1.x/2.x Adapter"));
    assert_eq!(name(&other_word), Some("Microsoft Word 1.x/2.x Adapter"));
    assert_eq!(name(&warc), Some("Internet Archive WARC File Adapter"));
    assert_eq!(name(&arc), Some("Internet Archive ARC File Adapter"));
    assert_eq!(name(&text), None);
}

#[test]
fn test_non_riff_file_is_unrecognized() {
    let dir = tempdir().unwrap();
    let mut data = minimal_wav();
    data[..4].copy_from_slice(b"FORM");
    let path = write_sample(&dir, "odd.wav", &data);

    let registry = AdapterRegistry::with_default_adapters();
    let mut ctx = ParseContext::new();
    assert_eq!(registry.dispatch(&path, &mut ctx).unwrap(), Dispatch::Unrecognized);
    assert_eq!(ctx.get_str("unrecognized.file.name").unwrap(), "odd.wav");
}

#[test]
fn test_failed_parse_names_adapter_and_kind() {
    let dir = tempdir().unwrap();
    let mut data = minimal_wav();
    data.truncate(30);
    let path = write_sample(&dir, "short.wav", &data);

    let registry = AdapterRegistry::with_default_adapters();
    let mut ctx = ParseContext::new();
    let err = registry.dispatch(&path, &mut ctx).unwrap_err();
    assert_eq!(err.adapter(), Some("Microsoft WAV Audio Adapter"));
    assert_eq!(err.kind(), ErrorKind::Truncated);
    assert!(err.to_string().contains("short.wav"));
}

#[test]
fn test_process_files_keeps_input_order() {
    ensure_env_logger_initialized();
    let dir = tempdir().unwrap();

    let mut short = minimal_wav();
    short.truncate(30);
    let paths = vec![
        write_sample(&dir, "1.wav", &minimal_wav()),
        write_sample(&dir, "2.txt", b"plain"),
        write_sample(&dir, "3.wav", &short),
        write_sample(&dir, "4.doc", &word2_document(0x80, 0x90, 0x90)),
    ];

    for threads in [1, 4] {
        let extractor = Extractor::new(
            AdapterRegistry::with_default_adapters(),
            ExtractorSettings::new().num_threads(threads),
        );
        let reports = extractor.process_files(&paths);

        assert_eq!(
            reports.iter().map(|r| r.path.clone()).collect::<Vec<_>>(),
            paths
        );
        assert_eq!(reports[0].outcome, Outcome::Parsed);
        assert_eq!(reports[1].outcome, Outcome::Unrecognized);
        assert!(matches!(
            reports[2].outcome,
            Outcome::Failed {
                kind: ErrorKind::Truncated,
                ..
            }
        ));
        assert_eq!(reports[2].adapter, Some("Microsoft WAV Audio Adapter"));
        assert_eq!(reports[3].adapter, Some("Microsoft Word 1.x/2.x Adapter"));
    }
}

#[test]
fn test_render_word_document_as_json() {
    let dir = tempdir().unwrap();
    let path = write_sample(&dir, "letter.doc", &word2_document(0x80, 0x100, 0x100));

    let extractor = Extractor::new(
        AdapterRegistry::with_default_adapters(),
        ExtractorSettings::new()
            .output_format(OutputFormat::Json)
            .indent(false),
    );
    let report = extractor.process_file(&path);
    let json: serde_json::Value = serde_json::from_str(&extractor.render(&report).unwrap()).unwrap();

    assert_eq!(json["Word"]["version"], "2.0");
    assert_eq!(json["Word"]["header"]["magic_number"], "0xA5DB");
    assert_eq!(json["Word"]["properties"]["has_pictures"], true);
    assert_eq!(json["Word"]["text_length"], 128);
    assert_eq!(json["Word"]["file"]["name"], "letter.doc");
}

#[test]
fn test_render_wav_as_xml() {
    let dir = tempdir().unwrap();
    let path = write_sample(&dir, "tone.wav", &minimal_wav());

    let extractor = Extractor::new(
        AdapterRegistry::with_default_adapters(),
        ExtractorSettings::new().indent(false),
    );
    let xml = extractor.render(&extractor.process_file(&path)).unwrap();

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><WAV><file><name>tone.wav</name>"));
    assert!(xml.contains("<fmt><length>16</length><format>1</format><channels>1</channels>"));
    assert!(xml.ends_with("</fmt></WAV>"));
}
