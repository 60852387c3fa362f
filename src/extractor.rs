use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;

use crate::context::{EventStream, ParseContext};
use crate::err::{ErrorKind, ExtractError, SerializationResult};
use crate::json_output::render_json;
use crate::registry::{AdapterRegistry, Dispatch};
use crate::xml_output::render_xml;

#[cfg(feature = "multithreading")]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Xml,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorSettings {
    num_threads: usize,
    indent: bool,
    output_format: OutputFormat,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        ExtractorSettings {
            num_threads: 0,
            indent: true,
            output_format: OutputFormat::default(),
        }
    }
}

impl ExtractorSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads.
    /// `0` will let rayon decide, `1` processes files in order on the calling thread.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = if cfg!(feature = "multithreading") {
            num_threads
        } else {
            1
        };
        self
    }

    /// Sets whether rendered output is pretty-printed.
    pub fn indent(mut self, pretty: bool) -> Self {
        self.indent = pretty;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn get_num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn should_indent(&self) -> bool {
        self.indent
    }

    pub fn get_output_format(&self) -> OutputFormat {
        self.output_format
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome")]
pub enum Outcome {
    Parsed,
    Unrecognized,
    Failed { kind: ErrorKind, message: String },
}

/// What happened to a single input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter: Option<&'static str>,
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Empty when the file failed.
    #[serde(skip)]
    pub events: EventStream,
}

impl FileReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

/// Runs the registry over files, each with its own parse context.
pub struct Extractor {
    registry: AdapterRegistry,
    settings: ExtractorSettings,
}

impl Extractor {
    pub fn new(registry: AdapterRegistry, settings: ExtractorSettings) -> Self {
        Extractor { registry, settings }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ExtractorSettings {
        &self.settings
    }

    pub fn process_file(&self, path: &Path) -> FileReport {
        let mut ctx = ParseContext::new();

        let dispatched = self
            .registry
            .dispatch(path, &mut ctx)
            .and_then(|dispatch| {
                ctx.drain()
                    .map(|events| (dispatch, events))
                    .map_err(|source| ExtractError::Incomplete {
                        path: path.to_path_buf(),
                        source,
                    })
            });

        match dispatched {
            Ok((Dispatch::Parsed { adapter }, events)) => FileReport {
                path: path.to_path_buf(),
                adapter: Some(adapter),
                outcome: Outcome::Parsed,
                events,
            },
            Ok((Dispatch::Unrecognized, events)) => FileReport {
                path: path.to_path_buf(),
                adapter: None,
                outcome: Outcome::Unrecognized,
                events,
            },
            Err(e) => {
                warn!("{}", e);
                FileReport {
                    path: path.to_path_buf(),
                    adapter: e.adapter(),
                    outcome: Outcome::Failed {
                        kind: e.kind(),
                        message: source_message(&e),
                    },
                    events: EventStream::default(),
                }
            }
        }
    }

    /// Process every file independently. Reports come back in input order.
    pub fn process_files(&self, paths: &[PathBuf]) -> Vec<FileReport> {
        debug!(
            "processing {} files with {} threads",
            paths.len(),
            self.settings.num_threads
        );

        #[cfg(feature = "multithreading")]
        {
            if self.settings.num_threads != 1 {
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(self.settings.num_threads)
                    .build()
                {
                    Ok(pool) => {
                        return pool.install(|| {
                            paths.par_iter().map(|p| self.process_file(p)).collect()
                        });
                    }
                    Err(e) => warn!("failed to build thread pool, processing in order: {}", e),
                }
            }
        }

        paths.iter().map(|p| self.process_file(p)).collect()
    }

    /// Render a report's events in the configured format.
    ///
    /// A failed report has no events. In JSON it renders as a `failure` entry naming the path,
    /// adapter and cause; in XML it renders as the declaration alone.
    pub fn render(&self, report: &FileReport) -> SerializationResult<String> {
        match self.settings.output_format {
            OutputFormat::Xml => render_xml(&report.events, self.settings.indent),
            OutputFormat::Json if report.is_failure() => {
                render_failure_json(report, self.settings.indent)
            }
            OutputFormat::Json => render_json(&report.events, self.settings.indent),
        }
    }
}

fn render_failure_json(report: &FileReport, indent: bool) -> SerializationResult<String> {
    let mut entry = serde_json::Map::new();
    entry.insert("failure".to_owned(), serde_json::to_value(report)?);
    let entry = serde_json::Value::Object(entry);

    Ok(if indent {
        serde_json::to_string_pretty(&entry)?
    } else {
        serde_json::to_string(&entry)?
    })
}

/// The innermost cause of an extraction error, without the path prefix.
fn source_message(e: &ExtractError) -> String {
    match e {
        ExtractError::AdapterFailed { source, .. }
        | ExtractError::Incomplete { source, .. } => source.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_builder() {
        let settings = ExtractorSettings::new()
            .indent(false)
            .output_format(OutputFormat::Json);
        assert!(!settings.should_indent());
        assert_eq!(settings.get_output_format(), OutputFormat::Json);
        assert_eq!(settings.get_num_threads(), 0);
    }

    #[test]
    fn test_missing_file_is_unrecognized_then_fails_file_info() {
        let extractor = Extractor::new(AdapterRegistry::new(), ExtractorSettings::new());
        let report = extractor.process_file(Path::new("/no/such/input.bin"));
        assert!(report.is_failure());
        assert_eq!(report.adapter, None);
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_failed_report_renders_as_json_failure_entry() {
        let report = FileReport {
            path: PathBuf::from("short.wav"),
            adapter: Some("Microsoft WAV Audio Adapter"),
            outcome: Outcome::Failed {
                kind: ErrorKind::Truncated,
                message: "offset 20: truncated chunk body (need 16 bytes, have 10)".to_owned(),
            },
            events: EventStream::default(),
        };
        let extractor = Extractor::new(
            AdapterRegistry::new(),
            ExtractorSettings::new()
                .output_format(OutputFormat::Json)
                .indent(false),
        );

        let json: serde_json::Value =
            serde_json::from_str(&extractor.render(&report).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "failure": {
                    "path": "short.wav",
                    "adapter": "Microsoft WAV Audio Adapter",
                    "outcome": "Failed",
                    "kind": "Truncated",
                    "message": "offset 20: truncated chunk body (need 16 bytes, have 10)"
                }
            })
        );
    }

    #[test]
    fn test_unattributed_failure_omits_adapter() {
        let report = FileReport {
            path: PathBuf::from("gone.bin"),
            adapter: None,
            outcome: Outcome::Failed {
                kind: ErrorKind::Io,
                message: "an I/O error has occurred".to_owned(),
            },
            events: EventStream::default(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "Failed");
        assert!(json.get("adapter").is_none());
        assert!(json.get("events").is_none());
    }
}
