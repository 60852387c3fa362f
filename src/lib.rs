pub use adapter::{Adapter, write_file_info};
pub use byte_source::{ByteSource, FileByteSource, MemoryByteSource};
pub use context::{EventStream, ParseContext, ParseEvent};
pub use element::{Element, IntWidth, PrefixWidth, ReadOutput};
pub use extractor::{Extractor, ExtractorSettings, FileReport, Outcome, OutputFormat};
pub use json_output::{JsonOutput, render_json};
pub use registry::{AdapterRegistry, Dispatch};
pub use sniff::HeaderPattern;
pub use value::{NumberBase, Value};
pub use xml_output::{EventOutput, XmlOutput, render_xml, write_events};

pub mod adapter;
pub mod adapters;
pub mod byte_source;
pub mod context;
pub mod element;
pub mod err;
pub mod extractor;
pub mod json_output;
pub mod registry;
pub mod sniff;
pub mod value;
pub mod xml_output;

mod utils;

// For tests, we only initialize logging once.
#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
