use std::borrow::Cow;
use std::io::Write;

use log::trace;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::context::{EventStream, ParseEvent};
use crate::err::{SerializationError, SerializationResult};
use crate::value::Value;

/// A consumer of a drained event stream.
pub trait EventOutput {
    fn visit_start_of_stream(&mut self) -> SerializationResult<()>;
    fn visit_start_group(&mut self, name: &str) -> SerializationResult<()>;
    fn visit_leaf(&mut self, name: &str, value: &Value) -> SerializationResult<()>;
    fn visit_end_group(&mut self, name: &str) -> SerializationResult<()>;
    fn visit_end_of_stream(&mut self) -> SerializationResult<()>;
}

/// Feed every event of `stream` to `output`, in order.
pub fn write_events(stream: &EventStream, output: &mut impl EventOutput) -> SerializationResult<()> {
    output.visit_start_of_stream()?;
    for event in stream {
        match event {
            ParseEvent::StartGroup(name) => output.visit_start_group(name)?,
            ParseEvent::Leaf { value, .. } => output.visit_leaf(event.name(), value)?,
            ParseEvent::EndGroup(name) => output.visit_end_group(name)?,
        }
    }
    output.visit_end_of_stream()
}

/// Renders groups as elements and leaves as text-only elements.
pub struct XmlOutput<W: Write> {
    writer: Writer<W>,
    open: Vec<String>,
}

impl<W: Write> XmlOutput<W> {
    pub fn with_writer(target: W, indent: bool) -> Self {
        let writer = if indent {
            Writer::new_with_indent(target, b' ', 2)
        } else {
            Writer::new(target)
        };

        XmlOutput {
            writer,
            open: vec![],
        }
    }

    pub fn into_writer(self) -> SerializationResult<W> {
        match self.open.last() {
            None => Ok(self.writer.into_inner()),
            Some(open) => Err(SerializationError::StructureError {
                group: String::new(),
                open: open.clone(),
            }),
        }
    }
}

impl<W: Write> EventOutput for XmlOutput<W> {
    fn visit_start_of_stream(&mut self) -> SerializationResult<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    fn visit_start_group(&mut self, name: &str) -> SerializationResult<()> {
        trace!("visit_start_group: {}", name);
        self.writer.write_event(Event::Start(BytesStart::new(name)))?;
        self.open.push(name.to_owned());
        Ok(())
    }

    fn visit_leaf(&mut self, name: &str, value: &Value) -> SerializationResult<()> {
        let text = value.to_string();
        self.writer.write_event(Event::Start(BytesStart::new(name)))?;
        self.writer
            .write_event(Event::Text(BytesText::new(&xml_chars(&text))))?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn visit_end_group(&mut self, name: &str) -> SerializationResult<()> {
        match self.open.pop() {
            Some(open) if open == name => {
                self.writer.write_event(Event::End(BytesEnd::new(name)))?;
                Ok(())
            }
            open => Err(SerializationError::StructureError {
                group: name.to_owned(),
                open: open.unwrap_or_default(),
            }),
        }
    }

    fn visit_end_of_stream(&mut self) -> SerializationResult<()> {
        trace!("visit_end_of_stream");
        Ok(())
    }
}

/// XML 1.0 has no representation for C0 controls other than tab, LF and CR, escaped or not.
fn is_restricted(c: char) -> bool {
    c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r')
}

/// `text` with every restricted control replaced by U+FFFD.
fn xml_chars(text: &str) -> Cow<'_, str> {
    if text.chars().any(is_restricted) {
        Cow::Owned(
            text.chars()
                .map(|c| if is_restricted(c) { '\u{FFFD}' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(text)
    }
}

pub fn render_xml(stream: &EventStream, indent: bool) -> SerializationResult<String> {
    let mut output = XmlOutput::with_writer(Vec::new(), indent);
    write_events(stream, &mut output)?;
    Ok(String::from_utf8(output.into_writer()?)?)
}
