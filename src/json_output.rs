use log::trace;
use serde_json::{Map, Value as JsonValue};

use crate::context::EventStream;
use crate::err::{SerializationError, SerializationResult};
use crate::value::Value;
use crate::xml_output::{EventOutput, write_events};

/// Builds one nested JSON object from an event stream.
///
/// Groups become objects keyed by their name. A name seen twice under the same parent turns
/// into an array holding every occurrence in order.
#[derive(Debug, Default)]
pub struct JsonOutput {
    root: Map<String, JsonValue>,
    stack: Vec<(String, Map<String, JsonValue>)>,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&mut self) -> &mut Map<String, JsonValue> {
        match self.stack.last_mut() {
            Some((_, map)) => map,
            None => &mut self.root,
        }
    }

    pub fn into_value(self) -> SerializationResult<JsonValue> {
        match self.stack.last() {
            None => Ok(JsonValue::Object(self.root)),
            Some((open, _)) => Err(SerializationError::StructureError {
                group: String::new(),
                open: open.clone(),
            }),
        }
    }
}

fn insert_or_append(map: &mut Map<String, JsonValue>, key: &str, value: JsonValue) {
    match map.get_mut(key) {
        Some(JsonValue::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = JsonValue::Array(vec![first, value]);
        }
        None => {
            map.insert(key.to_owned(), value);
        }
    }
}

impl EventOutput for JsonOutput {
    fn visit_start_of_stream(&mut self) -> SerializationResult<()> {
        Ok(())
    }

    fn visit_start_group(&mut self, name: &str) -> SerializationResult<()> {
        trace!("visit_start_group: {}", name);
        self.stack.push((name.to_owned(), Map::new()));
        Ok(())
    }

    fn visit_leaf(&mut self, name: &str, value: &Value) -> SerializationResult<()> {
        insert_or_append(self.current(), name, value.to_json());
        Ok(())
    }

    fn visit_end_group(&mut self, name: &str) -> SerializationResult<()> {
        match self.stack.pop() {
            Some((open, map)) if open == name => {
                insert_or_append(self.current(), name, JsonValue::Object(map));
                Ok(())
            }
            open => Err(SerializationError::StructureError {
                group: name.to_owned(),
                open: open.map(|(n, _)| n).unwrap_or_default(),
            }),
        }
    }

    fn visit_end_of_stream(&mut self) -> SerializationResult<()> {
        Ok(())
    }
}

pub fn render_json(stream: &EventStream, indent: bool) -> SerializationResult<String> {
    let mut output = JsonOutput::new();
    write_events(stream, &mut output)?;
    let value = output.into_value()?;
    Ok(if indent {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    })
}
