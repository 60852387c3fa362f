//! The parse context: an ordered event sink plus a tree of named scopes holding the last value
//! recorded under every path.
//!
//! Adapters and elements open scopes with [`ParseContext::start`], record leaves with
//! [`ParseContext::value`] and close scopes with [`ParseContext::end`]. Values can be queried
//! mid-parse by dotted path (`"WAV.fmt.length"`), which is how a walker learns how far to jump.

use hashbrown::HashMap;
use log::trace;

use crate::err::{ParseError, Result};
use crate::value::Value;

/// One entry of the event stream handed to renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    StartGroup(String),
    Leaf { path: String, value: Value },
    EndGroup(String),
}

impl ParseEvent {
    /// Last segment of a leaf path, or the group name.
    pub fn name(&self) -> &str {
        match self {
            ParseEvent::StartGroup(name) | ParseEvent::EndGroup(name) => name,
            ParseEvent::Leaf { path, .. } => path.rsplit('.').next().unwrap_or(path),
        }
    }
}

#[derive(Debug, Default)]
struct Scope {
    values: HashMap<String, Value>,
    children: HashMap<String, Scope>,
}

impl Scope {
    fn child_mut(&mut self, name: &str) -> &mut Scope {
        self.children.entry_ref(name).or_default()
    }

    fn lookup<'a, I>(&self, mut segments: I) -> Option<&Value>
    where
        I: Iterator<Item = &'a str>,
    {
        let first = segments.next()?;
        let mut scope = self;
        let mut name = first;
        for next in segments {
            scope = scope.children.get(name)?;
            name = next;
        }
        scope.values.get(name)
    }
}

#[derive(Debug, Default)]
pub struct ParseContext {
    events: Vec<ParseEvent>,
    open: Vec<String>,
    root: Scope,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, name: impl Into<String>) {
        let name = name.into();
        trace!("start `{}` at depth {}", name, self.open.len());
        self.events.push(ParseEvent::StartGroup(name.clone()));
        self.open.push(name);
    }

    pub fn end(&mut self, name: &str) -> Result<()> {
        match self.open.last() {
            Some(open) if open == name => {
                self.open.pop();
                self.events.push(ParseEvent::EndGroup(name.to_owned()));
                trace!("end `{}`", name);
                Ok(())
            }
            Some(open) => Err(ParseError::UnbalancedScope {
                expected: open.clone(),
                found: name.to_owned(),
            }),
            None => Err(ParseError::UnbalancedScope {
                expected: String::new(),
                found: name.to_owned(),
            }),
        }
    }

    /// Record a leaf named `name` in the innermost open scope.
    pub fn value(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let path = self.path_of(name);
        trace!("{} = {}", path, value);

        let mut scope = &mut self.root;
        for open in &self.open {
            scope = scope.child_mut(open);
        }
        scope.values.insert(name.to_owned(), value.clone());
        self.events.push(ParseEvent::Leaf { path, value });
    }

    /// Dotted path of the innermost open scope.
    pub fn current_path(&self) -> String {
        self.open.join(".")
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    fn path_of(&self, name: &str) -> String {
        if self.open.is_empty() {
            name.to_owned()
        } else {
            let mut path = self.current_path();
            path.push('.');
            path.push_str(name);
            path
        }
    }

    /// Value at an absolute dotted path.
    pub fn get(&self, path: &str) -> Result<&Value> {
        self.root
            .lookup(path.split('.'))
            .ok_or_else(|| ParseError::NotFound {
                path: path.to_owned(),
            })
    }

    /// Value at a dotted path relative to the innermost open scope.
    pub fn get_in_scope(&self, path: &str) -> Result<&Value> {
        self.root
            .lookup(self.open.iter().map(String::as_str).chain(path.split('.')))
            .ok_or_else(|| ParseError::NotFound {
                path: self.path_of(path),
            })
    }

    pub fn get_int(&self, path: &str) -> Result<i64> {
        let value = self.get(path)?;
        integer_as(path, value)
    }

    pub fn get_u64(&self, path: &str) -> Result<u64> {
        let value = self.get(path)?;
        integer_as(path, value)
    }

    pub fn get_u64_in_scope(&self, path: &str) -> Result<u64> {
        let value = self.get_in_scope(path)?;
        integer_as(&self.path_of(path), value)
    }

    pub fn get_str(&self, path: &str) -> Result<&str> {
        let value = self.get(path)?;
        value.as_str().ok_or_else(|| ParseError::NotNumeric {
            path: path.to_owned(),
            found: value.type_name().to_owned(),
        })
    }

    /// Read-only view of the events emitted so far.
    pub fn events(&self) -> &[ParseEvent] {
        &self.events
    }

    /// Finish the parse and hand over the event stream. Fails if a scope is still open.
    pub fn drain(self) -> Result<EventStream> {
        if let Some(open) = self.open.last() {
            return Err(ParseError::UnbalancedScope {
                expected: open.clone(),
                found: String::new(),
            });
        }
        Ok(EventStream {
            events: self.events,
        })
    }
}

fn integer_as<T: TryFrom<i128>>(path: &str, value: &Value) -> Result<T> {
    value
        .as_integer()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| ParseError::NotNumeric {
            path: path.to_owned(),
            found: value.to_string(),
        })
}

/// The completed, stack-balanced event trace of one file's parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStream {
    events: Vec<ParseEvent>,
}

impl EventStream {
    pub fn iter(&self) -> std::slice::Iter<'_, ParseEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Leaf values in emission order, keyed by full path.
    pub fn leaves(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.events.iter().filter_map(|e| match e {
            ParseEvent::Leaf { path, value } => Some((path.as_str(), value)),
            _ => None,
        })
    }

    /// Names of the groups opened directly below the group named `parent`.
    pub fn child_groups(&self, parent: &str) -> Vec<&str> {
        let mut out = vec![];
        let mut depth_in_parent: Option<usize> = None;
        for event in &self.events {
            match (event, depth_in_parent) {
                (ParseEvent::StartGroup(name), None) if name == parent => {
                    depth_in_parent = Some(0)
                }
                (ParseEvent::StartGroup(name), Some(depth)) => {
                    if depth == 0 {
                        out.push(name.as_str());
                    }
                    depth_in_parent = Some(depth + 1);
                }
                (ParseEvent::EndGroup(_), Some(0)) => depth_in_parent = None,
                (ParseEvent::EndGroup(_), Some(depth)) => depth_in_parent = Some(depth - 1),
                _ => {}
            }
        }
        out
    }
}

impl<'a> IntoIterator for &'a EventStream {
    type Item = &'a ParseEvent;
    type IntoIter = std::slice::Iter<'a, ParseEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
