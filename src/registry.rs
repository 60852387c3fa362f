//! Adapter selection.
//!
//! The registry owns the known adapters in priority order. It is immutable once built and is
//! shared by reference between workers.

use std::path::Path;

use log::{debug, info};

use crate::adapter::{Adapter, write_file_info};
use crate::adapters::{ArcAdapter, WarcAdapter, WaveAdapter, Word2Adapter};
use crate::context::ParseContext;
use crate::err::ExtractError;

/// How a dispatched file ended up, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Parsed { adapter: &'static str },
    Unrecognized,
}

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All adapters shipped with this crate.
    pub fn with_default_adapters() -> Self {
        let mut registry = Self::new();
        registry.register(WaveAdapter::new());
        registry.register(Word2Adapter::new());
        registry.register(WarcAdapter::default());
        registry.register(ArcAdapter::new());
        registry
    }

    /// Append an adapter. Earlier registrations win when several accept the same file.
    pub fn register(&mut self, adapter: impl Adapter + 'static) -> &mut Self {
        info!("registering adapter `{}` {}", adapter.name(), adapter.version());
        self.adapters.push(Box::new(adapter));
        self
    }

    pub fn adapters(&self) -> impl Iterator<Item = &dyn Adapter> {
        self.adapters.iter().map(|a| a.as_ref())
    }

    pub fn identify(&self, file: &Path) -> Option<&dyn Adapter> {
        let found = self.adapters().find(|adapter| adapter.accepts(file));
        match found {
            Some(adapter) => debug!("{} identified as `{}`", file.display(), adapter.name()),
            None => debug!("{} not recognized by any adapter", file.display()),
        }
        found
    }

    /// Identify `file` and parse it into `ctx`.
    ///
    /// Unrecognized files are not an error: an `unrecognized` group carrying the file
    /// information is written instead, so every file produces output.
    pub fn dispatch(&self, file: &Path, ctx: &mut ParseContext) -> Result<Dispatch, ExtractError> {
        let Some(adapter) = self.identify(file) else {
            ctx.start("unrecognized");
            let written = write_file_info(file, ctx).and_then(|_| ctx.end("unrecognized"));
            return match written {
                Ok(()) => Ok(Dispatch::Unrecognized),
                Err(source) => Err(ExtractError::Incomplete {
                    path: file.to_path_buf(),
                    source,
                }),
            };
        };

        adapter
            .parse(file, ctx)
            .map(|_| Dispatch::Parsed {
                adapter: adapter.name(),
            })
            .map_err(|source| ExtractError::AdapterFailed {
                path: file.to_path_buf(),
                adapter: adapter.name(),
                source,
            })
    }
}
