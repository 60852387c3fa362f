use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors raised while reading elements from a byte source, or while querying the context.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("offset {offset}: truncated {what} (need {need} bytes, have {have})")]
    Truncated {
        what: &'static str,
        offset: u64,
        need: u64,
        have: u64,
    },

    #[error("offset {offset}: malformed {what}: {reason}")]
    Malformed {
        what: &'static str,
        offset: u64,
        reason: String,
    },

    #[error("invalid offset {offset} (source length is {len})")]
    InvalidOffset { offset: u64, len: u64 },

    #[error("no value has been recorded at `{path}`")]
    NotFound { path: String },

    #[error("value at `{path}` is not numeric (found `{found}`)")]
    NotNumeric { path: String, found: String },

    #[error("cannot close scope `{found}`, innermost open scope is `{expected}`")]
    UnbalancedScope { expected: String, found: String },

    #[error("record reader failed: {reason}")]
    External { reason: String },

    #[error("an I/O error has occurred: {0}")]
    Io(#[from] io::Error),
}

/// Stable classification of a failure, used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Truncated,
    Malformed,
    InvalidOffset,
    NotFound,
    NotNumeric,
    UnbalancedScope,
    External,
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Truncated => "Truncated",
            ErrorKind::Malformed => "Malformed",
            ErrorKind::InvalidOffset => "InvalidOffset",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::NotNumeric => "NotNumeric",
            ErrorKind::UnbalancedScope => "UnbalancedScope",
            ErrorKind::External => "External",
            ErrorKind::Io => "Io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::Truncated { .. } => ErrorKind::Truncated,
            ParseError::Malformed { .. } => ErrorKind::Malformed,
            ParseError::InvalidOffset { .. } => ErrorKind::InvalidOffset,
            ParseError::NotFound { .. } => ErrorKind::NotFound,
            ParseError::NotNumeric { .. } => ErrorKind::NotNumeric,
            ParseError::UnbalancedScope { .. } => ErrorKind::UnbalancedScope,
            ParseError::External { .. } => ErrorKind::External,
            ParseError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn malformed(what: &'static str, offset: u64, reason: impl Into<String>) -> Self {
        ParseError::Malformed {
            what,
            offset,
            reason: reason.into(),
        }
    }
}

pub type SerializationResult<T> = std::result::Result<T, SerializationError>;

/// Errors raised while rendering a drained event stream.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("`{group}` was closed while `{open}` was the innermost group")]
    StructureError { group: String, open: String },

    #[error("rendered output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("an I/O error has occurred: {0}")]
    Io(#[from] io::Error),
}

/// A whole-file failure, as reported by the registry.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("adapter `{adapter}` failed to parse {}: {source}", path.display())]
    AdapterFailed {
        path: PathBuf,
        adapter: &'static str,
        #[source]
        source: ParseError,
    },

    #[error("event stream for {} is incomplete: {source}", path.display())]
    Incomplete {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::AdapterFailed { source, .. } => source.kind(),
            ExtractError::Incomplete { source, .. } => source.kind(),
        }
    }

    pub fn adapter(&self) -> Option<&'static str> {
        match self {
            ExtractError::AdapterFailed { adapter, .. } => Some(adapter),
            ExtractError::Incomplete { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_cause_through_adapter_failure() {
        let err = ExtractError::AdapterFailed {
            path: PathBuf::from("a.wav"),
            adapter: "wav",
            source: ParseError::Truncated {
                what: "u32",
                offset: 40,
                need: 4,
                have: 1,
            },
        };

        assert_eq!(err.kind(), ErrorKind::Truncated);
        assert_eq!(err.adapter(), Some("wav"));
        assert!(err.to_string().contains("offset 40"));
    }
}
