//! Error taxonomy (spec.md §7).
//!
//! `MorcError` carries the outer kinds; `CaptureError` is the `ErrCapture`
//! subcategory, nested so scrape failures can be inspected without a full
//! match over every other kind.

use thiserror::Error;

/// Failure of a single [`crate::capture::VarScraper`] application.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("offset [{start},{end}) is out of range for a body of {len} bytes")]
    OutOfRange {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("response body is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("key '{0}' not found in JSON object")]
    MissingKey(String),

    #[error("expected a JSON {expected} at '{at}', found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
        at: String,
    },
}

/// Top-level engine error kinds (spec.md §7).
#[derive(Debug, Error)]
pub enum MorcError {
    #[error("no such {kind} '{name}'")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("bad input: {0}")]
    BadInput(String),

    #[error("bad url '{url}': {source}")]
    BadUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("transport error sending to '{url}': {message}")]
    Transport { url: String, message: String },

    #[error("flow step could not be resolved: {0}")]
    StepUnresolved(String),

    #[error("auth_flow cycle detected: {0}")]
    AuthCycle(String),

    #[error("capture '{name}' failed: {source}")]
    Capture {
        name: String,
        #[source]
        source: CaptureError,
    },

    #[error("io error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("schema error: {0}")]
    Schema(String),
}

impl MorcError {
    /// Maps an engine error to the process exit code it corresponds to
    /// (spec.md §6/§7). CLI usage errors (clap parse failures) are handled
    /// separately in `main` and always exit `1`; this covers only engine
    /// errors, so the result is always `2` or `3`.
    pub fn exit_code(&self) -> i32 {
        match self {
            MorcError::Capture { .. } => 3,
            _ => 2,
        }
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        MorcError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        MorcError::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        MorcError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MorcError>;
