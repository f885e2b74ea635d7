#![forbid(unsafe_code)]

//! Dataset loading errors.

use std::path::PathBuf;

/// Errors from reading or decoding a dataset file.
#[derive(Debug)]
pub enum LoadError {
    /// The file could not be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The contents were not valid JSON or a record was malformed.
    Parse(serde_json::Error),
    /// Valid JSON, but neither a record array nor an object with `records`.
    Shape(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read dataset '{}': {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid dataset json: {err}"),
            Self::Shape(msg) => write!(f, "unexpected dataset layout: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Shape(_) => None,
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}
