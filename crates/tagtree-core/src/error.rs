//! Error types for tagtree.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while extracting annotations or loading settings.
///
/// None of these reach the end user as a hard failure during watching:
/// the maintainer logs them and keeps the last known state.
#[derive(Error, Debug)]
pub enum TagTreeError {
    /// The file vanished or could not be read while extracting.
    #[error("failed to read {path}: {source}")]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A bracketed expression did not parse into a usable edge.
    #[error("malformed edge syntax: {0}")]
    MalformedEdge(String),

    /// The configuration file exists but is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TagTreeError {
    /// Wraps an I/O error with the path that produced it.
    pub fn read_failure(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::ReadFailure {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for tagtree operations.
pub type Result<T> = std::result::Result<T, TagTreeError>;
