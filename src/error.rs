//! Error types shared by the store, the api client and the cli.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("snapshot store unavailable at {}: {reason}", path.display())]
    StorageUnavailable { path: PathBuf, reason: String },

    #[error("snapshot store error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("a snapshot already exists at timestamp {0}")]
    DuplicateTimestamp(i64),

    #[error("snapshot {captured_at} could not be decoded: {source}")]
    Deserialization {
        captured_at: i64,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors a cycle logs and moves past instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::DuplicateTimestamp(_) | Error::Deserialization { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
