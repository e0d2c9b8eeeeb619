//! Error types for the tiddler store.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The key has never been written.
    #[error("no record for key {key}")]
    NotFound { key: String },

    #[error("cannot read record {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The record file exists but does not decode. A zero-length file seen
    /// while a writer is mid-flight lands here too.
    #[error("corrupt record {key}: {source}")]
    CorruptRecord {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request body is not a JSON object.
    #[error("malformed tiddler: {0}")]
    MalformedInput(String),

    /// Stored metadata is not a JSON object. Tombstones hit this on read.
    #[error("malformed metadata for {key}: {reason}")]
    MalformedStoredData { key: String, reason: String },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot walk store: {0}")]
    Walk(#[from] walkdir::Error),
}

impl StoreError {
    /// True when the caller sent something we could not accept, as opposed
    /// to a failure on our side.
    pub fn is_client_error(&self) -> bool {
        matches!(self, StoreError::MalformedInput(_))
    }
}
