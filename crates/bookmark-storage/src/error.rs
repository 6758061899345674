//! Error types for storage backends.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while storing messages.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend is not configured.
    #[error("storage not configured: {0}")]
    Configuration(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API rejected the request.
    #[error("Notion API error {status}: {body}")]
    Api { status: u16, body: String },

    /// No entry with the given id.
    #[error("entry not found: {0}")]
    NotFound(String),

    /// An id that this backend did not issue.
    #[error("invalid entry id: {0}")]
    InvalidId(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("front matter error: {0}")]
    FrontMatter(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
