//! Error types for content extraction.

use thiserror::Error;

/// Errors raised inside the extraction processors.
///
/// The public processors turn these into descriptive text so a failing link
/// or attachment never aborts a message.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("download failed: {0}")]
    Download(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("document parse failed: {0}")]
    Parse(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for extraction.
pub type Result<T> = std::result::Result<T, ExtractError>;
