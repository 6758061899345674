//! Error types for configuration loading and bootstrap.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or materializing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value outside its allowed set.
    #[error("invalid value for {key}: {value:?} (expected {expected})")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
        /// Human readable description of accepted values.
        expected: String,
    },

    /// The environment file could not be parsed.
    #[error("failed to load env file {path}: {message}")]
    EnvFile {
        /// Path of the env file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Logging was already initialised or could not be set up.
    #[error("logging setup failed: {0}")]
    Logging(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, expected: &str) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }
}
