//! Error types for the AI engine.

use thiserror::Error;

/// Errors that can occur while talking to an AI provider.
#[derive(Debug, Error)]
pub enum AiError {
    /// Provider credentials are missing or the provider is unknown.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// HTTP transport failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The provider answered with a non-success status.
    #[error("{provider} API error {status}: {body}")]
    Api {
        /// Provider name.
        provider: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The provider response had an unexpected shape.
    #[error("failed to parse response: {0}")]
    ResponseParse(String),

    /// The provider does not support the requested operation.
    #[error("{0} is not supported by this provider")]
    Unsupported(&'static str),
}

/// Result type for AI operations.
pub type Result<T> = std::result::Result<T, AiError>;

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        AiError::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = AiError::Api {
            provider: "openai",
            status: 401,
            body: "bad key".into(),
        };
        assert_eq!(err.to_string(), "openai API error 401: bad key");
        assert_eq!(
            AiError::Unsupported("embeddings").to_string(),
            "embeddings is not supported by this provider"
        );
    }
}
