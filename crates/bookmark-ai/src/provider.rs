//! The provider abstraction shared by summarizer and classifier.

use async_trait::async_trait;

use crate::error::Result;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Default completion length in tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Per-request completion options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// The completion length limit in tokens.
    pub max_tokens: u32,
    /// The sampling temperature.
    pub temperature: f32,
    /// Ask the provider for a JSON object reply where supported.
    pub json: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            json: false,
        }
    }
}

impl CompletionOptions {
    /// Options with a custom token limit.
    pub fn with_max_tokens(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            ..Default::default()
        }
    }

    /// Request a JSON object reply.
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }
}

/// A text completion and embedding backend.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &'static str;

    /// Complete a single-turn user prompt.
    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String>;

    /// Embed text into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_defaults() {
        let opts = CompletionOptions::default();
        assert_eq!(opts.max_tokens, 1000);
        assert!((opts.temperature - 0.3).abs() < f32::EPSILON);
        assert!(!opts.json);

        let opts = CompletionOptions::with_max_tokens(200).json();
        assert_eq!(opts.max_tokens, 200);
        assert!(opts.json);
    }
}
