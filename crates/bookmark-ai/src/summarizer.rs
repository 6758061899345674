//! Message summarization.

use std::sync::Arc;

use crate::error::Result;
use crate::provider::{AiProvider, CompletionOptions};

/// Default summary length in characters.
pub const DEFAULT_SUMMARY_LENGTH: usize = 300;

const SUMMARY_MAX_TOKENS: u32 = 200;

/// Summarizes message content through an [`AiProvider`].
#[derive(Clone)]
pub struct MessageSummarizer {
    provider: Arc<dyn AiProvider>,
}

impl MessageSummarizer {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }

    /// Summarize `text` to roughly `max_length` characters.
    ///
    /// Text that already fits is returned unchanged without calling the
    /// provider.
    pub async fn summarize(&self, text: &str, max_length: usize) -> Result<String> {
        if text.chars().count() <= max_length {
            return Ok(text.to_string());
        }

        let prompt = format!(
            "Please provide a concise summary of the following text.\n\
             The summary should be approximately {max_length} characters or less.\n\
             Focus on the main points and key information.\n\n\
             Text to summarize:\n{text}\n\n\
             Provide only the summary without any additional text or formatting."
        );

        let summary = self
            .provider
            .complete(&prompt, CompletionOptions::with_max_tokens(SUMMARY_MAX_TOKENS))
            .await?;
        Ok(summary.trim().to_string())
    }

    /// Embed `text` with the same provider.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.provider.embed(text).await
    }
}
