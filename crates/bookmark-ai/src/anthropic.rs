//! Anthropic Messages API client.

use async_trait::async_trait;
use bookmark_core::AiConfig;
use serde_json::json;
use tracing::debug;

use crate::error::{AiError, Result};
use crate::openai::OpenAiProvider;
use crate::provider::{AiProvider, CompletionOptions};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic provider.
///
/// Anthropic has no embedding endpoint, so embeddings go through OpenAI when
/// an OpenAI or embedding key is configured.
#[derive(Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    embedder: Option<OpenAiProvider>,
}

impl AnthropicProvider {
    /// Build from settings. Requires `ANTHROPIC_API_KEY`.
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let api_key = config
            .anthropic_api_key
            .clone()
            .ok_or_else(|| AiError::Configuration("ANTHROPIC_API_KEY is not set".into()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.anthropic_model.clone(),
            embedder: OpenAiProvider::for_embeddings(config),
        })
    }

    /// Whether embeddings are available.
    pub fn can_embed(&self) -> bool {
        self.embedder.is_some()
    }
}

#[async_trait]
impl AiProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String> {
        debug!(model = %self.model, max_tokens = options.max_tokens, "Anthropic completion");
        let body = json!({
            "model": self.model,
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                provider: "anthropic",
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AiError::ResponseParse(e.to_string()))?;
        parse_message_text(&json)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match &self.embedder {
            Some(openai) => openai.embed(text).await,
            None => Err(AiError::Unsupported("embeddings")),
        }
    }
}

/// Extract the first text block of a Messages API reply.
fn parse_message_text(json: &serde_json::Value) -> Result<String> {
    json["content"]
        .as_array()
        .and_then(|blocks| blocks.iter().find_map(|b| b["text"].as_str()))
        .map(|s| s.to_string())
        .ok_or_else(|| AiError::ResponseParse("No text content in response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        assert!(AnthropicProvider::from_config(&AiConfig::default()).is_err());
    }

    #[test]
    fn test_embedding_support_follows_openai_key() {
        let cfg = AiConfig {
            anthropic_api_key: Some("sk-ant".into()),
            ..Default::default()
        };
        assert!(!AnthropicProvider::from_config(&cfg).unwrap().can_embed());

        let cfg = AiConfig {
            openai_embedding_api_key: Some("sk-embed".into()),
            ..cfg
        };
        assert!(AnthropicProvider::from_config(&cfg).unwrap().can_embed());
    }

    #[tokio::test]
    async fn test_embed_without_openai_is_unsupported() {
        let cfg = AiConfig {
            anthropic_api_key: Some("sk-ant".into()),
            ..Default::default()
        };
        let provider = AnthropicProvider::from_config(&cfg).unwrap();
        assert!(matches!(provider.embed("x").await, Err(AiError::Unsupported(_))));
    }

    #[test]
    fn test_parse_message_text() {
        let json = json!({"content": [{"type": "text", "text": "hello"}]});
        assert_eq!(parse_message_text(&json).unwrap(), "hello");
        assert!(parse_message_text(&json!({"content": []})).is_err());
    }
}
