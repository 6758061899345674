//! OpenAI-compatible chat completion and embedding client.
//!
//! Any endpoint that speaks the OpenAI `/chat/completions` and `/embeddings`
//! wire format works; set `OPENAI_ENDPOINT` to point elsewhere.

use async_trait::async_trait;
use bookmark_core::AiConfig;
use serde_json::json;
use tracing::debug;

use crate::error::{AiError, Result};
use crate::provider::{AiProvider, CompletionOptions};

/// Default OpenAI API base.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Credentials and base URL for one OpenAI-compatible service.
#[derive(Debug, Clone)]
struct Endpoint {
    base: String,
    api_key: String,
}

impl Endpoint {
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base.trim_end_matches('/'), path)
    }
}

/// OpenAI provider.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    llm: Endpoint,
    model: String,
    embedding: Endpoint,
    embedding_model: String,
}

impl OpenAiProvider {
    /// Build from settings. Requires `OPENAI_API_KEY`.
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| AiError::Configuration("OPENAI_API_KEY is not set".into()))?;
        Ok(Self::build(config, api_key))
    }

    /// Build a client used only for embeddings.
    ///
    /// Falls back from the embedding key to the LLM key; returns `None` when
    /// neither is configured.
    pub fn for_embeddings(config: &AiConfig) -> Option<Self> {
        let key = config
            .openai_embedding_api_key
            .clone()
            .or_else(|| config.openai_api_key.clone())?;
        Some(Self::build(config, key))
    }

    fn build(config: &AiConfig, llm_key: String) -> Self {
        let llm_base = config
            .openai_endpoint
            .clone()
            .unwrap_or_else(|| OPENAI_API_BASE.to_string());
        let embedding = Endpoint {
            base: config
                .openai_embedding_endpoint
                .clone()
                .unwrap_or_else(|| llm_base.clone()),
            api_key: config
                .openai_embedding_api_key
                .clone()
                .unwrap_or_else(|| llm_key.clone()),
        };
        Self {
            client: reqwest::Client::new(),
            llm: Endpoint {
                base: llm_base,
                api_key: llm_key,
            },
            model: config.openai_model.clone(),
            embedding,
            embedding_model: config.openai_embedding_model.clone(),
        }
    }

    /// Chat model in use.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post(&self, endpoint: &Endpoint, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(endpoint.url(path))
            .header("Authorization", format!("Bearer {}", endpoint.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                provider: "openai",
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AiError::ResponseParse(e.to_string()))
    }
}

/// Build the chat completion request body.
pub(crate) fn chat_request(model: &str, prompt: &str, options: CompletionOptions) -> serde_json::Value {
    let mut body = json!({
        "model": model,
        "messages": [{"role": "user", "content": prompt}],
        "temperature": options.temperature,
        "max_tokens": options.max_tokens,
    });
    if options.json {
        body["response_format"] = json!({"type": "json_object"});
    }
    body
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String> {
        debug!(model = %self.model, max_tokens = options.max_tokens, "OpenAI completion");
        let body = chat_request(&self.model, prompt, options);
        let json = self.post(&self.llm, "chat/completions", &body).await?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AiError::ResponseParse("No content in response".to_string()))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.embedding_model,
            "input": text,
        });
        let json = self.post(&self.embedding, "embeddings", &body).await?;
        parse_embedding(&json)
    }
}

/// Extract `data[0].embedding` from an embeddings response.
pub(crate) fn parse_embedding(json: &serde_json::Value) -> Result<Vec<f32>> {
    json["data"][0]["embedding"]
        .as_array()
        .ok_or_else(|| AiError::ResponseParse("No embedding in response".to_string()))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| AiError::ResponseParse("Non-numeric embedding value".to_string()))
        })
        .collect()
}
