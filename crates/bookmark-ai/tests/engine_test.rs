//! Summarizer and classifier behaviour against a scripted provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bookmark_ai::{
    AiError, AiProvider, CompletionOptions, ContentClassifier, MessageSummarizer, Result,
};

/// Replies with canned text and records every request.
struct ScriptedProvider {
    reply: std::result::Result<String, u16>,
    calls: Mutex<Vec<(String, CompletionOptions)>>,
}

impl ScriptedProvider {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(status),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, CompletionOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String> {
        self.calls.lock().unwrap().push((prompt.to_string(), options));
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(AiError::Api {
                provider: "scripted",
                status: *status,
                body: "boom".into(),
            }),
        }
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.1, 0.2, 0.3])
    }
}

#[tokio::test]
async fn test_short_text_is_not_summarized() {
    let provider = ScriptedProvider::replying("unused");
    let summarizer = MessageSummarizer::new(provider.clone());

    let text = "é".repeat(300);
    assert_eq!(summarizer.summarize(&text, 300).await.unwrap(), text);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_long_text_is_summarized_and_trimmed() {
    let provider = ScriptedProvider::replying("  A short summary.\n");
    let summarizer = MessageSummarizer::new(provider.clone());

    let summary = summarizer.summarize(&"word ".repeat(100), 50).await.unwrap();

    assert_eq!(summary, "A short summary.");
    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.max_tokens, 200);
    assert!(calls[0].0.contains("approximately 50 characters"));
}

#[tokio::test]
async fn test_classify_maps_category_and_dedups_tags() {
    let provider = ScriptedProvider::replying(
        r#"{"category": "programming", "tags": ["rust", "async", "rust"]}"#,
    );
    let classifier = ContentClassifier::new(provider.clone());

    let (category, tags) = classifier.classify("tokio tasks").await.unwrap();

    assert_eq!(category, "Technology/Programming");
    assert_eq!(tags, vec!["rust", "async"]);
    assert!(provider.calls()[0].1.json);
}

#[tokio::test]
async fn test_classify_accepts_single_tag_string() {
    let provider = ScriptedProvider::replying(r#"{"category": "Meeting Notes", "tags": "standup"}"#);
    let classifier = ContentClassifier::new(provider);

    let (category, tags) = classifier.classify("notes").await.unwrap();
    assert_eq!(category, "Meeting Notes");
    assert_eq!(tags, vec!["standup"]);
}

#[tokio::test]
async fn test_classify_unparsable_reply_falls_back() {
    let classifier = ContentClassifier::new(ScriptedProvider::replying("I think it's about Rust."));

    let (category, tags) = classifier.classify("anything").await.unwrap();
    assert_eq!(category, "Learning Notes");
    assert_eq!(tags, vec!["general"]);
}

#[tokio::test]
async fn test_classify_provider_error_propagates() {
    let classifier = ContentClassifier::new(ScriptedProvider::failing(500));
    assert!(matches!(
        classifier.classify("anything").await,
        Err(AiError::Api { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_keywords_truncated_to_top_k() {
    let provider = ScriptedProvider::replying(r#"{"keywords": ["a", "b", "c", "d"]}"#);
    let classifier = ContentClassifier::new(provider);

    assert_eq!(classifier.extract_keywords("text", 2).await.unwrap(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_keywords_unparsable_is_empty() {
    let classifier = ContentClassifier::new(ScriptedProvider::replying("none"));
    assert!(classifier.extract_keywords("text", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_embed_uses_provider() {
    let summarizer = MessageSummarizer::new(ScriptedProvider::replying(""));
    assert_eq!(summarizer.embed("x").await.unwrap().len(), 3);
}
