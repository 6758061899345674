//! Turns an incoming message into a [`ProcessedMessage`].

use std::sync::Arc;
use std::time::Duration;

use bookmark_ai::{
    AiProvider, ContentClassifier, MessageSummarizer, DEFAULT_CATEGORY, DEFAULT_KEYWORD_COUNT,
    DEFAULT_SUMMARY_LENGTH,
};
use bookmark_core::FeaturesConfig;
use bookmark_extract::{ContentExtractionPipeline, ExtractedContent, FileFetcher, IncomingMessage};
use bookmark_storage::{MessageMetadata, ProcessedMessage};
use tracing::{debug, info, warn};

use crate::error::{Result, TelegramError};

/// AI output for one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// The summary, or the truncated text when summarizing is off.
    pub summary: String,
    /// The category name.
    pub category: String,
    /// The tags.
    pub tags: Vec<String>,
    /// The keywords.
    pub keywords: Vec<String>,
    /// The embedding, when the provider returned one.
    pub embedding: Option<Vec<f32>>,
}

/// Extraction plus AI analysis, bounded by the processing timeout.
pub struct MessageProcessor {
    /// The URL, document and OCR extraction pipeline.
    pipeline: ContentExtractionPipeline,
    /// The summarizer.
    summarizer: MessageSummarizer,
    /// The classifier.
    classifier: ContentClassifier,
    /// The feature flags that gate summarizing and classifying.
    features: FeaturesConfig,
    /// The per-message deadline.
    timeout: Duration,
}

impl MessageProcessor {
    pub fn new(
        provider: Arc<dyn AiProvider>,
        pipeline: ContentExtractionPipeline,
        features: FeaturesConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            pipeline,
            summarizer: MessageSummarizer::new(Arc::clone(&provider)),
            classifier: ContentClassifier::new(provider),
            features,
            timeout,
        }
    }

    /// Process a message. Returns `None` when it carries no content at all.
    ///
    /// A media message without extractable text is described instead.
    pub async fn process(
        &self,
        message: &IncomingMessage,
        fetcher: &dyn FileFetcher,
    ) -> Result<Option<ProcessedMessage>> {
        match tokio::time::timeout(self.timeout, self.run(message, fetcher)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(message_id = message.message_id, "Processing timed out");
                Err(TelegramError::Timeout(self.timeout.as_secs()))
            }
        }
    }

    async fn run(&self, message: &IncomingMessage, fetcher: &dyn FileFetcher) -> Result<Option<ProcessedMessage>> {
        let extracted = self.pipeline.process_message(message, fetcher).await;
        let content = if extracted.text.trim().is_empty() {
            if !message.has_media() {
                return Ok(None);
            }
            format!("Media file received: {}", message.describe_media())
        } else {
            extracted.text.clone()
        };

        let analysis = self.analyze(&content).await?;
        Ok(Some(build_record(message, &extracted, content, analysis)))
    }

    /// Summarize, classify, extract keywords and embed `text`.
    pub async fn analyze(&self, text: &str) -> Result<Analysis> {
        let summary = if self.features.auto_summarize {
            self.summarizer.summarize(text, DEFAULT_SUMMARY_LENGTH).await?
        } else {
            clip(text, DEFAULT_SUMMARY_LENGTH)
        };

        let (category, tags, keywords) = if self.features.auto_classify {
            let (category, tags) = self.classifier.classify(text).await?;
            let keywords = self
                .classifier
                .extract_keywords(text, DEFAULT_KEYWORD_COUNT)
                .await?;
            (category, tags, keywords)
        } else {
            (DEFAULT_CATEGORY.to_string(), Vec::new(), Vec::new())
        };

        let embedding = match self.summarizer.embed(text).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                debug!(error = %e, "Embedding unavailable");
                None
            }
        };

        info!(category = %category, tags = tags.len(), keywords = keywords.len(), "Analyzed content");
        Ok(Analysis {
            summary,
            category,
            tags,
            keywords,
            embedding,
        })
    }
}

fn build_record(
    message: &IncomingMessage,
    extracted: &ExtractedContent,
    content: String,
    analysis: Analysis,
) -> ProcessedMessage {
    let meta = &extracted.metadata;
    ProcessedMessage {
        user_id: message.user_id.unwrap_or_default(),
        user_username: message.username.clone(),
        message_id: message.message_id,
        chat_id: message.chat.id,
        timestamp: message.date,
        content,
        summary: analysis.summary,
        category: analysis.category,
        tags: analysis.tags,
        keywords: analysis.keywords,
        embedding: analysis.embedding,
        metadata: MessageMetadata {
            chat_type: message.chat.kind.clone(),
            chat_id: message.chat.id,
            chat_title: message.chat.title.clone(),
            has_media: message.has_media(),
            media_type: message.has_media().then(|| message.media_type()),
            has_entities: meta.has_entities,
            is_forwarded: meta.is_forwarded,
            extracted_urls: meta.extracted_urls,
            extracted_files: meta.extracted_files,
            extracted_images: meta.extracted_images,
        },
    }
}

/// First `max` characters of `text`, with `...` when cut.
fn clip(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}
