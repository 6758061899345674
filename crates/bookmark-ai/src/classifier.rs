//! Content classification and keyword extraction.
//!
//! Both operations ask the provider for a JSON object. Replies that cannot be
//! parsed degrade to defaults instead of failing the message.

use std::sync::Arc;

use tracing::warn;

use crate::error::Result;
use crate::json::{parse_json_object, string_list};
use crate::provider::{AiProvider, CompletionOptions};

/// Categories a message can be filed under.
pub const CATEGORIES: &[&str] = &[
    "Technology/Programming",
    "Learning Notes",
    "Ideas/Inspiration",
    "To-Do Items",
    "Article Summary",
    "Link Collection",
    "Meeting Notes",
    "Project Planning",
    "Personal Journal",
];

/// Category used when nothing better matches.
pub const DEFAULT_CATEGORY: &str = "Learning Notes";

/// Tag used when classification fails.
pub const DEFAULT_TAG: &str = "general";

/// Default number of keywords.
pub const DEFAULT_KEYWORD_COUNT: usize = 5;

const CLASSIFY_MAX_TOKENS: u32 = 200;

/// Map a predicted category onto [`CATEGORIES`].
///
/// Exact names pass through; otherwise the first category that contains or is
/// contained by the prediction (case-insensitive) wins.
pub fn best_category(predicted: &str) -> &'static str {
    if let Some(exact) = CATEGORIES.iter().find(|c| **c == predicted) {
        return exact;
    }
    let predicted = predicted.trim().to_lowercase();
    if predicted.is_empty() {
        return DEFAULT_CATEGORY;
    }
    CATEGORIES
        .iter()
        .find(|c| {
            let c = c.to_lowercase();
            predicted.contains(&c) || c.contains(&predicted)
        })
        .copied()
        .unwrap_or(DEFAULT_CATEGORY)
}

/// Remove duplicate tags, keeping first occurrences.
pub fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Classifies content into a category and tags.
#[derive(Clone)]
pub struct ContentClassifier {
    provider: Arc<dyn AiProvider>,
}

impl ContentClassifier {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }

    /// Classify `text`, returning `(category, tags)`.
    ///
    /// Provider errors propagate; an unparsable reply yields
    /// `("Learning Notes", ["general"])`.
    pub async fn classify(&self, text: &str) -> Result<(String, Vec<String>)> {
        let prompt = format!(
            "Analyze the following content and:\n\
             1. Choose the most appropriate category (select from: {})\n\
             2. Generate 3-5 relevant tags that capture the main topics\n\n\
             Content: {}\n\n\
             Return ONLY a JSON object in this exact format:\n\
             {{\"category\": \"Category Name\", \"tags\": [\"tag1\", \"tag2\", \"tag3\"]}}",
            CATEGORIES.join(", "),
            text
        );

        let reply = self
            .provider
            .complete(&prompt, CompletionOptions::with_max_tokens(CLASSIFY_MAX_TOKENS).json())
            .await?;

        let Some(json) = parse_json_object(&reply) else {
            warn!(provider = self.provider.name(), "Unparsable classification reply");
            return Ok((DEFAULT_CATEGORY.to_string(), vec![DEFAULT_TAG.to_string()]));
        };

        let category = json["category"].as_str().map(best_category).unwrap_or(DEFAULT_CATEGORY);
        let tags = dedup_tags(string_list(&json["tags"]));
        Ok((category.to_string(), tags))
    }

    /// Extract up to `top_k` keywords from `text`.
    ///
    /// Unparsable replies yield an empty list.
    pub async fn extract_keywords(&self, text: &str, top_k: usize) -> Result<Vec<String>> {
        let prompt = format!(
            "Extract {top_k} key terms or phrases from the following text.\n\
             Focus on important concepts, technologies, topics, or entities.\n\n\
             Text: {text}\n\n\
             Return ONLY a JSON object:\n\
             {{\"keywords\": [\"keyword1\", \"keyword2\", \"keyword3\"]}}"
        );

        let reply = self
            .provider
            .complete(&prompt, CompletionOptions::with_max_tokens(CLASSIFY_MAX_TOKENS).json())
            .await?;

        Ok(parse_json_object(&reply)
            .map(|json| {
                let mut keywords = string_list(&json["keywords"]);
                keywords.truncate(top_k);
                keywords
            })
            .unwrap_or_default())
    }
}
