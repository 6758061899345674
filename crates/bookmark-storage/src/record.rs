//! The processed message record shared by every backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a message came from and what was extracted from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub chat_type: String,
    pub chat_id: i64,
    pub chat_title: Option<String>,
    pub has_media: bool,
    pub media_type: Option<String>,
    pub has_entities: bool,
    pub is_forwarded: bool,
    pub extracted_urls: usize,
    pub extracted_files: usize,
    pub extracted_images: usize,
}

/// A message after extraction and AI processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedMessage {
    pub user_id: u64,
    pub user_username: Option<String>,
    pub message_id: i32,
    pub chat_id: i64,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub summary: String,
    pub category: String,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub metadata: MessageMetadata,
}

impl ProcessedMessage {
    /// Username when known, otherwise the numeric id.
    pub fn author(&self) -> String {
        self.user_username
            .clone()
            .unwrap_or_else(|| self.user_id.to_string())
    }
}

/// Fields to change on a stored entry. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub summary: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
}

impl RecordUpdate {
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Default::default()
        }
    }

    pub fn tags(tags: Vec<String>) -> Self {
        Self {
            tags: Some(tags),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.category.is_none() && self.tags.is_none() && self.keywords.is_none()
    }

    /// Apply the update to an in-memory record.
    pub fn apply_to(&self, message: &mut ProcessedMessage) {
        if let Some(summary) = &self.summary {
            message.summary = summary.clone();
        }
        if let Some(category) = &self.category {
            message.category = category.clone();
        }
        if let Some(tags) = &self.tags {
            message.tags = tags.clone();
        }
        if let Some(keywords) = &self.keywords {
            message.keywords = keywords.clone();
        }
    }
}

/// A stored entry as read back from a backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEntry {
    pub id: String,
    /// Backend properties (Notion page properties or note front matter).
    pub properties: serde_json::Value,
    /// Note body, when the backend keeps one locally.
    pub content: Option<String>,
}
