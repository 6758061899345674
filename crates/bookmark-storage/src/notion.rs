//! Notion database backend.
//!
//! Each message becomes a page in the configured database. The database is
//! expected to have these properties: `Title` (title), `Category` (select),
//! `Tags` and `Keywords` (multi-select), `User ID` and `Message ID` (number),
//! `Date` (date).

use async_trait::async_trait;
use bookmark_core::{NotionConfig, StorageBackend};
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Result, StorageError};
use crate::record::{ProcessedMessage, RecordUpdate, StoredEntry};
use crate::store::Storage;

/// Notion REST API base.
pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";

/// API version sent with every request.
pub const NOTION_VERSION: &str = "2022-06-28";

const TITLE_MAX_CHARS: usize = 100;
const MAX_SELECT_OPTIONS: usize = 20;
const KEYWORD_MAX_CHARS: usize = 100;
const BLOCK_MAX_CHARS: usize = 2000;
const CHUNK_CHARS: usize = 1900;

/// Stores messages as Notion pages.
#[derive(Clone)]
pub struct NotionStorage {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    database_id: String,
}

impl NotionStorage {
    /// Build from settings. Requires both an API key and a database id.
    pub fn from_config(config: &NotionConfig) -> Result<Self> {
        match (&config.api_key, &config.database_id) {
            (Some(key), Some(db)) => Ok(Self::new(key, db, NOTION_API_BASE)),
            _ => Err(StorageError::Configuration(
                "Notion API key and database ID are required".into(),
            )),
        }
    }

    /// Build against an explicit API base URL.
    pub fn new(api_key: &str, database_id: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            database_id: database_id.to_string(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Notion-Version", NOTION_VERSION)
    }

    /// Send a request, mapping 404 to `None` and other failures to errors.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Option<Value>> {
        let response = builder.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(Some(response.json().await?))
    }

    async fn patch_page(&self, page_id: &str, body: Value) -> Result<bool> {
        let builder = self
            .request(reqwest::Method::PATCH, &format!("pages/{}", page_id))
            .json(&body);
        Ok(self.send(builder).await?.is_some())
    }
}

#[async_trait]
impl Storage for NotionStorage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Notion
    }

    async fn save(&self, message: &ProcessedMessage) -> Result<String> {
        let properties = build_properties(message);
        let children = build_content_blocks(message);
        debug!(message_id = message.message_id, blocks = children.len(), "Creating Notion page");

        let body = json!({
            "parent": {"database_id": self.database_id},
            "properties": properties,
            "children": children,
        });
        let page = self
            .send(self.request(reqwest::Method::POST, "pages").json(&body))
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("database {}", self.database_id)))?;

        let page_id = page["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| StorageError::Api {
                status: 200,
                body: "page response without id".into(),
            })?;
        info!(user_id = message.user_id, message_id = message.message_id, page_id = %page_id, category = %message.category, "Saved to Notion");
        Ok(page_id)
    }

    async fn get(&self, id: &str) -> Result<StoredEntry> {
        let page = self
            .send(self.request(reqwest::Method::GET, &format!("pages/{}", id)))
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        Ok(StoredEntry {
            id: id.to_string(),
            properties: page["properties"].clone(),
            content: None,
        })
    }

    async fn update(&self, id: &str, update: &RecordUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(true);
        }
        let updated = self
            .patch_page(id, json!({"properties": update_properties(update)}))
            .await?;
        if updated {
            info!(page_id = id, "Updated Notion page");
        } else {
            warn!(page_id = id, "Notion page not found for update");
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let archived = self.patch_page(id, json!({"archived": true})).await?;
        if archived {
            info!(page_id = id, "Archived Notion page");
        }
        Ok(archived)
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn title_property(summary: &str) -> Value {
    json!({"title": [{"text": {"content": truncate(summary, TITLE_MAX_CHARS)}}]})
}

fn multi_select(values: &[String], max_chars: Option<usize>) -> Value {
    let options: Vec<Value> = values
        .iter()
        .take(MAX_SELECT_OPTIONS)
        .map(|v| {
            let name = match max_chars {
                Some(max) => truncate(v, max),
                None => v.clone(),
            };
            json!({"name": name})
        })
        .collect();
    json!({"multi_select": options})
}

/// Page properties for a new message.
pub fn build_properties(message: &ProcessedMessage) -> Value {
    let mut props = Map::new();
    props.insert("Title".into(), title_property(&message.summary));
    props.insert("Category".into(), json!({"select": {"name": message.category}}));
    if !message.tags.is_empty() {
        props.insert("Tags".into(), multi_select(&message.tags, None));
    }
    props.insert("User ID".into(), json!({"number": message.user_id}));
    props.insert("Message ID".into(), json!({"number": message.message_id}));
    props.insert("Date".into(), json!({"date": {"start": message.timestamp.to_rfc3339()}}));
    if !message.keywords.is_empty() {
        props.insert("Keywords".into(), multi_select(&message.keywords, Some(KEYWORD_MAX_CHARS)));
    }
    Value::Object(props)
}

/// Property patch for an update.
pub fn update_properties(update: &RecordUpdate) -> Value {
    let mut props = Map::new();
    if let Some(summary) = &update.summary {
        props.insert("Title".into(), title_property(summary));
    }
    if let Some(category) = &update.category {
        props.insert("Category".into(), json!({"select": {"name": category}}));
    }
    if let Some(tags) = &update.tags {
        props.insert("Tags".into(), multi_select(tags, None));
    }
    if let Some(keywords) = &update.keywords {
        props.insert("Keywords".into(), multi_select(keywords, Some(KEYWORD_MAX_CHARS)));
    }
    Value::Object(props)
}

fn heading(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "heading_2",
        "heading_2": {"rich_text": [{"type": "text", "text": {"content": text}}]}
    })
}

fn paragraph(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": {"rich_text": [{"type": "text", "text": {"content": text}}]}
    })
}

/// Split text into pieces of at most `size` characters.
pub fn chunk_chars(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size.max(1)).map(|c| c.iter().collect()).collect()
}

/// Page body: summary, full content and metadata sections.
pub fn build_content_blocks(message: &ProcessedMessage) -> Vec<Value> {
    let mut blocks = vec![
        heading("Summary"),
        paragraph(&truncate(&message.summary, BLOCK_MAX_CHARS)),
        heading("Full Content"),
    ];

    if message.content.chars().count() > BLOCK_MAX_CHARS {
        blocks.extend(chunk_chars(&message.content, CHUNK_CHARS).iter().map(|c| paragraph(c)));
    } else {
        blocks.push(paragraph(&message.content));
    }

    let meta = &message.metadata;
    let metadata_text = format!(
        "User: {}\nMessage ID: {}\nTimestamp: {}\nChat Type: {}\nHas Media: {}\nURLs Extracted: {}\nFiles Processed: {}",
        message.author(),
        message.message_id,
        message.timestamp.to_rfc3339(),
        if meta.chat_type.is_empty() { "Unknown" } else { &meta.chat_type },
        meta.has_media,
        meta.extracted_urls,
        meta.extracted_files,
    );
    blocks.push(heading("Metadata"));
    blocks.push(paragraph(&metadata_text));
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures;

    #[test]
    fn test_from_config_requires_both() {
        let cfg = NotionConfig {
            api_key: Some("secret".into()),
            database_id: None,
        };
        assert!(matches!(NotionStorage::from_config(&cfg), Err(StorageError::Configuration(_))));
    }

    #[test]
    fn test_build_properties() {
        let mut msg = fixtures::message();
        msg.summary = "s".repeat(150);
        msg.keywords = (0..25).map(|i| format!("{}{}", i, "k".repeat(120))).collect();

        let props = build_properties(&msg);

        assert_eq!(props["Title"]["title"][0]["text"]["content"].as_str().unwrap().len(), 100);
        assert_eq!(props["Category"]["select"]["name"], "Technology/Programming");
        assert_eq!(props["Tags"]["multi_select"][1]["name"], "memory");
        assert_eq!(props["User ID"]["number"], 42);
        assert_eq!(props["Message ID"]["number"], 7);
        assert_eq!(props["Date"]["date"]["start"], "2024-03-09T14:05:00+00:00");
        let keywords = props["Keywords"]["multi_select"].as_array().unwrap();
        assert_eq!(keywords.len(), 20);
        assert_eq!(keywords[0]["name"].as_str().unwrap().chars().count(), 100);
    }

    #[test]
    fn test_empty_tags_are_omitted() {
        let mut msg = fixtures::message();
        msg.tags.clear();
        msg.keywords.clear();
        let props = build_properties(&msg);
        assert!(props.get("Tags").is_none());
        assert!(props.get("Keywords").is_none());
    }

    #[test]
    fn test_short_content_is_one_paragraph() {
        let blocks = build_content_blocks(&fixtures::message());
        assert_eq!(blocks.len(), 6);
        assert_eq!(blocks[0]["heading_2"]["rich_text"][0]["text"]["content"], "Summary");
        assert_eq!(blocks[3]["paragraph"]["rich_text"][0]["text"]["content"], "Rust ownership explained");
        let meta = blocks[5]["paragraph"]["rich_text"][0]["text"]["content"].as_str().unwrap();
        assert!(meta.contains("User: alice"));
        assert!(meta.contains("URLs Extracted: 1"));
    }

    #[test]
    fn test_long_content_is_chunked() {
        let mut msg = fixtures::message();
        msg.content = "x".repeat(4000);
        let blocks = build_content_blocks(&msg);
        // 3 leading blocks, 3 chunks (1900 + 1900 + 200), 2 metadata blocks
        assert_eq!(blocks.len(), 8);
        assert_eq!(
            blocks[5]["paragraph"]["rich_text"][0]["text"]["content"].as_str().unwrap().len(),
            200
        );
    }

    #[test]
    fn test_update_properties_only_changed_fields() {
        let props = update_properties(&RecordUpdate::category("Ideas/Inspiration"));
        assert_eq!(props, json!({"Category": {"select": {"name": "Ideas/Inspiration"}}}));
    }
}
