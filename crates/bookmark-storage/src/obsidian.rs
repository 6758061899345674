//! Obsidian vault backend.
//!
//! Messages are written as Markdown under the vault. The folder comes from
//! `folder_structure`, whose `{category}`, `{year}`, `{month}`, `{day}` and
//! `{user_id}` placeholders are filled per message.
//!
//! In daily-notes mode each message is appended to `YYYY-MM-DD.md` as its own
//! section and the entry id is `<path>#<chat_id>:<message_id>`. Otherwise
//! every message gets its own file with YAML front matter and the entry id is
//! the file path. Telegram numbers messages per chat, so the chat id is part of
//! both the section key and the file name.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use bookmark_core::{ObsidianConfig, StorageBackend};
use chrono::Datelike;
use serde::Serialize;
use serde_yaml::{Mapping, Value as Yaml};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::atomic::atomic_write;
use crate::error::{Result, StorageError};
use crate::record::{ProcessedMessage, RecordUpdate, StoredEntry};
use crate::store::Storage;

const SECTION_PREFIX: &str = "\n## Message at ";
const MARKER_PREFIX: &str = "<!-- tg-bookmark:message=";
const FRONT_MATTER_FENCE: &str = "---";

/// Stores messages as Markdown notes in a vault.
pub struct ObsidianStorage {
    /// The vault root; every entry id must resolve below it.
    vault: PathBuf,
    /// The daily-notes mode flag.
    daily_notes: bool,
    /// The folder template with `{category}`-style placeholders.
    folder_structure: String,
    // serializes read-modify-write of shared daily notes
    write_lock: Mutex<()>,
}

impl ObsidianStorage {
    /// Build from settings. The vault directory must exist.
    pub fn from_config(config: &ObsidianConfig) -> Result<Self> {
        let vault = config
            .vault_path
            .clone()
            .ok_or_else(|| StorageError::Configuration("Obsidian vault path is required".into()))?;
        Self::new(vault, config.daily_notes, &config.folder_structure)
    }

    pub fn new(vault: impl Into<PathBuf>, daily_notes: bool, folder_structure: &str) -> Result<Self> {
        let vault = vault.into();
        if !vault.is_dir() {
            return Err(StorageError::Configuration(format!(
                "Obsidian vault not found at: {}",
                vault.display()
            )));
        }
        info!(vault = %vault.display(), daily_notes, "Initialized Obsidian storage");
        Ok(Self {
            vault,
            daily_notes,
            folder_structure: folder_structure.to_string(),
            write_lock: Mutex::new(()),
        })
    }

    /// Target file for a message.
    pub fn file_path(&self, message: &ProcessedMessage) -> PathBuf {
        let folder = render_folder(&self.folder_structure, message);
        let name = if self.daily_notes {
            format!("{}.md", message.timestamp.format("%Y-%m-%d"))
        } else {
            format!(
                "{}-{}-{}.md",
                message.timestamp.format("%Y-%m-%d-%H%M"),
                message.chat_id,
                message.message_id
            )
        };
        self.vault.join(folder).join(name)
    }

    /// Resolve an entry id to a vault file and optional daily section.
    fn resolve(&self, id: &str) -> Result<(PathBuf, Option<SectionKey>)> {
        let (path, section) = match id.rsplit_once('#') {
            Some((path, key)) => match key.parse::<SectionKey>() {
                Ok(key) => (path, Some(key)),
                Err(_) => (id, None),
            },
            None => (id, None),
        };
        let path = PathBuf::from(path);
        if !path.starts_with(&self.vault) {
            return Err(StorageError::InvalidId(id.to_string()));
        }
        Ok((path, section))
    }
}

/// Identifies one message's section inside a daily note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionKey {
    /// The chat the message was sent in.
    pub chat_id: i64,
    /// The message id, unique only within its chat.
    pub message_id: i32,
}

impl SectionKey {
    pub fn of(message: &ProcessedMessage) -> Self {
        Self {
            chat_id: message.chat_id,
            message_id: message.message_id,
        }
    }

    fn marker(&self) -> String {
        format!("{}{} -->", MARKER_PREFIX, self)
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chat_id, self.message_id)
    }
}

impl FromStr for SectionKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (chat, msg) = s
            .split_once(':')
            .ok_or_else(|| format!("missing chat id in section key: {}", s))?;
        Ok(Self {
            chat_id: chat.parse().map_err(|e| format!("invalid chat id {}: {}", chat, e))?,
            message_id: msg.parse().map_err(|e| format!("invalid message id {}: {}", msg, e))?,
        })
    }
}

/// Fill the folder template for `message`.
///
/// Path separators inside substituted values are replaced with `_`, so a
/// category such as `Technology/Programming` stays one folder.
pub fn render_folder(template: &str, message: &ProcessedMessage) -> String {
    let ts = message.timestamp;
    let values = [
        ("{category}", sanitize_component(&message.category)),
        ("{year}", ts.year().to_string()),
        ("{month}", ts.month().to_string()),
        ("{day}", ts.day().to_string()),
        ("{user_id}", message.user_id.to_string()),
    ];
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| acc.replace(key, value))
}

fn sanitize_component(value: &str) -> String {
    let cleaned = value.replace(['/', '\\'], "_");
    if cleaned.trim().is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}

#[derive(Serialize)]
struct FrontMatter<'a> {
    title: String,
    category: &'a str,
    tags: &'a [String],
    keywords: &'a [String],
    message_id: i32,
    chat_id: i64,
    user_id: u64,
    user_username: Option<&'a str>,
    created_at: String,
    ai_summary: &'a str,
    has_media: bool,
    media_type: Option<&'a str>,
}

/// A standalone note with front matter.
pub fn render_note(message: &ProcessedMessage) -> Result<String> {
    let front = FrontMatter {
        title: message.summary.chars().take(100).collect(),
        category: &message.category,
        tags: &message.tags,
        keywords: &message.keywords,
        message_id: message.message_id,
        chat_id: message.chat_id,
        user_id: message.user_id,
        user_username: message.user_username.as_deref(),
        created_at: message.timestamp.to_rfc3339(),
        ai_summary: &message.summary,
        has_media: message.metadata.has_media,
        media_type: message.metadata.media_type.as_deref(),
    };

    let meta = &message.metadata;
    let mut lines = vec![
        format!("> [!AI Summary] {}", message.summary),
        String::new(),
        "## Content".to_string(),
        String::new(),
        message.content.clone(),
        String::new(),
        "## Metadata".to_string(),
        String::new(),
        format!(
            "- **Chat Type:** {}",
            if meta.chat_type.is_empty() { "Unknown" } else { &meta.chat_type }
        ),
        format!("- **Message ID:** {}", message.message_id),
        format!("- **Timestamp:** {}", message.timestamp.to_rfc3339()),
    ];
    if meta.extracted_urls > 0 {
        lines.push(format!("- **URLs Extracted:** {}", meta.extracted_urls));
    }
    if meta.extracted_files > 0 {
        lines.push(format!("- **Files Processed:** {}", meta.extracted_files));
    }
    if meta.extracted_images > 0 {
        lines.push(format!("- **Images Processed:** {}", meta.extracted_images));
    }

    Ok(join_front_matter(&serde_yaml::to_string(&front)?, &lines.join("\n")))
}

fn join_front_matter(yaml: &str, body: &str) -> String {
    format!("{fence}\n{yaml}{fence}\n\n{body}\n", fence = FRONT_MATTER_FENCE)
}

/// Split a note into its front matter mapping and body.
pub fn split_front_matter(note: &str) -> Result<(Mapping, String)> {
    let Some(rest) = note.strip_prefix("---\n") else {
        return Ok((Mapping::new(), note.to_string()));
    };
    let (yaml, body) = match rest.find("\n---\n") {
        Some(end) => (&rest[..end], &rest[end + 5..]),
        None => match rest.strip_suffix("\n---") {
            Some(yaml) => (yaml, ""),
            None => return Ok((Mapping::new(), note.to_string())),
        },
    };
    let mapping = if yaml.trim().is_empty() {
        Mapping::new()
    } else {
        serde_yaml::from_str(yaml)?
    };
    Ok((mapping, body.trim_start_matches('\n').to_string()))
}

/// A daily-note section for one message.
pub fn render_daily_section(message: &ProcessedMessage) -> String {
    [
        String::new(),
        format!("## Message at {}", message.timestamp.format("%H:%M")),
        SectionKey::of(message).marker(),
        String::new(),
        format!("**Category:** {}", message.category),
        format!("**Tags:** {}", message.tags.join(", ")),
        String::new(),
        format!("> [!Summary] {}", message.summary),
        String::new(),
        "### Content".to_string(),
        String::new(),
        message.content.clone(),
        String::new(),
    ]
    .join("\n")
}

/// Byte range of the section for `key` inside a daily note.
fn section_range(note: &str, key: SectionKey) -> Option<(usize, usize)> {
    let at = note.find(&key.marker())?;
    let start = note[..at].rfind(SECTION_PREFIX).unwrap_or(0);
    let end = note[at..]
        .find(SECTION_PREFIX)
        .map(|offset| at + offset)
        .unwrap_or(note.len());
    Some((start, end))
}

fn yaml_list(values: &[String]) -> Yaml {
    Yaml::Sequence(values.iter().cloned().map(Yaml::String).collect())
}

fn yaml_to_json(value: Yaml) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// Replace the first line starting with `prefix`.
fn rewrite_section_line(section: &str, prefix: &str, value: &str) -> String {
    let mut done = false;
    section
        .lines()
        .map(|line| {
            if !done && line.starts_with(prefix) {
                done = true;
                format!("{}{}", prefix, value)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn section_field(section: &str, prefix: &str) -> Option<String> {
    section
        .lines()
        .find_map(|line| line.strip_prefix(prefix))
        .map(|v| v.trim().to_string())
}

fn read_note(path: &Path, id: &str) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(note) => Ok(Some(note)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(id, "Obsidian note not found");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl Storage for ObsidianStorage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Obsidian
    }

    async fn save(&self, message: &ProcessedMessage) -> Result<String> {
        let path = self.file_path(message);
        let _guard = self.write_lock.lock().await;

        let id = if self.daily_notes {
            let mut note = match fs::read_to_string(&path) {
                Ok(existing) => existing,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
                Err(e) => return Err(e.into()),
            };
            note.push_str(&render_daily_section(message));
            atomic_write(&path, note.as_bytes())?;
            format!("{}#{}", path.display(), SectionKey::of(message))
        } else {
            atomic_write(&path, render_note(message)?.as_bytes())?;
            path.display().to_string()
        };

        info!(message_id = message.message_id, path = %path.display(), "Saved to Obsidian");
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<StoredEntry> {
        let (path, section) = self.resolve(id)?;
        let note = read_note(&path, id)?.ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        match section {
            Some(key) => {
                let (start, end) =
                    section_range(&note, key).ok_or_else(|| StorageError::NotFound(id.to_string()))?;
                let text = &note[start..end];
                let tags: Vec<String> = section_field(text, "**Tags:**")
                    .map(|t| {
                        t.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(StoredEntry {
                    id: id.to_string(),
                    properties: serde_json::json!({
                        "chat_id": key.chat_id,
                        "message_id": key.message_id,
                        "category": section_field(text, "**Category:**"),
                        "tags": tags,
                    }),
                    content: Some(text.trim().to_string()),
                })
            }
            None => {
                let (front, body) = split_front_matter(&note)?;
                Ok(StoredEntry {
                    id: id.to_string(),
                    properties: yaml_to_json(Yaml::Mapping(front)),
                    content: Some(body),
                })
            }
        }
    }

    async fn update(&self, id: &str, update: &RecordUpdate) -> Result<bool> {
        let (path, section) = self.resolve(id)?;
        let _guard = self.write_lock.lock().await;
        let Some(note) = read_note(&path, id)? else {
            return Ok(false);
        };

        let updated = match section {
            Some(key) => {
                let Some((start, end)) = section_range(&note, key) else {
                    return Ok(false);
                };
                let mut text = note[start..end].to_string();
                let trailing_newline = text.ends_with('\n');
                if let Some(category) = &update.category {
                    text = rewrite_section_line(&text, "**Category:** ", category);
                }
                if let Some(tags) = &update.tags {
                    text = rewrite_section_line(&text, "**Tags:** ", &tags.join(", "));
                }
                if let Some(summary) = &update.summary {
                    text = rewrite_section_line(&text, "> [!Summary] ", summary);
                }
                if trailing_newline && !text.ends_with('\n') {
                    text.push('\n');
                }
                format!("{}{}{}", &note[..start], text, &note[end..])
            }
            None => {
                let (mut front, body) = split_front_matter(&note)?;
                let mut set = |key: &str, value: Yaml| {
                    front.insert(Yaml::String(key.to_string()), value);
                };
                if let Some(category) = &update.category {
                    set("category", Yaml::String(category.clone()));
                }
                if let Some(tags) = &update.tags {
                    set("tags", yaml_list(tags));
                }
                if let Some(keywords) = &update.keywords {
                    set("keywords", yaml_list(keywords));
                }
                if let Some(summary) = &update.summary {
                    set("ai_summary", Yaml::String(summary.clone()));
                    set("title", Yaml::String(summary.chars().take(100).collect()));
                }
                join_front_matter(&serde_yaml::to_string(&front)?, body.trim_end())
            }
        };

        atomic_write(&path, updated.as_bytes())?;
        info!(path = %path.display(), "Updated Obsidian note");
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let (path, section) = self.resolve(id)?;
        let _guard = self.write_lock.lock().await;

        match section {
            Some(key) => {
                let Some(note) = read_note(&path, id)? else {
                    return Ok(false);
                };
                let Some((start, end)) = section_range(&note, key) else {
                    return Ok(false);
                };
                let remaining = format!("{}{}", &note[..start], &note[end..]);
                if remaining.trim().is_empty() {
                    fs::remove_file(&path)?;
                } else {
                    atomic_write(&path, remaining.as_bytes())?;
                }
            }
            None => match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
                Err(e) => return Err(e.into()),
            },
        }

        info!(id, "Deleted Obsidian entry");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures;
    use tempfile::tempdir;

    #[test]
    fn test_render_folder_sanitizes_values() {
        let msg = fixtures::message();
        assert_eq!(render_folder("Inbox/{category}", &msg), "Inbox/Technology_Programming");
        assert_eq!(render_folder("{year}/{month}/{day}/{user_id}", &msg), "2024/3/9/42");

        let mut msg = msg;
        msg.category = "..".into();
        assert_eq!(render_folder("Inbox/{category}", &msg), "Inbox/_");
    }

    #[test]
    fn test_file_names() {
        let dir = tempdir().unwrap();
        let msg = fixtures::message();

        let standalone = ObsidianStorage::new(dir.path(), false, "Inbox/{category}").unwrap();
        assert_eq!(
            standalone.file_path(&msg),
            dir.path().join("Inbox/Technology_Programming/2024-03-09-1405-42-7.md")
        );

        let daily = ObsidianStorage::new(dir.path(), true, "Daily").unwrap();
        assert_eq!(daily.file_path(&msg), dir.path().join("Daily/2024-03-09.md"));
    }

    #[test]
    fn test_missing_vault_is_configuration_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            ObsidianStorage::new(dir.path().join("missing"), true, "Inbox"),
            Err(StorageError::Configuration(_))
        ));
    }

    #[test]
    fn test_note_front_matter_round_trip() {
        let note = render_note(&fixtures::message()).unwrap();
        assert!(note.starts_with("---\n"));
        assert!(note.contains("> [!AI Summary] Ownership in Rust"));
        assert!(note.contains("- **URLs Extracted:** 1"));
        assert!(!note.contains("Files Processed"));

        let (front, body) = split_front_matter(&note).unwrap();
        assert_eq!(front.get("category").and_then(|v| v.as_str()), Some("Technology/Programming"));
        assert_eq!(front.get("message_id").and_then(|v| v.as_i64()), Some(7));
        assert!(body.starts_with("> [!AI Summary]"));
    }

    #[test]
    fn test_section_key_parsing() {
        assert_eq!(
            "-1001234:7".parse::<SectionKey>().unwrap(),
            SectionKey {
                chat_id: -1001234,
                message_id: 7
            }
        );
        assert!("7".parse::<SectionKey>().is_err());
        assert!("a:7".parse::<SectionKey>().is_err());
    }

    #[test]
    fn test_split_without_front_matter() {
        let (front, body) = split_front_matter("# Just text\n").unwrap();
        assert!(front.is_empty());
        assert_eq!(body, "# Just text\n");
    }

    #[test]
    fn test_daily_section_format() {
        let section = render_daily_section(&fixtures::message());
        assert!(section.starts_with("\n## Message at 14:05\n"));
        assert!(section.contains("<!-- tg-bookmark:message=42:7 -->"));
        assert!(section.contains("**Tags:** rust, memory"));
        assert!(section.contains("> [!Summary] Ownership in Rust"));
    }
}
