//! Shared state for the Telegram bot.
//!
//! Holds per-user processing history (for `/stats` and `/export`) and the
//! storage entry ids of every saved message (for the inline buttons). All of
//! it lives in memory and is lost on restart.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use bookmark_core::{Settings, StorageBackend};
use bookmark_storage::ProcessedMessage;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::health::HealthState;

/// Entries kept per user.
pub const HISTORY_LIMIT: usize = 500;

/// Categories listed by `/stats`.
const TOP_CATEGORIES: usize = 3;

/// One processed message as remembered for statistics and export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// The Telegram message id.
    pub message_id: i32,
    /// The chat the message was sent in.
    pub chat_id: i64,
    /// When the message was processed.
    pub timestamp: DateTime<Utc>,
    /// The assigned category.
    pub category: String,
    /// The assigned tags.
    pub tags: Vec<String>,
    /// The extracted keywords.
    pub keywords: Vec<String>,
    /// The AI summary.
    pub summary: String,
}

impl From<&ProcessedMessage> for HistoryEntry {
    fn from(record: &ProcessedMessage) -> Self {
        Self {
            message_id: record.message_id,
            chat_id: record.chat_id,
            timestamp: record.timestamp,
            category: record.category.clone(),
            tags: record.tags.clone(),
            keywords: record.keywords.clone(),
            summary: record.summary.clone(),
        }
    }
}

/// Statistics shown by `/stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserStats {
    /// The number of messages processed.
    pub total: usize,
    /// The retained messages from the last seven days.
    pub this_week: usize,
    /// The retained messages from today.
    pub today: usize,
    /// Most frequent categories with their counts, highest first.
    pub top_categories: Vec<(String, usize)>,
}

/// Storage entries written for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedEntries {
    /// The backend and backend-specific id of each saved copy.
    pub entries: Vec<(StorageBackend, String)>,
}

/// `/export` output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    Markdown,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Markdown => "md",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "md" | "markdown" => Ok(Self::Markdown),
            other => Err(format!("Unknown export format: {}", other)),
        }
    }
}

/// State shared by every handler.
pub struct BotState {
    /// The loaded settings.
    settings: Settings,
    /// The liveness state served on `/health`.
    health: Arc<HealthState>,
    /// The most recent entries per user, newest last.
    history: RwLock<HashMap<u64, VecDeque<HistoryEntry>>>,
    /// The lifetime processed count per user.
    totals: RwLock<HashMap<u64, usize>>,
    /// The storage ids of messages still in history, keyed by user and message.
    saved: RwLock<HashMap<(u64, i32), SavedEntries>>,
}

impl BotState {
    pub fn new(settings: Settings, health: Arc<HealthState>) -> Self {
        Self {
            settings,
            health,
            history: RwLock::new(HashMap::new()),
            totals: RwLock::new(HashMap::new()),
            saved: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn health(&self) -> &Arc<HealthState> {
        &self.health
    }

    /// Whether a chat may use the bot.
    pub fn is_allowed(&self, chat_id: i64, user_id: Option<u64>) -> bool {
        self.settings
            .telegram
            .is_chat_allowed(chat_id, user_id.map(|u| u as i64))
    }

    /// Record a processed message in the user's history.
    ///
    /// Entries pushed out of the history also lose their storage ids, so the
    /// buttons of very old results stop working.
    pub async fn record_processed(&self, record: &ProcessedMessage) {
        let mut evicted = Vec::new();
        {
            let mut history = self.history.write().await;
            let entries = history.entry(record.user_id).or_default();
            entries.push_back(HistoryEntry::from(record));
            while entries.len() > HISTORY_LIMIT {
                if let Some(old) = entries.pop_front() {
                    evicted.push(old.message_id);
                }
            }
        }
        if !evicted.is_empty() {
            let mut saved = self.saved.write().await;
            for message_id in evicted {
                saved.remove(&(record.user_id, message_id));
            }
        }
        *self.totals.write().await.entry(record.user_id).or_default() += 1;
        self.health.record_processed();
    }

    async fn in_history(&self, user_id: u64, message_id: i32) -> bool {
        self.history
            .read()
            .await
            .get(&user_id)
            .is_some_and(|entries| entries.iter().any(|e| e.message_id == message_id))
    }

    /// Remember where a message was stored. Ignored once the message has
    /// left the history.
    pub async fn record_saved(&self, user_id: u64, message_id: i32, backend: StorageBackend, id: String) {
        if !self.in_history(user_id, message_id).await {
            debug!(user_id, message_id, backend = %backend, "Message no longer tracked, dropping storage id");
            return;
        }
        debug!(user_id, message_id, backend = %backend, id = %id, "Recorded storage entry");
        self.saved
            .write()
            .await
            .entry((user_id, message_id))
            .or_default()
            .entries
            .push((backend, id));
    }

    /// Storage entries for a message, if it was saved.
    pub async fn saved_entries(&self, user_id: u64, message_id: i32) -> Option<SavedEntries> {
        self.saved.read().await.get(&(user_id, message_id)).cloned()
    }

    /// Forget a message's storage entries and history entry.
    pub async fn forget(&self, user_id: u64, message_id: i32) -> Option<SavedEntries> {
        if let Some(entries) = self.history.write().await.get_mut(&user_id) {
            entries.retain(|e| e.message_id != message_id);
        }
        self.saved.write().await.remove(&(user_id, message_id))
    }

    /// Apply a category change to the remembered history.
    pub async fn set_category(&self, user_id: u64, message_id: i32, category: &str) {
        if let Some(entries) = self.history.write().await.get_mut(&user_id) {
            for entry in entries.iter_mut().filter(|e| e.message_id == message_id) {
                entry.category = category.to_string();
            }
        }
    }

    /// Replace the saved entries of a message, e.g. with those whose
    /// deletion failed.
    pub async fn retain_saved(&self, user_id: u64, message_id: i32, entries: SavedEntries) {
        self.saved.write().await.insert((user_id, message_id), entries);
    }

    /// The message's tags with `tag` added. The history is left unchanged.
    pub async fn tags_with(&self, user_id: u64, message_id: i32, tag: &str) -> Option<Vec<String>> {
        let history = self.history.read().await;
        let entry = history.get(&user_id)?.iter().find(|e| e.message_id == message_id)?;
        let mut tags = entry.tags.clone();
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
        Some(tags)
    }

    /// Apply a tag list to the remembered history.
    pub async fn set_tags(&self, user_id: u64, message_id: i32, tags: &[String]) {
        if let Some(entries) = self.history.write().await.get_mut(&user_id) {
            for entry in entries.iter_mut().filter(|e| e.message_id == message_id) {
                entry.tags = tags.to_vec();
            }
        }
    }

    /// History entries for a user, oldest first.
    pub async fn history(&self, user_id: u64) -> Vec<HistoryEntry> {
        self.history
            .read()
            .await
            .get(&user_id)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Statistics for a user as of now.
    pub async fn stats(&self, user_id: u64) -> UserStats {
        self.stats_at(user_id, Utc::now()).await
    }

    /// Statistics for a user as of `now`.
    pub async fn stats_at(&self, user_id: u64, now: DateTime<Utc>) -> UserStats {
        let total = self.totals.read().await.get(&user_id).copied().unwrap_or(0);
        let history = self.history(user_id).await;
        let mut stats = compute_stats(&history, now);
        stats.total = total;
        stats
    }
}

/// Statistics over a history slice. `total` is the slice length.
pub fn compute_stats(history: &[HistoryEntry], now: DateTime<Utc>) -> UserStats {
    let week_start = now - Duration::days(7);
    let today = now.date_naive();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entry in history {
        *counts.entry(entry.category.as_str()).or_default() += 1;
    }
    let mut top: Vec<(String, usize)> = counts.into_iter().map(|(c, n)| (c.to_string(), n)).collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(TOP_CATEGORIES);

    UserStats {
        total: history.len(),
        this_week: history.iter().filter(|e| e.timestamp > week_start).count(),
        today: history.iter().filter(|e| e.timestamp.date_naive() == today).count(),
        top_categories: top,
    }
}

/// Render history in an export format.
pub fn render_export(format: ExportFormat, history: &[HistoryEntry]) -> String {
    match format {
        ExportFormat::Json => serde_json::to_string_pretty(history).unwrap_or_else(|_| "[]".to_string()),
        ExportFormat::Csv => {
            let mut out = String::from("message_id,chat_id,timestamp,category,tags,keywords,summary\n");
            for e in history {
                let _ = writeln!(
                    out,
                    "{},{},{},{},{},{},{}",
                    e.message_id,
                    e.chat_id,
                    e.timestamp.to_rfc3339(),
                    csv_field(&e.category),
                    csv_field(&e.tags.join(";")),
                    csv_field(&e.keywords.join(";")),
                    csv_field(&e.summary),
                );
            }
            out
        }
        ExportFormat::Markdown => {
            let mut out = String::from("# Knowledge Bot Export\n");
            for e in history {
                let _ = write!(
                    out,
                    "\n## {} ({})\n\n- Category: {}\n- Tags: {}\n- Keywords: {}\n\n{}\n",
                    e.timestamp.format("%Y-%m-%d %H:%M"),
                    e.message_id,
                    e.category,
                    e.tags.join(", "),
                    e.keywords.join(", "),
                    e.summary,
                );
            }
            out
        }
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
