//! Telegram front end for tg-bookmark.
//!
//! Every text or media message sent to the bot is run through content
//! extraction and AI analysis, answered with a summary, and queued for
//! storage in Notion and/or Obsidian.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `OPENAI_API_KEY` or `ANTHROPIC_API_KEY`
//!
//! Optional:
//! - `TELEGRAM_ALLOWED_CHATS`, `TELEGRAM_ADMIN_USERS`: access control and error reports
//! - `TELEGRAM_WEBHOOK_URL`: public URL for `--mode webhook`
//! - `WORKER_CONCURRENCY`, `PROCESSING_TIMEOUT`, `HEALTH_PORT`
//!
//! # Commands
//!
//! - `/start` - Welcome message
//! - `/help` - Show available commands
//! - `/settings` - Show feature flags and storage backends
//! - `/stats` - Per-user statistics
//! - `/export [json|csv|markdown]` - Download processed history

pub mod bot;
pub mod callbacks;
pub mod error;
pub mod handlers;
pub mod health;
pub mod incoming;
pub mod processor;
pub mod queue;
pub mod state;

pub use bot::{AdminNotifier, KnowledgeBot, RunMode};
pub use callbacks::{apply_action, CallbackAction};
pub use error::{Result, TelegramError};
pub use handlers::{BotContext, Command};
pub use health::{HealthResponse, HealthState, HealthStatus};
pub use incoming::{incoming_message, TelegramFetcher};
pub use processor::{Analysis, MessageProcessor};
pub use queue::{save_all, StorageQueue};
pub use state::{BotState, ExportFormat, HistoryEntry, UserStats};
