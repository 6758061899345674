//! Error types for the Telegram front end.

use thiserror::Error;

/// Errors raised while running the bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token not provided.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN environment variable.")]
    NoToken,

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// Webhook setup failed.
    #[error("Failed to set up webhook: {0}")]
    WebhookFailed(String),

    /// Telegram API request failed.
    #[error("Telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    /// AI processing failed.
    #[error("AI error: {0}")]
    Ai(#[from] bookmark_ai::AiError),

    /// Storage backend failed.
    #[error("Storage error: {0}")]
    Storage(#[from] bookmark_storage::StorageError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] bookmark_core::ConfigError),

    /// Message processing exceeded `PROCESSING_TIMEOUT`.
    #[error("Processing timed out after {0} seconds")]
    Timeout(u64),

    /// The storage queue is no longer accepting work.
    #[error("Storage queue is closed")]
    QueueClosed,

    /// Callback data did not match any known action.
    #[error("Unknown callback data: {0}")]
    InvalidCallback(String),

    /// HTTP request outside the Telegram client failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Health check failed.
    #[error("Health check failed: {0}")]
    Unhealthy(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;
