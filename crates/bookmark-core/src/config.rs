//! Runtime settings for the knowledge bot.
//!
//! Settings are read once at startup from process environment variables.
//! An env file (see [`load_env_file`]) is merged into the environment first,
//! so values from the real environment always win over the file.
//!
//! # Groups
//!
//! - `telegram`: bot token, admin users, allowed chats
//! - `ai`: provider selection and credentials for OpenAI / Anthropic
//! - `storage`: primary backend plus Notion and Obsidian credentials
//! - `processing`: storage worker count and per-message timeout
//! - `features`: feature flags (`FEATURE_*`)
//! - `logging`: level, format and optional log directory
//! - `health`: liveness endpoint port
//!
//! Empty values and template placeholders such as
//! `your_telegram_bot_token_here` are treated as unset.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ConfigError, Result};

/// Default OpenAI chat model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Default OpenAI embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default Anthropic model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";

/// Default Obsidian folder layout.
pub const DEFAULT_FOLDER_STRUCTURE: &str = "Inbox/{category}";

/// Default port for the liveness endpoint.
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// Default env file name in the working directory.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Which AI provider handles completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderKind {
    OpenAi,
    Anthropic,
}

impl FromStr for AiProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(ConfigError::invalid("AI_PROVIDER", s, "one of: openai, anthropic")),
        }
    }
}

impl fmt::Display for AiProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Storage backend identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Notion,
    Obsidian,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "notion" => Ok(Self::Notion),
            "obsidian" => Ok(Self::Obsidian),
            _ => Err(ConfigError::invalid("STORAGE_PRIMARY", s, "one of: notion, obsidian")),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notion => write!(f, "notion"),
            Self::Obsidian => write!(f, "obsidian"),
        }
    }
}

/// Log verbosity as written in `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// The equivalent `tracing` filter directive.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            _ => Err(ConfigError::invalid(
                "LOG_LEVEL",
                s,
                "one of: DEBUG, INFO, WARNING, ERROR",
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "console" | "pretty" => Ok(Self::Text),
            _ => Err(ConfigError::invalid("LOG_FORMAT", s, "one of: json, text")),
        }
    }
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TelegramConfig {
    /// The token from `TELEGRAM_BOT_TOKEN`.
    pub bot_token: Option<String>,
    /// The user ids from `TELEGRAM_ADMIN_USERS` that receive error reports.
    pub admin_users: Vec<i64>,
    /// The chat ids from `TELEGRAM_ALLOWED_CHATS`. Empty allows every chat.
    pub allowed_chats: Vec<i64>,
    /// Public URL Telegram should deliver webhook updates to.
    pub webhook_url: Option<String>,
}

impl TelegramConfig {
    /// Whether a chat may use the bot.
    ///
    /// An empty allow-list admits every chat; admin users are always admitted.
    pub fn is_chat_allowed(&self, chat_id: i64, user_id: Option<i64>) -> bool {
        if self.allowed_chats.is_empty() {
            return true;
        }
        if user_id.map(|u| self.admin_users.contains(&u)).unwrap_or(false) {
            return true;
        }
        self.allowed_chats.contains(&chat_id)
    }
}

/// AI provider configuration.
#[derive(Debug, Clone, Serialize)]
pub struct AiConfig {
    /// The completion provider from `AI_PROVIDER`.
    pub provider: AiProviderKind,
    pub openai_endpoint: Option<String>,
    /// The OpenAI key, also used for embeddings when no separate key is set.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_embedding_endpoint: Option<String>,
    pub openai_embedding_api_key: Option<String>,
    pub openai_embedding_model: String,
    /// The Anthropic key.
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
}

impl AiConfig {
    /// Whether any completion provider has credentials.
    pub fn has_any_key(&self) -> bool {
        self.openai_api_key.is_some() || self.anthropic_api_key.is_some()
    }

    /// Whether the selected provider has credentials.
    pub fn selected_key_present(&self) -> bool {
        match self.provider {
            AiProviderKind::OpenAi => self.openai_api_key.is_some(),
            AiProviderKind::Anthropic => self.anthropic_api_key.is_some(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProviderKind::OpenAi,
            openai_endpoint: None,
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_embedding_endpoint: None,
            openai_embedding_api_key: None,
            openai_embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            anthropic_api_key: None,
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
        }
    }
}

/// Notion storage configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NotionConfig {
    /// The integration token from `NOTION_API_KEY`.
    pub api_key: Option<String>,
    /// The target database from `NOTION_DATABASE_ID`.
    pub database_id: Option<String>,
}

impl NotionConfig {
    /// Notion is usable only with both an API key and a database id.
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some() && self.database_id.is_some()
    }
}

/// Obsidian vault configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ObsidianConfig {
    /// Vault root with `~` already expanded.
    pub vault_path: Option<PathBuf>,
    /// Whether messages are appended to one note per day.
    pub daily_notes: bool,
    /// The folder template under the vault, such as `Inbox/{category}`.
    pub folder_structure: String,
}

impl ObsidianConfig {
    /// Obsidian is usable when the vault directory exists.
    pub fn is_enabled(&self) -> bool {
        self.vault_path.as_deref().map(Path::is_dir).unwrap_or(false)
    }
}

impl Default for ObsidianConfig {
    fn default() -> Self {
        Self {
            vault_path: None,
            daily_notes: true,
            folder_structure: DEFAULT_FOLDER_STRUCTURE.to_string(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize)]
pub struct StorageConfig {
    /// The backend saved to first.
    pub primary: StorageBackend,
    pub notion: NotionConfig,
    pub obsidian: ObsidianConfig,
}

impl StorageConfig {
    /// Whether a specific backend is configured and reachable.
    pub fn is_enabled(&self, backend: StorageBackend) -> bool {
        match backend {
            StorageBackend::Notion => self.notion.is_enabled(),
            StorageBackend::Obsidian => self.obsidian.is_enabled(),
        }
    }

    /// Whether at least one backend can store messages.
    pub fn any_enabled(&self) -> bool {
        self.notion.is_enabled() || self.obsidian.is_enabled()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            primary: StorageBackend::Notion,
            notion: NotionConfig::default(),
            obsidian: ObsidianConfig::default(),
        }
    }
}

/// Processing pipeline configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingConfig {
    /// Number of storage workers draining the processing queue.
    pub concurrency: usize,
    /// Per-message processing deadline in seconds, at least 1.
    pub timeout_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            timeout_secs: 300,
        }
    }
}

/// Feature flags.
#[derive(Debug, Clone, Serialize)]
pub struct FeaturesConfig {
    pub auto_summarize: bool,
    pub auto_classify: bool,
    pub smart_reply: bool,
    pub content_extraction: bool,
    pub ocr_enabled: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            auto_summarize: true,
            auto_classify: true,
            smart_reply: true,
            content_extraction: true,
            ocr_enabled: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Directory for a persistent log file, if any.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            dir: None,
        }
    }
}

/// Liveness endpoint configuration.
#[derive(Debug, Clone, Serialize)]
pub struct HealthConfig {
    /// The port from `HEALTH_PORT`.
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_HEALTH_PORT,
        }
    }
}

/// Complete application settings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Settings {
    /// The bot settings.
    pub telegram: TelegramConfig,
    /// The AI provider settings.
    pub ai: AiConfig,
    /// The storage backend settings.
    pub storage: StorageConfig,
    pub processing: ProcessingConfig,
    pub features: FeaturesConfig,
    pub logging: LoggingConfig,
    pub health: HealthConfig,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// Used by [`Settings::from_env`] and by tests that must not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvSource { lookup };

        let telegram = TelegramConfig {
            bot_token: env.string("TELEGRAM_BOT_TOKEN"),
            admin_users: env.id_list("TELEGRAM_ADMIN_USERS")?,
            allowed_chats: env.id_list("TELEGRAM_ALLOWED_CHATS")?,
            webhook_url: env.string("TELEGRAM_WEBHOOK_URL"),
        };

        let ai = AiConfig {
            provider: env.parse("AI_PROVIDER", AiProviderKind::OpenAi)?,
            openai_endpoint: env.string("OPENAI_ENDPOINT"),
            openai_api_key: env.string("OPENAI_API_KEY"),
            openai_model: env.string_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            openai_embedding_endpoint: env.string("OPENAI_EMBEDDING_ENDPOINT"),
            openai_embedding_api_key: env.string("OPENAI_EMBEDDING_API_KEY"),
            openai_embedding_model: env.string_or("OPENAI_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            anthropic_api_key: env.string("ANTHROPIC_API_KEY"),
            anthropic_model: env.string_or("ANTHROPIC_MODEL", DEFAULT_ANTHROPIC_MODEL),
        };

        let storage = StorageConfig {
            primary: env.parse("STORAGE_PRIMARY", StorageBackend::Notion)?,
            notion: NotionConfig {
                api_key: env.string("NOTION_API_KEY"),
                database_id: env.string("NOTION_DATABASE_ID"),
            },
            obsidian: ObsidianConfig {
                vault_path: env.path("OBSIDIAN_VAULT_PATH"),
                daily_notes: env.flag("OBSIDIAN_DAILY_NOTES", true)?,
                folder_structure: env.string_or("OBSIDIAN_FOLDER_STRUCTURE", DEFAULT_FOLDER_STRUCTURE),
            },
        };

        let processing = ProcessingConfig {
            concurrency: env.parse_number("WORKER_CONCURRENCY", 3usize)?.max(1),
            timeout_secs: env.parse_number("PROCESSING_TIMEOUT", 300u64)?.max(1),
        };

        let features = FeaturesConfig {
            auto_summarize: env.flag("FEATURE_AUTO_SUMMARIZE", true)?,
            auto_classify: env.flag("FEATURE_AUTO_CLASSIFY", true)?,
            smart_reply: env.flag("FEATURE_SMART_REPLY", true)?,
            content_extraction: env.flag("FEATURE_CONTENT_EXTRACTION", true)?,
            ocr_enabled: env.flag("FEATURE_OCR_ENABLED", true)?,
        };

        let logging = LoggingConfig {
            level: env.parse("LOG_LEVEL", LogLevel::Info)?,
            format: env.parse("LOG_FORMAT", LogFormat::Json)?,
            dir: env.path("LOG_DIR"),
        };

        let health = HealthConfig {
            port: env.parse_number("HEALTH_PORT", DEFAULT_HEALTH_PORT)?,
        };

        Ok(Self {
            telegram,
            ai,
            storage,
            processing,
            features,
            logging,
            health,
        })
    }

    /// A copy of the settings with every secret masked, for display.
    pub fn redacted(&self) -> Settings {
        let mut s = self.clone();
        let mask = |v: &mut Option<String>| {
            if let Some(secret) = v.as_mut() {
                *secret = mask_secret(secret);
            }
        };
        mask(&mut s.telegram.bot_token);
        mask(&mut s.ai.openai_api_key);
        mask(&mut s.ai.openai_embedding_api_key);
        mask(&mut s.ai.anthropic_api_key);
        mask(&mut s.storage.notion.api_key);
        s
    }
}

/// Returns `true` for values copied verbatim from the env template.
pub fn is_placeholder(value: &str) -> bool {
    let v = value.trim();
    (v.starts_with("your_") && v.ends_with("_here")) || v.starts_with("/path/to/")
}

/// Mask a secret for logs and `--show-config`.
///
/// Values of 11 characters or fewer are fully hidden; longer values keep the
/// first 4 and last 4 characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 11 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", head, tail)
}

/// Load an env file into the process environment.
///
/// With an explicit path the file must exist. Without one, `.env` in the
/// working directory is loaded when present. Returns the path that was loaded.
pub fn load_env_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            Ok(Some(path.to_path_buf()))
        }
        None => match dotenvy::dotenv() {
            Ok(path) => Ok(Some(path)),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(ConfigError::EnvFile {
                path: PathBuf::from(DEFAULT_ENV_FILE),
                message: e.to_string(),
            }),
        },
    }
}

struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && !is_placeholder(v))
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.string(key).unwrap_or_else(|| default.to_string())
    }

    fn path(&self, key: &str) -> Option<PathBuf> {
        self.string(key)
            .map(|v| PathBuf::from(shellexpand::tilde(&v).into_owned()))
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr<Err = ConfigError>,
    {
        match self.string(key) {
            Some(v) => v.parse(),
            None => Ok(default),
        }
    }

    fn parse_number<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.string(key) {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::invalid(key, &v, "a non-negative integer")),
            None => Ok(default),
        }
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool> {
        let Some(v) = self.string(key) else {
            return Ok(default);
        };
        match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::invalid(key, &v, "a boolean (true/false)")),
        }
    }

    fn id_list(&self, key: &str) -> Result<Vec<i64>> {
        let Some(v) = self.string(key) else {
            return Ok(Vec::new());
        };
        v.trim_matches(|c| c == '[' || c == ']')
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>()
                    .map_err(|_| ConfigError::invalid(key, &v, "comma-separated integer ids"))
            })
            .collect()
    }
}
