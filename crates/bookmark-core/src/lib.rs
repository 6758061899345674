//! Bookmark Core - configuration and bootstrap shared by every tg-bookmark crate.
//!
//! - **config**: the runtime [`Settings`] record read from environment variables
//! - **env_file**: `.env` template and first-run materialization
//! - **check**: pre-flight configuration report
//! - **logging**: tracing subscriber initialisation
//! - **setup**: first-run setup wizard

pub mod check;
pub mod config;
pub mod env_file;
pub mod error;
pub mod logging;
pub mod setup;

pub use check::{check_loaded, check_settings, check_settings_with, CheckReport};
pub use config::{
    is_placeholder, load_env_file, mask_secret, AiConfig, AiProviderKind, FeaturesConfig,
    HealthConfig, LogFormat, LogLevel, LoggingConfig, NotionConfig, ObsidianConfig,
    ProcessingConfig, Settings, StorageBackend, StorageConfig, TelegramConfig,
};
pub use env_file::{ensure_env_file, read_env_file, EnvFileOutcome, ENV_TEMPLATE, TEMPLATE_KEYS};
pub use error::{ConfigError, Result};
pub use logging::init_logging;
pub use setup::{run_setup, run_setup_stdout};
