//! Tracing subscriber setup.
//!
//! Only the workspace's own crates log at the configured level; teloxide is
//! held at `warn` so polling noise stays out of the output. `RUST_LOG`
//! overrides the computed filter entirely.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LogLevel};
use crate::error::{ConfigError, Result};

/// Crates whose logs are shown at the configured level.
const PROJECT_TARGETS: &[&str] = &[
    "bookmark_core",
    "bookmark_ai",
    "bookmark_extract",
    "bookmark_storage",
    "bookmark_telegram",
    "tg_bookmark",
];

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "tg-bookmark.log";

/// Build the filter directive string for a level.
pub fn filter_directives(level: LogLevel) -> String {
    let mut parts: Vec<String> = PROJECT_TARGETS
        .iter()
        .map(|t| format!("{}={}", t, level.as_directive()))
        .collect();
    parts.push("teloxide=warn".to_string());
    parts.push("warn".to_string());
    parts.join(",")
}

/// Install the global subscriber.
///
/// When `log_dir` is set, output is also appended to
/// `<log_dir>/tg-bookmark.log`.
pub fn init_logging(level: LogLevel, format: LogFormat, log_dir: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directives(level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let writer = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(LOG_FILE_NAME))?;
            BoxMakeWriter::new(io::stdout.and(Arc::new(file)))
        }
        None => BoxMakeWriter::new(io::stdout),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives() {
        let directives = filter_directives(LogLevel::Warning);
        assert!(directives.contains("bookmark_telegram=warn"));
        assert!(directives.contains("teloxide=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_debug_directives() {
        assert!(filter_directives(LogLevel::Debug).contains("bookmark_ai=debug"));
    }
}
