//! Pre-flight configuration check.
//!
//! Produces a [`CheckReport`] describing which credentials are present, which
//! backends are usable, and anything that would stop the bot from starting.
//! Missing credentials are reported, never raised.

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::config::{AiProviderKind, Settings, StorageBackend};
use crate::error::ConfigError;

/// External programs the bot can use at runtime.
pub const OCR_BINARY: &str = "tesseract";

/// Outcome of a configuration check.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    /// Problems that prevent the bot from running.
    pub errors: Vec<String>,
    /// Problems that degrade functionality.
    pub warnings: Vec<String>,
    /// Presence lines (label, value) for display.
    pub summary: Vec<(String, String)>,
}

impl CheckReport {
    /// `true` when no errors were found.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Render the report as human readable text.
    pub fn render(&self) -> String {
        let mut out = String::new();

        for (label, value) in &self.summary {
            let _ = writeln!(out, "   {}: {}", label, value);
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out, "\n❌ Configuration errors found:");
            for error in &self.errors {
                let _ = writeln!(out, "   - {}", error);
            }
        }

        if !self.warnings.is_empty() {
            let _ = writeln!(out, "\n⚠️  Configuration warnings:");
            for warning in &self.warnings {
                let _ = writeln!(out, "   - {}", warning);
            }
        }

        if self.is_ok() {
            let _ = writeln!(out, "\n✅ Configuration validated successfully");
        } else {
            let _ = writeln!(out, "\nPlease check your .env file");
        }

        out
    }
}

/// Check the result of loading settings, reporting parse failures as errors.
pub fn check_loaded(loaded: &std::result::Result<Settings, ConfigError>) -> CheckReport {
    match loaded {
        Ok(settings) => check_settings(settings),
        Err(e) => CheckReport {
            errors: vec![e.to_string()],
            ..Default::default()
        },
    }
}

/// Check settings, looking up runtime tools on `PATH`.
pub fn check_settings(settings: &Settings) -> CheckReport {
    check_settings_with(settings, |name| which::which(name).ok())
}

/// Check settings with an injectable tool lookup.
pub fn check_settings_with<F>(settings: &Settings, find_tool: F) -> CheckReport
where
    F: Fn(&str) -> Option<PathBuf>,
{
    let mut report = CheckReport::default();
    let ai = &settings.ai;
    let storage = &settings.storage;

    let token_present = settings.telegram.bot_token.is_some();
    report.summary.push((
        "Telegram token".to_string(),
        presence(token_present).to_string(),
    ));
    report.summary.push((
        "AI Provider".to_string(),
        format!("{} (API key {})", ai.provider, presence(ai.selected_key_present())),
    ));
    report.summary.push((
        "Storage".to_string(),
        format!(
            "{} ({})",
            storage.primary,
            if storage.is_enabled(storage.primary) { "enabled" } else { "not configured" }
        ),
    ));
    report.summary.push(("Notion".to_string(), enabled(storage.notion.is_enabled()).to_string()));
    report.summary.push(("Obsidian".to_string(), enabled(storage.obsidian.is_enabled()).to_string()));

    if !token_present {
        report.errors.push("TELEGRAM_BOT_TOKEN is not set".to_string());
    }

    if !ai.has_any_key() {
        report
            .errors
            .push("Either OPENAI_API_KEY or ANTHROPIC_API_KEY must be set".to_string());
    } else if !ai.selected_key_present() {
        let (key, other) = match ai.provider {
            AiProviderKind::OpenAi => ("OPENAI_API_KEY", "anthropic"),
            AiProviderKind::Anthropic => ("ANTHROPIC_API_KEY", "openai"),
        };
        report.warnings.push(format!(
            "AI_PROVIDER is {} but {} is missing; set AI_PROVIDER={} to use the configured key",
            ai.provider, key, other
        ));
    }

    match storage.primary {
        StorageBackend::Notion if !storage.notion.is_enabled() => report.warnings.push(
            "Notion is set as primary storage but NOTION_API_KEY or NOTION_DATABASE_ID is missing"
                .to_string(),
        ),
        StorageBackend::Obsidian if !storage.obsidian.is_enabled() => report.warnings.push(
            "Obsidian is set as primary storage but OBSIDIAN_VAULT_PATH is missing or invalid"
                .to_string(),
        ),
        _ => {}
    }

    if !storage.any_enabled() {
        report.warnings.push(
            "No storage is configured. The bot will only process and display results, not save them."
                .to_string(),
        );
    }

    if settings.features.ocr_enabled {
        match find_tool(OCR_BINARY) {
            Some(path) => report
                .summary
                .push(("OCR".to_string(), format!("{} ({})", OCR_BINARY, path.display()))),
            None => {
                report.summary.push(("OCR".to_string(), "unavailable".to_string()));
                report.warnings.push(format!(
                    "FEATURE_OCR_ENABLED is on but `{}` was not found on PATH; image text will not be extracted",
                    OCR_BINARY
                ));
            }
        }
    } else {
        report.summary.push(("OCR".to_string(), "disabled".to_string()));
    }

    report
}

fn presence(present: bool) -> &'static str {
    if present {
        "present"
    } else {
        "missing"
    }
}

fn enabled(on: bool) -> &'static str {
    if on {
        "Enabled"
    } else {
        "Disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        Settings::from_lookup(|k| map.get(k).map(|v| v.to_string())).unwrap()
    }

    fn no_tools(_: &str) -> Option<PathBuf> {
        None
    }

    #[test]
    fn test_empty_environment_reports_missing_credentials() {
        let report = check_settings_with(&settings_from(&[]), no_tools);
        assert!(!report.is_ok());
        assert!(report.errors.iter().any(|e| e.contains("TELEGRAM_BOT_TOKEN")));
        assert!(report.errors.iter().any(|e| e.contains("OPENAI_API_KEY")));
        let token = report.summary.iter().find(|(l, _)| l == "Telegram token").unwrap();
        assert_eq!(token.1, "missing");
        assert!(report.render().contains("Configuration errors found"));
    }

    #[test]
    fn test_minimal_valid_config_has_storage_warnings() {
        let report = check_settings_with(
            &settings_from(&[("TELEGRAM_BOT_TOKEN", "1:a"), ("OPENAI_API_KEY", "sk-test")]),
            no_tools,
        );
        assert!(report.is_ok());
        assert!(report.warnings.iter().any(|w| w.contains("Notion is set as primary")));
        assert!(report.warnings.iter().any(|w| w.contains("No storage is configured")));
        assert!(report.warnings.iter().any(|w| w.contains("tesseract")));
    }

    #[test]
    fn test_mismatched_provider_warns() {
        let report = check_settings_with(
            &settings_from(&[
                ("TELEGRAM_BOT_TOKEN", "1:a"),
                ("AI_PROVIDER", "openai"),
                ("ANTHROPIC_API_KEY", "sk-ant"),
            ]),
            no_tools,
        );
        assert!(report.is_ok());
        assert!(report.warnings.iter().any(|w| w.contains("AI_PROVIDER=anthropic")));
    }

    #[test]
    fn test_fully_configured_has_no_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path().to_string_lossy().to_string();
        let report = check_settings_with(
            &settings_from(&[
                ("TELEGRAM_BOT_TOKEN", "1:a"),
                ("OPENAI_API_KEY", "sk-test"),
                ("STORAGE_PRIMARY", "obsidian"),
                ("OBSIDIAN_VAULT_PATH", &vault),
            ]),
            |_| Some(PathBuf::from("/usr/bin/tesseract")),
        );
        assert!(report.is_ok());
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert!(report.render().contains("validated successfully"));
    }

    #[test]
    fn test_parse_failure_is_reported() {
        let loaded = Settings::from_lookup(|k| (k == "STORAGE_PRIMARY").then(|| "s3".to_string()));
        let report = check_loaded(&loaded);
        assert!(!report.is_ok());
        assert!(report.errors[0].contains("STORAGE_PRIMARY"));
    }
}
