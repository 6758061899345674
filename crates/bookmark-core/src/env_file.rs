//! Environment file bootstrap.
//!
//! The bot reads its configuration from a flat `KEY=VALUE` file with `#`
//! comments. On first setup the file is created either by copying
//! `.env.example` or from the built-in [`ENV_TEMPLATE`]. An existing file is
//! never overwritten.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{ConfigError, Result};

/// Keys written by [`ENV_TEMPLATE`], in file order.
pub const TEMPLATE_KEYS: &[&str] = &[
    "TELEGRAM_BOT_TOKEN",
    "TELEGRAM_ADMIN_USERS",
    "TELEGRAM_ALLOWED_CHATS",
    "AI_PROVIDER",
    "OPENAI_API_KEY",
    "OPENAI_MODEL",
    "ANTHROPIC_API_KEY",
    "STORAGE_PRIMARY",
    "NOTION_API_KEY",
    "NOTION_DATABASE_ID",
    "OBSIDIAN_VAULT_PATH",
    "FEATURE_AUTO_SUMMARIZE",
    "FEATURE_AUTO_CLASSIFY",
    "FEATURE_OCR_ENABLED",
    "LOG_LEVEL",
];

/// Built-in env file template. Credentials carry placeholder values only.
pub const ENV_TEMPLATE: &str = "\
# Telegram Bot Configuration
TELEGRAM_BOT_TOKEN=your_telegram_bot_token_here
# Comma-separated Telegram user ids
TELEGRAM_ADMIN_USERS=
# Comma-separated chat ids; empty allows every chat
TELEGRAM_ALLOWED_CHATS=

# AI Provider Configuration (openai or anthropic)
AI_PROVIDER=openai
OPENAI_API_KEY=your_openai_api_key_here
OPENAI_MODEL=gpt-4o-mini
ANTHROPIC_API_KEY=your_anthropic_api_key_here

# Storage Configuration (notion or obsidian)
STORAGE_PRIMARY=notion
NOTION_API_KEY=your_notion_api_key_here
NOTION_DATABASE_ID=your_notion_database_id_here
OBSIDIAN_VAULT_PATH=/path/to/your/vault

# Features
FEATURE_AUTO_SUMMARIZE=true
FEATURE_AUTO_CLASSIFY=true
FEATURE_OCR_ENABLED=true

# Logging (DEBUG, INFO, WARNING, ERROR)
LOG_LEVEL=INFO
";

/// What [`ensure_env_file`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvFileOutcome {
    /// The file was already present and left untouched.
    AlreadyExists,
    /// The file was copied from the example file.
    CopiedFromExample,
    /// The file was written from the built-in template.
    CreatedFromTemplate,
}

/// Create `env_path` if it does not exist.
///
/// Prefers copying `example_path` when it exists, otherwise writes
/// [`ENV_TEMPLATE`].
pub fn ensure_env_file(env_path: &Path, example_path: &Path) -> Result<EnvFileOutcome> {
    if env_path.exists() {
        return Ok(EnvFileOutcome::AlreadyExists);
    }

    if let Some(parent) = env_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    if example_path.is_file() {
        fs::copy(example_path, env_path)?;
        info!(path = %env_path.display(), example = %example_path.display(), "Created env file from example");
        return Ok(EnvFileOutcome::CopiedFromExample);
    }

    fs::write(env_path, ENV_TEMPLATE)?;
    info!(path = %env_path.display(), "Created env file from template");
    Ok(EnvFileOutcome::CreatedFromTemplate)
}

/// Read the `KEY=VALUE` pairs of an env file with the same parser that
/// loads it at startup. Later keys win.
pub fn read_env_file(path: &Path) -> Result<Vec<(String, String)>> {
    let env_error = |e: dotenvy::Error| ConfigError::EnvFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut pairs: Vec<(String, String)> = Vec::new();
    for item in dotenvy::from_path_iter(path).map_err(env_error)? {
        let (key, value) = item.map_err(env_error)?;
        pairs.retain(|(k, _)| *k != key);
        pairs.push((key, value));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn template_pairs() -> Vec<(String, String)> {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, ENV_TEMPLATE).unwrap();
        read_env_file(&path).unwrap()
    }

    #[test]
    fn test_template_contains_exactly_documented_keys() {
        let keys: Vec<String> = template_pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, TEMPLATE_KEYS.iter().map(|k| k.to_string()).collect::<Vec<_>>());
    }

    #[test]
    fn test_template_credentials_are_placeholders() {
        let pairs = template_pairs();
        for key in [
            "TELEGRAM_BOT_TOKEN",
            "OPENAI_API_KEY",
            "ANTHROPIC_API_KEY",
            "NOTION_API_KEY",
            "NOTION_DATABASE_ID",
            "OBSIDIAN_VAULT_PATH",
        ] {
            let value = &pairs.iter().find(|(k, _)| k == key).unwrap().1;
            assert!(crate::config::is_placeholder(value), "{} = {}", key, value);
        }
    }

    #[test]
    fn test_creates_from_template() {
        let dir = tempdir().unwrap();
        let env = dir.path().join(".env");
        let outcome = ensure_env_file(&env, &dir.path().join(".env.example")).unwrap();
        assert_eq!(outcome, EnvFileOutcome::CreatedFromTemplate);
        assert_eq!(fs::read_to_string(&env).unwrap(), ENV_TEMPLATE);
    }

    #[test]
    fn test_copies_example() {
        let dir = tempdir().unwrap();
        let env = dir.path().join(".env");
        let example = dir.path().join(".env.example");
        fs::write(&example, "TELEGRAM_BOT_TOKEN=x\n").unwrap();
        assert_eq!(ensure_env_file(&env, &example).unwrap(), EnvFileOutcome::CopiedFromExample);
        assert_eq!(fs::read_to_string(&env).unwrap(), "TELEGRAM_BOT_TOKEN=x\n");
    }

    #[test]
    fn test_never_overwrites_existing() {
        let dir = tempdir().unwrap();
        let env = dir.path().join(".env");
        fs::write(&env, "TELEGRAM_BOT_TOKEN=real\n").unwrap();
        assert_eq!(
            ensure_env_file(&env, &dir.path().join(".env.example")).unwrap(),
            EnvFileOutcome::AlreadyExists
        );
        assert_eq!(fs::read_to_string(&env).unwrap(), "TELEGRAM_BOT_TOKEN=real\n");
    }

    #[test]
    fn test_read_env_file_matches_startup_loading() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "# comment\nTGB_A=1 # inline comment\nexport TGB_B=\"x\\ny\"\nTGB_C='3'\nTGB_D=${TGB_A}\n\nTGB_A=4\n",
        )
        .unwrap();

        let pairs = read_env_file(&path).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("TGB_B".to_string(), "x\ny".to_string()),
                ("TGB_C".to_string(), "3".to_string()),
                ("TGB_D".to_string(), "1".to_string()),
                ("TGB_A".to_string(), "4".to_string()),
            ]
        );
    }

    #[test]
    fn test_read_env_file_reports_parse_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "not a pair\n").unwrap();

        assert!(matches!(read_env_file(&path), Err(ConfigError::EnvFile { .. })));
    }
}
