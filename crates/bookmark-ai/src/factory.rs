//! Provider construction from settings.

use std::sync::Arc;

use bookmark_core::{AiConfig, AiProviderKind};
use tracing::info;

use crate::anthropic::AnthropicProvider;
use crate::error::Result;
use crate::openai::OpenAiProvider;
use crate::provider::AiProvider;

/// Create the provider named by `kind`, or the configured one when `None`.
pub fn create_provider(config: &AiConfig, kind: Option<AiProviderKind>) -> Result<Arc<dyn AiProvider>> {
    let kind = kind.unwrap_or(config.provider);
    let provider: Arc<dyn AiProvider> = match kind {
        AiProviderKind::OpenAi => Arc::new(OpenAiProvider::from_config(config)?),
        AiProviderKind::Anthropic => Arc::new(AnthropicProvider::from_config(config)?),
    };
    info!(provider = provider.name(), "AI provider ready");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;

    #[test]
    fn test_selects_configured_provider() {
        let cfg = AiConfig {
            provider: AiProviderKind::Anthropic,
            anthropic_api_key: Some("sk-ant".into()),
            ..Default::default()
        };
        assert_eq!(create_provider(&cfg, None).unwrap().name(), "anthropic");
    }

    #[test]
    fn test_override_without_key_fails() {
        let cfg = AiConfig {
            provider: AiProviderKind::Anthropic,
            anthropic_api_key: Some("sk-ant".into()),
            ..Default::default()
        };
        let err = create_provider(&cfg, Some(AiProviderKind::OpenAi)).err().unwrap();
        assert!(matches!(err, AiError::Configuration(_)));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_ready_is_logged_once_per_provider() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let cfg = AiConfig {
            provider: AiProviderKind::Anthropic,
            anthropic_api_key: Some("sk-ant".into()),
            ..Default::default()
        };

        tracing::subscriber::with_default(subscriber, || create_provider(&cfg, None).unwrap());

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("AI provider ready").count(), 1);
        assert!(output.contains("provider=\"anthropic\""));
    }
}
