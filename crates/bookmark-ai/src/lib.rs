//! Bookmark AI - language model access for tg-bookmark.
//!
//! - [`AiProvider`]: async completion/embedding trait
//! - [`OpenAiProvider`] and [`AnthropicProvider`]: HTTP clients
//! - [`MessageSummarizer`] and [`ContentClassifier`]: prompts built on a provider

pub mod anthropic;
pub mod classifier;
pub mod error;
pub mod factory;
pub mod json;
pub mod openai;
pub mod provider;
pub mod summarizer;

pub use anthropic::AnthropicProvider;
pub use classifier::{best_category, ContentClassifier, CATEGORIES, DEFAULT_CATEGORY, DEFAULT_KEYWORD_COUNT};
pub use error::{AiError, Result};
pub use factory::create_provider;
pub use openai::OpenAiProvider;
pub use provider::{AiProvider, CompletionOptions};
pub use summarizer::{MessageSummarizer, DEFAULT_SUMMARY_LENGTH};
