//! Bookmark Storage - where processed messages end up.
//!
//! Backends implement the async [`Storage`] trait:
//!
//! - [`NotionStorage`]: one page per message in a Notion database
//! - [`ObsidianStorage`]: Markdown notes in a local vault
//!
//! [`StorageFactory`] builds the configured backends, primary first.

pub mod atomic;
pub mod error;
pub mod factory;
pub mod notion;
pub mod obsidian;
pub mod record;
pub mod store;

pub use error::{Result, StorageError};
pub use factory::StorageFactory;
pub use notion::NotionStorage;
pub use obsidian::{ObsidianStorage, SectionKey};
pub use record::{MessageMetadata, ProcessedMessage, RecordUpdate, StoredEntry};
pub use store::Storage;
