//! Storage trait implemented by every backend.

use async_trait::async_trait;
use bookmark_core::StorageBackend;

use crate::error::Result;
use crate::record::{ProcessedMessage, RecordUpdate, StoredEntry};

/// A knowledge base that processed messages are written to.
///
/// Entry ids are opaque strings issued by [`Storage::save`]: Notion page ids
/// or vault file paths.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Which backend this is.
    fn backend(&self) -> StorageBackend;

    /// Store a message and return its entry id.
    async fn save(&self, message: &ProcessedMessage) -> Result<String>;

    /// Read an entry back.
    async fn get(&self, id: &str) -> Result<StoredEntry>;

    /// Change fields of an entry. Returns `false` when the entry is gone.
    async fn update(&self, id: &str, update: &RecordUpdate) -> Result<bool>;

    /// Remove an entry. Returns `false` when the entry is gone.
    async fn delete(&self, id: &str) -> Result<bool>;
}
