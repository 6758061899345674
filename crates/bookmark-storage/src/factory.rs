//! Backend construction from settings.

use std::sync::Arc;

use bookmark_core::{StorageBackend, StorageConfig};
use tracing::{info, warn};

use crate::error::Result;
use crate::notion::NotionStorage;
use crate::obsidian::ObsidianStorage;
use crate::store::Storage;

/// Creates storage backends from [`StorageConfig`].
#[derive(Debug, Clone)]
pub struct StorageFactory {
    config: StorageConfig,
}

impl StorageFactory {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Create one backend.
    pub fn create(&self, backend: StorageBackend) -> Result<Arc<dyn Storage>> {
        Ok(match backend {
            StorageBackend::Notion => Arc::new(NotionStorage::from_config(&self.config.notion)?),
            StorageBackend::Obsidian => Arc::new(ObsidianStorage::from_config(&self.config.obsidian)?),
        })
    }

    /// Backends to write to, in order.
    pub fn backend_order(&self) -> Vec<StorageBackend> {
        let mut order = vec![self.config.primary];
        for backend in [StorageBackend::Notion, StorageBackend::Obsidian] {
            if backend != self.config.primary && self.config.is_enabled(backend) {
                order.push(backend);
            }
        }
        order
    }

    /// Every backend that can be constructed, primary first.
    ///
    /// Backends that fail to construct are logged and skipped.
    pub fn all_storages(&self) -> Vec<Arc<dyn Storage>> {
        self.backend_order()
            .into_iter()
            .filter_map(|backend| match self.create(backend) {
                Ok(storage) => {
                    info!(backend = %backend, "Storage ready");
                    Some(storage)
                }
                Err(e) => {
                    warn!(backend = %backend, error = %e, "Failed to create storage");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookmark_core::{NotionConfig, ObsidianConfig};
    use tempfile::tempdir;

    fn config(primary: StorageBackend, notion: bool, vault: Option<&std::path::Path>) -> StorageConfig {
        StorageConfig {
            primary,
            notion: NotionConfig {
                api_key: notion.then(|| "secret_key".to_string()),
                database_id: notion.then(|| "db".to_string()),
            },
            obsidian: ObsidianConfig {
                vault_path: vault.map(|p| p.to_path_buf()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_primary_first_without_duplicates() {
        let dir = tempdir().unwrap();
        let factory = StorageFactory::new(config(StorageBackend::Obsidian, true, Some(dir.path())));
        assert_eq!(
            factory.backend_order(),
            vec![StorageBackend::Obsidian, StorageBackend::Notion]
        );

        let storages = factory.all_storages();
        let kinds: Vec<_> = storages.iter().map(|s| s.backend()).collect();
        assert_eq!(kinds, vec![StorageBackend::Obsidian, StorageBackend::Notion]);
    }

    #[test]
    fn test_unconfigured_primary_is_skipped() {
        let dir = tempdir().unwrap();
        let factory = StorageFactory::new(config(StorageBackend::Notion, false, Some(dir.path())));
        let kinds: Vec<_> = factory.all_storages().iter().map(|s| s.backend()).collect();
        assert_eq!(kinds, vec![StorageBackend::Obsidian]);
    }

    #[test]
    fn test_nothing_configured() {
        let factory = StorageFactory::new(config(StorageBackend::Notion, false, None));
        assert!(factory.all_storages().is_empty());
        assert!(factory.create(StorageBackend::Obsidian).is_err());
    }
}
