//! # Package Storage
//!
//! The registry core talks to storage only through [`PackageStore`], a plain
//! key-value interface with three operations: `get`, `put` and `list`. Keys
//! are canonical `owner/name/version` strings produced by
//! [`crate::keyspace::PackageKey`]; values are the raw package content.
//!
//! Backends guarantee that a single `get` or `put` is atomic. They make no
//! promise about multi-key consistency, and `list` order is whatever the
//! backend naturally produces.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemStore;
pub use memory::MemoryStore;

/// Key-value store holding package content.
#[async_trait]
pub trait PackageStore: Send + Sync {
    /// Short backend identifier reported by the status endpoint.
    fn backend(&self) -> &'static str;

    /// Read the content stored under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Store `content` under `key`, replacing any previous value.
    async fn put(&self, key: &str, content: &str) -> AppResult<()>;

    /// Enumerate every stored key.
    async fn list(&self) -> AppResult<Vec<String>>;

    /// Whether `key` currently holds content.
    async fn contains(&self, key: &str) -> AppResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Which [`PackageStore`] implementation backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    Memory,
}

/// Open the configured backend.
///
/// `data_dir` is only used by the filesystem backend.
pub fn open_store(
    backend: StorageBackend,
    data_dir: &std::path::Path,
) -> AppResult<Arc<dyn PackageStore>> {
    match backend {
        StorageBackend::Filesystem => Ok(Arc::new(FileSystemStore::open(data_dir)?)),
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_deserialize_lowercase() {
        let backend: StorageBackend = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(backend, StorageBackend::Memory);
        let backend: StorageBackend = serde_json::from_str("\"filesystem\"").unwrap();
        assert_eq!(backend, StorageBackend::Filesystem);
        assert!(serde_json::from_str::<StorageBackend>("\"s3\"").is_err());
    }

    #[tokio::test]
    async fn open_store_selects_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_store(StorageBackend::Memory, dir.path()).unwrap();
        assert_eq!(store.backend(), "memory");

        let store = open_store(StorageBackend::Filesystem, dir.path()).unwrap();
        assert_eq!(store.backend(), "filesystem");
        store.put("alice/tool/0.1.0", "hello").await.unwrap();
        assert!(store.contains("alice/tool/0.1.0").await.unwrap());
        assert!(!store.contains("alice/tool/9.9.9").await.unwrap());
    }
}
