use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::storage::PackageStore;

/// In-memory store backed by a sorted map.
///
/// Intended for tests and throwaway servers started with `--memory`. Keys
/// are listed in lexicographic order.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> AppError {
    AppError::InternalError("memory store lock poisoned".to_string())
}

#[async_trait]
impl PackageStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let map = self.entries.read().map_err(|_| poisoned())?;
        Ok(map.get(key).cloned())
    }

    async fn put(&self, key: &str, content: &str) -> AppResult<()> {
        let mut map = self.entries.write().map_err(|_| poisoned())?;
        map.insert(key.to_string(), content.to_string());
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<String>> {
        let map = self.entries.read().map_err(|_| poisoned())?;
        Ok(map.keys().cloned().collect())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("key_count", &self.len())
            .finish()
    }
}
