//! # Registry Operations
//!
//! The four operations clients can perform on package versions, layered over
//! a [`PackageStore`]:
//!
//! | Operation | Store calls | Result |
//! |---|---|---|
//! | [`Registry::create_version`] | `contains`, then `put` | [`Publication::Created`] or, if the key exists, the update path |
//! | [`Registry::update_version`] | `contains`, then `put` | the new content hash |
//! | [`Registry::get_version`] | `get` | raw content plus serve time |
//! | [`Registry::search_packages`] | `list`, then `get` per match | matching keys with content |
//!
//! Each call is independent. Two concurrent creates for the same absent key
//! may both write; the later write wins.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::error::{AppError, AppResult};
use crate::hash_utils::sha256_hash;
use crate::keyspace::{sanitize, PackageCoordinates, PackageKey};
use crate::storage::PackageStore;

pub const CREATED_MESSAGE: &str = "Package version initialized successfully";
pub const UPDATED_MESSAGE: &str = "Package version updated successfully";

/// A stored version together with the digest of its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    pub key: PackageKey,
    pub content: String,
}

impl PackageVersion {
    /// SHA-256 of the content, recomputed on every call.
    pub fn hash(&self) -> String {
        sha256_hash(self.content.as_bytes())
    }
}

/// Outcome of a publish: whether the key was new or already existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publication {
    Created(WriteReceipt),
    Updated(WriteReceipt),
}

impl Publication {
    pub fn receipt(&self) -> &WriteReceipt {
        match self {
            Publication::Created(receipt) | Publication::Updated(receipt) => receipt,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Publication::Created(_))
    }
}

/// What a successful write reports back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReceipt {
    pub message: String,
    pub owner: String,
    pub name: String,
    pub version: String,
    pub hash: String,
}

impl WriteReceipt {
    fn new(message: &str, version: &PackageVersion) -> Self {
        WriteReceipt {
            message: message.to_string(),
            owner: version.key.owner().to_string(),
            name: version.key.name().to_string(),
            version: version.key.version().to_string(),
            hash: version.hash(),
        }
    }
}

/// Content returned by a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedVersion {
    pub version: PackageVersion,
    /// Milliseconds since the Unix epoch at which the response was produced.
    pub served_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub count: usize,
    pub results: Vec<SearchHit>,
}

/// Package registry over an arbitrary store.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn PackageStore>,
    settings: RegistryConfig,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("backend", &self.store.backend())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Registry {
    pub fn new(store: Arc<dyn PackageStore>, settings: RegistryConfig) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &Arc<dyn PackageStore> {
        &self.store
    }

    fn resolve(&self, coords: &PackageCoordinates) -> AppResult<PackageKey> {
        coords.resolve(&self.settings.default_version)
    }

    /// Publish a version, or update it when the key already holds content.
    ///
    /// A new key gets `content`, falling back to the configured default
    /// content when none is supplied. An existing key is handed to
    /// [`Registry::update_version`] with the same inputs, so publishing over
    /// an existing version without content fails the same way an update would.
    pub async fn create_version(
        &self,
        coords: &PackageCoordinates,
        content: Option<&str>,
    ) -> AppResult<Publication> {
        let key = self.resolve(coords)?;

        if self.store.contains(&key.to_string()).await? {
            debug!(key = %key, "Version exists, publishing as update");
            return self
                .update_version(coords, content)
                .await
                .map(Publication::Updated);
        }

        let content = match content {
            Some(c) if !c.is_empty() => c,
            _ => self.settings.default_content.as_str(),
        };
        self.store.put(&key.to_string(), content).await?;

        let version = PackageVersion {
            key,
            content: content.to_string(),
        };
        let receipt = WriteReceipt::new(CREATED_MESSAGE, &version);
        info!(key = %version.key, hash = %receipt.hash, "Package version created");
        Ok(Publication::Created(receipt))
    }

    /// Overwrite the content of an existing version.
    ///
    /// Never creates a key. Content is checked before storage is touched.
    pub async fn update_version(
        &self,
        coords: &PackageCoordinates,
        new_content: Option<&str>,
    ) -> AppResult<WriteReceipt> {
        let content = match new_content {
            Some(c) if !c.is_empty() => c,
            _ => {
                return Err(AppError::BadRequest(
                    "Missing 'content' field in request body".to_string(),
                ))
            }
        };

        let key = self.resolve(coords)?;
        let storage_key = key.to_string();

        if !self.store.contains(&storage_key).await? {
            return Err(AppError::NotFound(format!(
                "Package version not found: {}",
                key
            )));
        }

        self.store.put(&storage_key, content).await?;

        let version = PackageVersion {
            key,
            content: content.to_string(),
        };
        let receipt = WriteReceipt::new(UPDATED_MESSAGE, &version);
        info!(key = %version.key, hash = %receipt.hash, "Package version updated");
        Ok(receipt)
    }

    /// Read the content of a version.
    pub async fn get_version(&self, coords: &PackageCoordinates) -> AppResult<FetchedVersion> {
        let key = self.resolve(coords)?;
        let content = self
            .store
            .get(&key.to_string())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Package version not found: {}", key)))?;

        debug!(key = %key, size = content.len(), "Package version fetched");
        Ok(FetchedVersion {
            version: PackageVersion { key, content },
            served_at_ms: Utc::now().timestamp_millis(),
        })
    }

    /// Case-insensitive substring search over every stored key.
    ///
    /// `limit` falls back to the configured default when `None`. Results
    /// follow the store's enumeration order and stop at `limit` matches.
    pub async fn search_packages(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> AppResult<SearchResults> {
        let query = sanitize(query);
        let limit = limit.unwrap_or(self.settings.default_search_limit);
        let needle = query.to_lowercase();

        let mut results = Vec::new();
        if limit > 0 {
            for key in self.store.list().await? {
                if !key.to_lowercase().contains(&needle) {
                    continue;
                }
                match self.store.get(&key).await? {
                    Some(value) => results.push(SearchHit { name: key, value }),
                    None => warn!(key = %key, "Key vanished during search, skipping"),
                }
                if results.len() >= limit {
                    break;
                }
            }
        }

        debug!(query = %query, limit, count = results.len(), "Search completed");
        Ok(SearchResults {
            query,
            count: results.len(),
            results,
        })
    }
}
