//! # Stamper Registry
//!
//! A minimal package registry: clients publish versioned content blobs under
//! `owner/name/version` keys, then fetch or search them.
//!
//! ## Key Modules
//!
//! - [`keyspace`]: sanitization and canonical package keys
//! - [`registry`]: create, update, fetch and search over a store
//! - [`storage`]: the key-value store trait and its backends
//! - [`rate_limit`]: per-caller request limiting for the HTTP layer
//! - [`server`]: router assembly and serving
//! - [`client`]: HTTP client used by the CLI
//! - [`config`]: configuration with embedded defaults
//! - [`error`]: error taxonomy and HTTP mapping
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stamper_registry::{keyspace::PackageCoordinates, storage::MemoryStore, Registry};
//! use stamper_registry::config::RegistryConfig;
//!
//! # async fn demo() -> stamper_registry::AppResult<()> {
//! let registry = Registry::new(Arc::new(MemoryStore::new()), RegistryConfig::default());
//! let coords = PackageCoordinates::new("alice", "tool");
//! registry.create_version(&coords, Some("hello")).await?;
//! let fetched = registry.get_version(&coords).await?;
//! assert_eq!(fetched.version.content, "hello");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hash_utils;
pub mod keyspace;
pub mod rate_limit;
pub mod registry;
pub mod server;
pub mod state;
pub mod storage;

pub use client::RegistryClient;
pub use config::Config;
pub use error::{ApiErrorResponse, AppError, AppResult, ErrorCode};
pub use hash_utils::sha256_hash;
pub use keyspace::{sanitize, PackageCoordinates, PackageKey};
pub use registry::{Publication, Registry, SearchResults, WriteReceipt};
pub use server::{build_router, run_server};
pub use state::AppState;
pub use storage::{PackageStore, StorageBackend};
