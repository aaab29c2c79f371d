//! # Application State
//!
//! [`AppState`] is built once at startup and shared by every handler behind
//! an `Arc`. It holds the [`Registry`] and the configuration it was built
//! from.
//!
//! ```rust,no_run
//! use stamper_registry::{config::Config, state::AppState};
//!
//! let state = AppState::from_config(Config::default())?;
//! # Ok::<(), stamper_registry::AppError>(())
//! ```

use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::registry::Registry;
use crate::storage::{open_store, PackageStore};

/// Shared state for all request handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub registry: Registry,
    pub config: Arc<Config>,
}

impl AppState {
    /// Open the configured storage backend and build the registry on top of it.
    pub fn from_config(config: Config) -> AppResult<Self> {
        let store = open_store(config.storage.backend, &config.storage.default_data_dir)?;
        Ok(Self::with_store(store, config))
    }

    /// Build state around an already opened store.
    pub fn with_store(store: Arc<dyn PackageStore>, config: Config) -> Self {
        let registry = Registry::new(store, config.registry.clone());
        AppState {
            registry,
            config: Arc::new(config),
        }
    }
}
