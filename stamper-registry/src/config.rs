//! # Configuration Management
//!
//! Server configuration is a JSON document with four sections:
//!
//! - [`ServerConfig`]: bind host and port
//! - [`StorageConfig`]: which backend to use and where it keeps its data
//! - [`RegistryConfig`]: defaults applied by the registry operations
//! - [`LimitsConfig`]: request body cap and rate limiting
//!
//! The defaults ship inside the binary (`config.json` at the crate root), so
//! a config file only needs the values it wants to change:
//!
//! ```rust,no_run
//! # use stamper_registry::config::Config;
//! let config = Config::load_or_default("stamper.json")?;
//! # Ok::<(), stamper_registry::AppError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::keyspace::DEFAULT_VERSION;
use crate::storage::StorageBackend;

/// Main configuration structure for the registry server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Network settings for the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host/IP address to bind to
    pub default_host: String,
    /// Port number to listen on
    pub default_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            default_host: "0.0.0.0".to_string(),
            default_port: 3000,
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory of the filesystem backend
    pub default_data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StorageBackend::Filesystem,
            default_data_dir: PathBuf::from("./packages"),
        }
    }
}

/// Defaults used by the registry operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Version assumed when a request omits one; shared by create, update and fetch
    pub default_version: String,
    /// Content written when a new version is published without a body
    pub default_content: String,
    /// Number of search results returned when no usable limit is given
    pub default_search_limit: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            default_version: DEFAULT_VERSION.to_string(),
            default_content: "default package content".to_string(),
            default_search_limit: 10,
        }
    }
}

/// Request limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_request_body_size_mb: usize,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_request_body_size_mb: 10,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Fixed-window rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests allowed per caller within one window
    pub requests_per_window: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            enabled: true,
            requests_per_window: 30,
            window_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// Sections missing from the file fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not valid JSON, or describes
    /// an unusable configuration (see [`Config::validate`]).
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config_str = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with fallback to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.server.default_host.trim().is_empty() {
            return Err(AppError::Config(
                "server.default_host cannot be empty".to_string(),
            ));
        }
        if self.registry.default_version.is_empty() {
            return Err(AppError::Config(
                "registry.default_version cannot be empty".to_string(),
            ));
        }
        if crate::keyspace::sanitize(&self.registry.default_version)
            != self.registry.default_version
        {
            return Err(AppError::Config(format!(
                "registry.default_version '{}' contains characters outside [A-Za-z0-9_.-]",
                self.registry.default_version
            )));
        }
        if self.limits.max_request_body_size_mb == 0 {
            return Err(AppError::Config(
                "limits.max_request_body_size_mb must be > 0".to_string(),
            ));
        }
        let rate = &self.limits.rate_limit;
        if rate.enabled && (rate.requests_per_window == 0 || rate.window_secs == 0) {
            return Err(AppError::Config(
                "limits.rate_limit needs requests_per_window > 0 and window_secs > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the maximum request body size in bytes.
    pub fn max_request_body_size_bytes(&self) -> usize {
        self.limits.max_request_body_size_mb * 1024 * 1024
    }
}

impl Default for Config {
    fn default() -> Self {
        serde_json::from_str(include_str!("../config.json"))
            .expect("Failed to parse embedded config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn embedded_defaults() {
        let config = Config::default();
        assert_eq!(config.server.default_port, 3000);
        assert_eq!(config.storage.backend, StorageBackend::Filesystem);
        assert_eq!(config.registry.default_version, "0.1.0");
        assert_eq!(config.registry.default_content, "default package content");
        assert_eq!(config.registry.default_search_limit, 10);
        assert!(config.limits.rate_limit.enabled);
        assert_eq!(config.limits.rate_limit.requests_per_window, 30);
        assert_eq!(config.limits.rate_limit.window_secs, 60);
        config.validate().unwrap();
    }

    #[test]
    fn embedded_defaults_match_code_defaults() {
        let embedded = Config::default();
        assert_eq!(
            embedded.registry.default_version,
            RegistryConfig::default().default_version
        );
        assert_eq!(
            embedded.server.default_port,
            ServerConfig::default().default_port
        );
    }

    #[test]
    fn load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stamper.json");
        fs::write(
            &path,
            r#"{"storage": {"backend": "memory", "default_data_dir": "/srv/pkgs"},
                "limits": {"max_request_body_size_mb": 1,
                           "rate_limit": {"enabled": false, "requests_per_window": 5, "window_secs": 1}}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.default_data_dir, PathBuf::from("/srv/pkgs"));
        assert!(!config.limits.rate_limit.enabled);
        assert_eq!(config.max_request_body_size_bytes(), 1024 * 1024);
        // Untouched sections keep their defaults.
        assert_eq!(config.server.default_port, 3000);
        assert_eq!(config.registry.default_version, "0.1.0");
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(dir.path().join("missing.json")).unwrap();
        assert_eq!(config.server.default_port, 3000);
    }

    #[test]
    fn load_rejects_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ server: ").unwrap();
        assert!(matches!(Config::load(&path), Err(AppError::Json(_))));
    }

    #[test]
    fn validate_rejects_unsafe_default_version() {
        let mut config = Config::default();
        config.registry.default_version = "v 1".to_string();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.registry.default_version = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.limits.rate_limit.window_secs = 0;
        assert!(config.validate().is_err());

        config.limits.rate_limit.enabled = false;
        assert!(config.validate().is_ok());

        config.limits.max_request_body_size_mb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_host() {
        let mut config = Config::default();
        config.server.default_host = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(!err.is_client_error());
    }
}
