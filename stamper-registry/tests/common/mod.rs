//! Shared setup for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use stamper_registry::config::Config;
use stamper_registry::rate_limit::{RateLimiter, Unlimited};
use stamper_registry::server::build_router_with_limiter;
use stamper_registry::storage::{FileSystemStore, MemoryStore, PackageStore};
use stamper_registry::AppState;
use tempfile::TempDir;

/// A test server plus whatever must outlive it.
pub struct TestSetup {
    pub server: TestServer,
    pub store: Arc<dyn PackageStore>,
    pub temp_dir: Option<TempDir>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.limits.rate_limit.enabled = false;
    config
}

fn build(store: Arc<dyn PackageStore>, config: Config, limiter: Arc<dyn RateLimiter>) -> TestServer {
    let state = Arc::new(AppState::with_store(store, config));
    let app = build_router_with_limiter(state, limiter);
    TestServer::new(app).expect("Failed to create test server")
}

/// Registry backed by memory, without rate limiting.
pub fn memory_server() -> TestSetup {
    let store: Arc<dyn PackageStore> = Arc::new(MemoryStore::new());
    TestSetup {
        server: build(store.clone(), test_config(), Arc::new(Unlimited)),
        store,
        temp_dir: None,
    }
}

/// Registry backed by a temporary directory, without rate limiting.
pub fn filesystem_server() -> TestSetup {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store: Arc<dyn PackageStore> = Arc::new(
        FileSystemStore::open(temp_dir.path().join("packages")).expect("Failed to open store"),
    );
    TestSetup {
        server: build(store.clone(), test_config(), Arc::new(Unlimited)),
        store,
        temp_dir: Some(temp_dir),
    }
}

/// Registry with a caller-supplied limiter and config.
pub fn server_with(config: Config, limiter: Arc<dyn RateLimiter>) -> TestSetup {
    let store: Arc<dyn PackageStore> = Arc::new(MemoryStore::new());
    TestSetup {
        server: build(store.clone(), config, limiter),
        store,
        temp_dir: None,
    }
}
