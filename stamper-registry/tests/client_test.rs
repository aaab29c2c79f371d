//! End-to-end tests: a real listener served with `server::serve`, driven by
//! `RegistryClient`.

use std::sync::Arc;

use stamper_registry::keyspace::PackageCoordinates;
use stamper_registry::rate_limit::Unlimited;
use stamper_registry::server::{build_router_with_limiter, serve};
use stamper_registry::storage::MemoryStore;
use stamper_registry::{AppState, RegistryClient};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

mod common;
use common::test_config;

struct RunningServer {
    client: RegistryClient,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<anyhow::Result<()>>,
}

async fn start_server() -> RunningServer {
    let state = Arc::new(AppState::with_store(
        Arc::new(MemoryStore::new()),
        test_config(),
    ));
    let app = build_router_with_limiter(state, Arc::new(Unlimited));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown, shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(serve(listener, app, async {
        shutdown_rx.await.ok();
    }));

    RunningServer {
        client: RegistryClient::new(format!("http://{}", addr)),
        shutdown,
        handle,
    }
}

impl RunningServer {
    async fn stop(self) {
        self.shutdown.send(()).ok();
        self.handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_client_round_trip() {
    let server = start_server().await;
    let client = &server.client;
    let coords = PackageCoordinates::new("alice", "tool");

    let outcome = client.publish(&coords, Some("hello")).await.unwrap();
    assert!(outcome.created);
    assert_eq!(outcome.receipt.version, "0.1.0");
    assert_eq!(
        outcome.receipt.hash,
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );

    let outcome = client.publish(&coords, Some("again")).await.unwrap();
    assert!(!outcome.created);

    let receipt = client.update(&coords, "hello").await.unwrap();
    assert_eq!(receipt.message, "Package version updated successfully");

    let fetched = client.get(&coords).await.unwrap();
    assert_eq!(fetched.content, "hello");
    assert!(fetched.timestamp.is_some());

    let results = client.search("too", Some(5)).await.unwrap();
    assert_eq!(results.count, 1);
    assert_eq!(results.results[0].name, "alice/tool/0.1.0");

    let status = client.status().await.unwrap();
    assert_eq!(status["package_versions"], 1);

    server.stop().await;
}

#[tokio::test]
async fn test_client_reports_server_errors() {
    let server = start_server().await;
    let coords = PackageCoordinates::new("alice", "missing");

    let err = server.client.update(&coords, "x").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("404"), "unexpected error: {}", message);
    assert!(message.contains("Package version not found"));

    let err = server.client.get(&coords).await.unwrap_err();
    assert!(err.to_string().contains("404"));

    server.stop().await;
}
