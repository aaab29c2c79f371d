//! HTTP server setup for the package registry.
//!
//! [`build_router`] assembles routes and middleware around an [`AppState`];
//! [`run_server`] binds it and serves until Ctrl-C.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue},
    middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::handlers;
use crate::rate_limit::{self, rate_limit_middleware, RateLimiter};
use crate::state::AppState;

/// Headers attached to every response unless a handler already set them.
const SECURITY_HEADERS: [(HeaderName, &str); 4] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
    (header::REFERRER_POLICY, "no-referrer"),
    (header::X_XSS_PROTECTION, "0"),
];

/// Build the application router using the rate limiter from the state's config.
pub fn build_router(state: Arc<AppState>) -> Router {
    let limiter = rate_limit::from_config(&state.config.limits.rate_limit);
    build_router_with_limiter(state, limiter)
}

/// Build the application router with an explicit rate limiter.
pub fn build_router_with_limiter(state: Arc<AppState>, limiter: Arc<dyn RateLimiter>) -> Router {
    let body_limit = state.config.max_request_body_size_bytes();

    let mut router = Router::new()
        .route("/packages/new", post(handlers::create_package))
        .route("/packages/update", put(handlers::update_package))
        .route("/packages/get", get(handlers::get_package))
        .route("/packages/search", get(handlers::search_packages))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

    for (name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ));
    }

    router.layer(TraceLayer::new_for_http())
}

/// Serve `app` on an already bound listener until `shutdown` resolves.
///
/// Connect info is enabled so the rate limiter can key callers by address.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(addr = %addr, "Registry listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| {
        error!(error = %e, "Server error");
        anyhow::anyhow!("Server error: {}", e)
    })
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    info!("Received shutdown signal, stopping registry gracefully");
}

/// Run the registry in the foreground with the given configuration.
pub async fn run_server(config: Config) -> Result<()> {
    let host = config.server.default_host.clone();
    let port = config.server.default_port;

    info!(
        host = %host,
        port,
        backend = ?config.storage.backend,
        data_dir = %config.storage.default_data_dir.display(),
        rate_limit = config.limits.rate_limit.enabled,
        "Starting Stamper registry"
    );

    let state = AppState::from_config(config).context("Failed to open package storage")?;
    let app = build_router(Arc::new(state));

    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", host, port))?;

    println!("Stamper registry running on http://{}:{}", host, port);
    serve(listener, app, ctrl_c()).await?;
    info!("Registry stopped");
    Ok(())
}
