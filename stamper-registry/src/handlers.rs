//! HTTP handlers for the package endpoints.
//!
//! Handlers only translate between HTTP and [`crate::registry::Registry`]:
//! coordinates come from the query string, content from an optional JSON
//! body, and every failure is an [`AppError`].

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::keyspace::PackageCoordinates;
use crate::registry::{Publication, SearchResults, WriteReceipt};
use crate::state::AppState;

pub const X_TIMESTAMP: HeaderName = HeaderName::from_static("x-timestamp");
pub const X_SENT: HeaderName = HeaderName::from_static("x-sent");

/// Optional JSON body carried by publish and update requests.
#[derive(Debug, Default, Deserialize)]
struct ContentBody {
    #[serde(default)]
    content: Option<String>,
}

/// Parse a request body leniently: empty means no content, anything else
/// must be a JSON object with an optional string `content` field.
fn parse_content(body: &Bytes) -> AppResult<Option<String>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let parsed: ContentBody = serde_json::from_slice(body)?;
    Ok(parsed.content)
}

fn coordinates(
    query: Result<Query<PackageCoordinates>, QueryRejection>,
) -> AppResult<PackageCoordinates> {
    query
        .map(|Query(coords)| coords)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// `POST /packages/new`
pub async fn create_package(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PackageCoordinates>, QueryRejection>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<WriteReceipt>)> {
    let coords = coordinates(query)?;
    let content = parse_content(&body)?;

    let publication = state
        .registry
        .create_version(&coords, content.as_deref())
        .await?;

    Ok(match publication {
        Publication::Created(receipt) => (StatusCode::CREATED, Json(receipt)),
        Publication::Updated(receipt) => (StatusCode::OK, Json(receipt)),
    })
}

/// `PUT /packages/update`
pub async fn update_package(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PackageCoordinates>, QueryRejection>,
    body: Bytes,
) -> AppResult<Json<WriteReceipt>> {
    let coords = coordinates(query)?;
    let content = parse_content(&body)?;

    let receipt = state
        .registry
        .update_version(&coords, content.as_deref())
        .await?;
    Ok(Json(receipt))
}

/// `GET /packages/get`
///
/// Responds with the raw content as `text/plain`.
pub async fn get_package(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PackageCoordinates>, QueryRejection>,
) -> AppResult<Response> {
    let coords = coordinates(query)?;
    let fetched = state.registry.get_version(&coords).await?;

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        ),
        (X_TIMESTAMP, HeaderValue::from(fetched.served_at_ms)),
        (X_SENT, HeaderValue::from_static("true")),
    ];
    Ok((StatusCode::OK, headers, fetched.version.content).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
    /// Kept as text so a non-numeric limit falls back to the default.
    #[serde(default)]
    pub limit: Option<String>,
}

/// `GET /packages/search`
pub async fn search_packages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchResults>> {
    let query = params.q.unwrap_or_default();
    let limit = params
        .limit
        .as_deref()
        .and_then(|raw| raw.trim().parse::<usize>().ok());

    let results = state.registry.search_packages(&query, limit).await?;
    Ok(Json(results))
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub storage_backend: &'static str,
    pub package_versions: usize,
}

/// `GET /status`
pub async fn status(State(state): State<Arc<AppState>>) -> AppResult<Json<StatusResponse>> {
    let store = state.registry.store();
    let package_versions = store.list().await?.len();
    info!(backend = store.backend(), package_versions, "Status requested");

    Ok(Json(StatusResponse {
        status: "ok",
        service: "stamper-registry",
        version: env!("CARGO_PKG_VERSION"),
        storage_backend: store.backend(),
        package_versions,
    }))
}
