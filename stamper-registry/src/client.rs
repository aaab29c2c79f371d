//! HTTP client for a running registry, used by the CLI subcommands.

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::keyspace::PackageCoordinates;
use crate::registry::{SearchResults, WriteReceipt};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

#[derive(Serialize)]
struct ContentPayload<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct SearchParams<'a> {
    q: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
}

/// Result of a publish call.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    /// `true` when the server created the version, `false` when it updated it.
    pub created: bool,
    pub receipt: WriteReceipt,
}

/// Content returned by a fetch, with the server's response headers.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub content: String,
    pub timestamp: Option<i64>,
}

/// Thin wrapper over `reqwest` for the registry endpoints.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: String,
    http: Client,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn publish(
        &self,
        coords: &PackageCoordinates,
        content: Option<&str>,
    ) -> Result<PublishOutcome> {
        let mut request = self.http.post(self.url("/packages/new")).query(coords);
        if let Some(content) = content {
            request = request.json(&ContentPayload { content });
        }
        let response = request
            .send()
            .await
            .context("Failed to send publish request to registry")?;

        let created = response.status() == reqwest::StatusCode::CREATED;
        let response = check_status(response, "publish").await?;
        let receipt = response
            .json()
            .await
            .context("Failed to parse publish response")?;
        Ok(PublishOutcome { created, receipt })
    }

    pub async fn update(&self, coords: &PackageCoordinates, content: &str) -> Result<WriteReceipt> {
        let response = self
            .http
            .put(self.url("/packages/update"))
            .query(coords)
            .json(&ContentPayload { content })
            .send()
            .await
            .context("Failed to send update request to registry")?;

        let response = check_status(response, "update").await?;
        response
            .json()
            .await
            .context("Failed to parse update response")
    }

    pub async fn get(&self, coords: &PackageCoordinates) -> Result<FetchedContent> {
        let response = self
            .http
            .get(self.url("/packages/get"))
            .query(coords)
            .send()
            .await
            .context("Failed to send get request to registry")?;

        let response = check_status(response, "get").await?;
        let timestamp = response
            .headers()
            .get("x-timestamp")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());
        let content = response
            .text()
            .await
            .context("Failed to read package content")?;
        Ok(FetchedContent { content, timestamp })
    }

    pub async fn search(&self, query: &str, limit: Option<usize>) -> Result<SearchResults> {
        let response = self
            .http
            .get(self.url("/packages/search"))
            .query(&SearchParams { q: query, limit })
            .send()
            .await
            .context("Failed to send search request to registry")?;

        let response = check_status(response, "search").await?;
        response
            .json()
            .await
            .context("Failed to parse search response")
    }

    pub async fn status(&self) -> Result<Value> {
        let response = self
            .http
            .get(self.url("/status"))
            .send()
            .await
            .context("Failed to reach registry")?;

        let response = check_status(response, "status").await?;
        response
            .json()
            .await
            .context("Failed to parse status response")
    }
}

/// Turn a non-success response into an error carrying the server's message.
async fn check_status(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        debug!(operation, status = %status, "Registry request succeeded");
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|json| json.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    Err(anyhow!("Failed to {operation}: {status} - {message}"))
}
