//! # Error Handling and Response Types
//!
//! Every failure the registry can report is an [`AppError`]. Handlers return
//! [`AppResult`] and the [`IntoResponse`] impl turns the error into a JSON
//! body with a matching status code:
//!
//! ```json
//! {
//!   "error": "Package version not found: alice/tool/0.1.0",
//!   "code": "not_found",
//!   "details": null,
//!   "timestamp": "2026-01-01T12:00:00+00:00"
//! }
//! ```
//!
//! Internal failures are logged in full but answered with a generic message,
//! so storage paths and I/O details never reach the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// Message sent to clients for any internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Standardized error response structure for consistent API error handling
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub error: String,          // Human-readable error message
    pub code: String,           // Machine-readable error code
    pub details: Option<Value>, // Additional error details
    pub timestamp: String,      // RFC 3339 timestamp
}

/// Error code classification for machine-readable error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    RateLimited,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::NotFound => "not_found",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::InternalError => "internal_error",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application-specific error types with error codes
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// The request is missing a required argument or carries an unusable one.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    /// The server configuration cannot be used.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// Get the appropriate error code for this error type
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::BadRequest(_) | AppError::Json(_) => ErrorCode::ValidationError,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::RateLimited(_) => ErrorCode::RateLimited,
            AppError::Io(_)
            | AppError::InternalError(_)
            | AppError::Config(_)
            | AppError::Anyhow(_) => ErrorCode::InternalError,
        }
    }

    /// Whether this error is the caller's fault rather than the server's.
    pub fn is_client_error(&self) -> bool {
        self.error_code() != ErrorCode::InternalError
    }

    /// Create a standardized error response
    pub fn to_error_response(&self) -> ApiErrorResponse {
        let code = self.error_code();
        let error = if self.is_client_error() {
            self.to_string()
        } else {
            INTERNAL_ERROR_MESSAGE.to_string()
        };
        ApiErrorResponse {
            error,
            code: code.as_str().to_string(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.error_code().http_status();

        if self.is_client_error() {
            tracing::warn!(error = %self, status = %status, "Request rejected");
        } else {
            tracing::error!(error = %self, "Request failed");
            if let AppError::Anyhow(ref e) = self {
                tracing::error!(source = ?e.source(), "Internal server error details");
            }
        }

        let error_response = self.to_error_response();
        tracing::debug!(status = %status, code = %error_response.code, "Returning standardized error response");

        (status, axum::Json(error_response)).into_response()
    }
}

/// Convenient result type for application operations.
pub type AppResult<T> = Result<T, AppError>;
