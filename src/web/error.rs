//! API error responses.
//!
//! Every handler failure becomes a JSON body with a stable machine code and
//! a human message. Cache failures never surface here by design — only
//! invalid input and upstream problems do.

use crate::github::errors::GitHubApiError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

/// Stable machine-readable error codes for API consumers.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    InvalidFilter,
    UnknownResource,
    UpstreamError,
    UpstreamRateLimited,
}

#[derive(Debug)]
pub struct ApiError {
    code: ApiErrorCode,
    message: String,
    status: StatusCode,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            code,
            message: message.into(),
            status,
        }
    }

    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InvalidFilter, message, StatusCode::BAD_REQUEST)
    }

    pub fn unknown_resource(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::UnknownResource, message, StatusCode::NOT_FOUND)
    }

    /// Map a failed analytics fetch to a response. The coalescer hands every
    /// waiter the same shared error, so this sees `anyhow` with the typed
    /// client error underneath.
    pub fn from_fetch(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<GitHubApiError>() {
            Some(GitHubApiError::Status { status: 403 | 429, url }) => {
                warn!(url, "GitHub rate limit hit");
                Self::new(
                    ApiErrorCode::UpstreamRateLimited,
                    "GitHub rate limit exhausted, try again later",
                    StatusCode::SERVICE_UNAVAILABLE,
                )
            }
            Some(GitHubApiError::Status { status, url }) => {
                warn!(status, url, "GitHub returned an error status");
                Self::new(
                    ApiErrorCode::UpstreamError,
                    format!("GitHub API returned {status}"),
                    StatusCode::BAD_GATEWAY,
                )
            }
            Some(GitHubApiError::ParseFailed { url, .. }) => {
                error!(url, error = ?err, "failed to parse GitHub response");
                Self::new(
                    ApiErrorCode::UpstreamError,
                    "GitHub returned an unreadable response",
                    StatusCode::BAD_GATEWAY,
                )
            }
            _ => {
                error!(error = ?err, "analytics fetch failed");
                Self::new(
                    ApiErrorCode::UpstreamError,
                    "failed to reach GitHub",
                    StatusCode::BAD_GATEWAY,
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "code": self.code,
        }));
        (self.status, body).into_response()
    }
}
