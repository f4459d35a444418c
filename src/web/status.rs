//! Health and status handlers.

use crate::cache::cutover;
use crate::state::AppState;
use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::trace;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    version: String,
    commit: String,
    /// Upstream fetches currently coalesced.
    inflight_requests: usize,
    /// Next daily cache reset, as an RFC 3339 instant.
    next_cache_reset: String,
    /// Seconds until that reset.
    cache_reset_in_seconds: u64,
}

/// Health check endpoint
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// `GET /api/status`
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT_SHORT").to_string(),
        inflight_requests: state.analytics.inflight_count(),
        next_cache_reset: cutover::next_cutover().to_rfc3339(),
        cache_reset_in_seconds: cutover::ttl_until_cutover(),
    })
}
