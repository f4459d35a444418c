//! Web API router construction and shared response utilities.

use crate::state::AppState;
use crate::web::{analytics, status};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Json, Response};
use axum::Router;
use axum::routing::get;
use std::time::Duration;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

/// Cache-Control presets for public endpoints.
pub mod cache {
    /// Analytics bodies already reset daily server-side; let browsers hold
    /// them briefly and the edge a bit longer.
    pub const ANALYTICS: &str = "public, max-age=60, s-maxage=300, stale-while-revalidate=120";
}

/// Wraps a JSON response with a `Cache-Control` header.
pub fn with_cache_control<T: serde::Serialize>(value: T, header: &'static str) -> Response {
    let mut response = Json(value).into_response();
    response.headers_mut().insert(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(header),
    );
    response
}

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route(
            "/repos/{owner}/{repo}/{resource}",
            get(analytics::get_analytics).delete(analytics::purge_analytics),
        )
        .with_state(app_state);

    Router::new().nest("/api", api_router).layer((
        CompressionLayer::new()
            .zstd(true)
            .br(true)
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        TimeoutLayer::new(Duration::from_secs(60)),
    ))
}
