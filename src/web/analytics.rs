//! Repository analytics handlers.
//!
//! The `filter` query parameter is validated here, before the cache or the
//! coalescer is ever touched: an invalid filter is a 400 with the accepted
//! values enumerated, never an upstream call.

use crate::github::Resource;
use crate::github::filter::ActivityFilter;
use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::routes::{cache, with_cache_control};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub filter: Option<String>,
}

/// Resolve and validate the path/query inputs common to both handlers.
fn parse_request(
    resource: &str,
    filter: Option<&str>,
) -> Result<(Resource, Option<ActivityFilter>), ApiError> {
    let resource: Resource = resource
        .parse()
        .map_err(|e: crate::github::UnknownResource| ApiError::unknown_resource(e.to_string()))?;

    let filter = filter
        .map(|raw| {
            raw.parse::<ActivityFilter>()
                .map_err(|e| ApiError::invalid_filter(e.to_string()))
        })
        .transpose()?;

    Ok((resource, filter))
}

/// `GET /api/repos/{owner}/{repo}/{resource}?filter=...`
pub(super) async fn get_analytics(
    State(state): State<AppState>,
    Path((owner, repo, resource)): Path<(String, String, String)>,
    Query(params): Query<AnalyticsParams>,
) -> Result<Response, ApiError> {
    let (resource, filter) = parse_request(&resource, params.filter.as_deref())?;
    let full_name = format!("{owner}/{repo}");

    let data = state
        .analytics
        .fetch(resource, &full_name, filter)
        .await
        .map_err(|e| ApiError::from_fetch(&e))?;

    Ok(with_cache_control(data.as_ref(), cache::ANALYTICS))
}

/// `DELETE /api/repos/{owner}/{repo}/{resource}?filter=...`
///
/// Unconditionally drops the cached entry for one logical request. The next
/// read repopulates it from upstream.
pub(super) async fn purge_analytics(
    State(state): State<AppState>,
    Path((owner, repo, resource)): Path<(String, String, String)>,
    Query(params): Query<AnalyticsParams>,
) -> Result<StatusCode, ApiError> {
    let (resource, filter) = parse_request(&resource, params.filter.as_deref())?;
    let full_name = format!("{owner}/{repo}");

    state
        .analytics
        .purge(resource, &full_name, filter.as_ref())
        .await;

    Ok(StatusCode::NO_CONTENT)
}
