//! Conditional-request flow of the analytics service against a stubbed
//! GitHub API: the first fetch populates the cache, and once the entry
//! expires a 304 answer refreshes it without re-downloading the body.

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chrono::Utc;
use pulse::analytics::AnalyticsService;
use pulse::cache::ResponseCache;
use pulse::cache::store::{KeyValueStore, MemoryStore};
use pulse::github::{GitHubApi, Resource};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const STUB_ETAG: &str = "\"lang-v1\"";

#[derive(Clone)]
struct StubState {
    hits: Arc<AtomicUsize>,
    conditional_hits: Arc<AtomicUsize>,
}

async fn languages_stub(State(state): State<StubState>, headers: HeaderMap) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let revalidating = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        == Some(STUB_ETAG);
    if revalidating {
        state.conditional_hits.fetch_add(1, Ordering::SeqCst);
        return StatusCode::NOT_MODIFIED.into_response();
    }

    (
        [(header::ETAG, STUB_ETAG)],
        axum::Json(json!({"Rust": 120_000, "TypeScript": 4_000})),
    )
        .into_response()
}

async fn spawn_stub(state: StubState) -> String {
    let router = Router::new()
        .route("/repos/{owner}/{repo}/languages", get(languages_stub))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn expired_entry_revalidates_with_304_and_is_refreshed() {
    let state = StubState {
        hits: Arc::new(AtomicUsize::new(0)),
        conditional_hits: Arc::new(AtomicUsize::new(0)),
    };
    let base_url = spawn_stub(state.clone()).await;

    let store = Arc::new(MemoryStore::new());
    let cache = ResponseCache::new(store.clone());
    let api = Arc::new(GitHubApi::new(&base_url, None).unwrap());
    let service = AnalyticsService::new(api, cache.clone());

    // First fetch goes upstream and caches the body with its validator.
    let first = service
        .fetch(Resource::Languages, "acme/payroll", None)
        .await
        .unwrap();
    assert_eq!(
        first.as_ref(),
        &json!({"Rust": 120_000, "TypeScript": 4_000})
    );
    assert_eq!(state.hits.load(Ordering::SeqCst), 1);

    // Expire the cached entry in place, keeping its ETag.
    let key = AnalyticsService::cache_key(Resource::Languages, "acme/payroll", None);
    let mut entry = cache.get_stale(&key).await.unwrap();
    entry.expires_at = Some(Utc::now() - chrono::TimeDelta::seconds(1));
    store
        .set_ex(&key, &serde_json::to_string(&entry).unwrap(), 60)
        .await
        .unwrap();

    // The next fetch revalidates, gets a 304, and serves the cached body.
    let second = service
        .fetch(Resource::Languages, "acme/payroll", None)
        .await
        .unwrap();
    assert_eq!(second.as_ref(), first.as_ref());
    assert_eq!(state.hits.load(Ordering::SeqCst), 2);
    assert_eq!(state.conditional_hits.load(Ordering::SeqCst), 1);

    // The 304 refresh made the entry valid again, validator carried forward.
    let refreshed = cache.get(&key).await.expect("entry should be valid again");
    assert_eq!(refreshed.etag.as_deref(), Some(STUB_ETAG));

    // A third fetch is a plain cache hit, no upstream traffic at all.
    let third = service
        .fetch(Resource::Languages, "acme/payroll", None)
        .await
        .unwrap();
    assert_eq!(third.as_ref(), first.as_ref());
    assert_eq!(state.hits.load(Ordering::SeqCst), 2);
}
