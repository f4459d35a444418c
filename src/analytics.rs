//! Cache-backed fetch orchestration.
//!
//! Composes the response cache, the request coalescer, and the GitHub client
//! into the one call the web handlers use: coalesce on the cache key, and
//! inside the single flight check the cache, fall back to a conditional
//! upstream request, and store/refresh the result.
//!
//! For K concurrent callers of the same key this yields exactly one upstream
//! attempt; all K observe the same value or the same error.

use crate::cache::coalesce::{RequestCoalescer, SharedError};
use crate::cache::{CacheEntry, ResponseCache};
use crate::github::filter::ActivityFilter;
use crate::github::{ApiResponse, GitHubApi, Resource};
use anyhow::anyhow;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Shared analytics fetcher. Clone-cheap; all internals are `Arc`-wrapped.
#[derive(Clone)]
pub struct AnalyticsService {
    api: Arc<GitHubApi>,
    cache: ResponseCache,
    coalescer: RequestCoalescer<Arc<Value>>,
}

impl AnalyticsService {
    pub fn new(api: Arc<GitHubApi>, cache: ResponseCache) -> Self {
        Self {
            api,
            cache,
            coalescer: RequestCoalescer::new(),
        }
    }

    /// The cache key for one logical request, exposed so the purge endpoint
    /// derives the identical key.
    pub fn cache_key(resource: Resource, repo: &str, filter: Option<&ActivityFilter>) -> String {
        let filter_segment = filter.map(|f| f.to_string()).unwrap_or_default();
        ResponseCache::build_key(resource.as_str(), repo, &[&filter_segment])
    }

    /// Fetch analytics for `(resource, repo, filter)`, deduplicated and cached.
    pub async fn fetch(
        &self,
        resource: Resource,
        repo: &str,
        filter: Option<ActivityFilter>,
    ) -> Result<Arc<Value>, SharedError> {
        let key = Self::cache_key(resource, repo, filter.as_ref());

        let api = self.api.clone();
        let cache = self.cache.clone();
        let repo = repo.to_owned();
        let factory_key = key.clone();

        self.coalescer
            .coalesce(&key, move || async move {
                // Fresh cache hit: no upstream call at all.
                if let Some(entry) = cache.get(&factory_key).await {
                    debug!(key = %factory_key, "served from cache");
                    return Ok(Arc::new(entry.data));
                }

                // Expired (or missing) entry: its ETag still lets us ask
                // GitHub whether anything actually changed.
                let stale: Option<CacheEntry> = cache.get_stale(&factory_key).await;
                let etag = stale.as_ref().and_then(|entry| entry.etag.as_deref());

                match api.fetch(resource, &repo, filter.as_ref(), etag).await? {
                    ApiResponse::Fresh { data, etag } => {
                        cache.set(&factory_key, &data, etag.as_deref()).await;
                        Ok(Arc::new(data))
                    }
                    ApiResponse::NotModified => {
                        // Upstream only answers 304 to a conditional request,
                        // so a stale entry must exist here.
                        let entry = stale.ok_or_else(|| {
                            anyhow!("GitHub returned 304 without a cached entry to reuse")
                        })?;
                        debug!(key = %factory_key, "not modified, refreshing cache expiry");
                        cache
                            .refresh(&factory_key, &entry.data, entry.etag.as_deref())
                            .await;
                        Ok(Arc::new(entry.data))
                    }
                }
            })
            .await
    }

    /// Drop the cached entry for one logical request.
    pub async fn purge(&self, resource: Resource, repo: &str, filter: Option<&ActivityFilter>) {
        let key = Self::cache_key(resource, repo, filter);
        self.cache.delete(&key).await;
    }

    /// Currently coalesced upstream fetches, for the status endpoint.
    pub fn inflight_count(&self) -> usize {
        self.coalescer.inflight_count()
    }
}
