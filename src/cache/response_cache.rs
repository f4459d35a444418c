//! TTL cache facade for GitHub API responses.
//!
//! Wraps a [`KeyValueStore`] with entry encoding, the 18:00 cutover expiry,
//! and best-effort failure semantics: a broken store reads as a miss and
//! writes as a no-op, because caching must never break the request path.

use crate::cache::cutover;
use crate::cache::entry::CacheEntry;
use crate::cache::store::KeyValueStore;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed namespace prefixing every cache key.
const KEY_NAMESPACE: &str = "github";

/// Shared response cache. Clone-cheap.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn KeyValueStore>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Build the deterministic cache key for one logical resource.
    ///
    /// `github:<resource>:<repo with '/'→'_'>[:extra ...]`. Empty extras are
    /// skipped rather than rendered as empty segments, so an omitted filter
    /// and a blank filter produce the same key.
    pub fn build_key(resource: &str, repo_full_name: &str, extras: &[&str]) -> String {
        let mut key = format!(
            "{KEY_NAMESPACE}:{resource}:{}",
            repo_full_name.replace('/', "_")
        );
        for extra in extras {
            if !extra.is_empty() {
                key.push(':');
                key.push_str(extra);
            }
        }
        key
    }

    /// Read a still-valid entry, or `None` on miss, expiry, unparseable
    /// payload, or store failure.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.get_stale(key).await?;
        if entry.is_valid_at(Utc::now()) {
            Some(entry)
        } else {
            debug!(key, "cache entry expired");
            None
        }
    }

    /// Read an entry without the validity check. Used to recover the ETag and
    /// prior body for a conditional request after the entry has expired.
    pub async fn get_stale(&self, key: &str) -> Option<CacheEntry> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = ?e, "cache read failed, treating as miss");
                return None;
            }
        };
        CacheEntry::decode(&raw)
    }

    /// Store a response, expiring at the next 18:00 boundary. The store-level
    /// TTL matches the entry's own `expiresAt` so the store reclaims the key
    /// even if the application-level check is bypassed. Both are derived from
    /// one clock sample, so a write straddling the boundary cannot pair an
    /// already-past `expiresAt` with a day-long store TTL.
    pub async fn set(&self, key: &str, data: &Value, etag: Option<&str>) {
        let now = chrono::Local::now();
        let entry = CacheEntry {
            data: data.clone(),
            etag: etag.map(str::to_owned),
            expires_at: Some(cutover::next_cutover_at(now).to_utc()),
            timestamp: Some(now.to_utc()),
            ttl_seconds: None,
        };

        let encoded = match serde_json::to_string(&entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key, error = ?e, "failed to encode cache entry");
                return;
            }
        };

        let ttl = cutover::ttl_until_cutover_at(now);
        if let Err(e) = self.store.set_ex(key, &encoded, ttl).await {
            warn!(key, ttl, error = ?e, "cache write failed");
        } else {
            debug!(key, ttl, "cache entry stored");
        }
    }

    /// Push an entry's expiry forward to the next boundary without new data.
    /// Used after an upstream 304 confirms the cached body is still current;
    /// this is a full rewrite of the same payload, carrying the ETag forward.
    pub async fn refresh(&self, key: &str, data: &Value, etag: Option<&str>) {
        self.set(key, data, etag).await;
    }

    /// Read just the validator of a still-valid entry.
    pub async fn get_etag(&self, key: &str) -> Option<String> {
        self.get(key).await.and_then(|entry| entry.etag)
    }

    /// Unconditionally drop an entry. Failures are swallowed.
    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            warn!(key, error = ?e, "cache delete failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;

    /// Store double whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow!("store unreachable"))
        }
        async fn set_ex(&self, _key: &str, _value: &str, _ttl: u64) -> anyhow::Result<()> {
            Err(anyhow!("store unreachable"))
        }
        async fn delete(&self, _key: &str) -> anyhow::Result<()> {
            Err(anyhow!("store unreachable"))
        }
    }

    fn memory_cache() -> (ResponseCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ResponseCache::new(store.clone()), store)
    }

    #[test]
    fn build_key_is_deterministic() {
        let a = ResponseCache::build_key("commits", "org/repo", &["today"]);
        let b = ResponseCache::build_key("commits", "org/repo", &["today"]);
        assert_eq!(a, b);
        assert_eq!(a, "github:commits:org_repo:today");
    }

    #[test]
    fn build_key_distinguishes_logical_requests() {
        let commits = ResponseCache::build_key("commits", "org/repo", &["today"]);
        let issues = ResponseCache::build_key("issues", "org/repo", &["today"]);
        let week = ResponseCache::build_key("commits", "org/repo", &["this-week"]);
        assert_ne!(commits, issues);
        assert_ne!(commits, week);
    }

    #[test]
    fn build_key_skips_empty_extras() {
        let none = ResponseCache::build_key("languages", "org/repo", &[]);
        let blank = ResponseCache::build_key("languages", "org/repo", &[""]);
        assert_eq!(none, blank);
        assert_eq!(none, "github:languages:org_repo");
    }

    #[test]
    fn build_key_sanitizes_repo_separator() {
        // "a/b:c" must not collide with a same-shape key from different parts.
        let key = ResponseCache::build_key("commits", "a/b", &["c"]);
        assert_eq!(key, "github:commits:a_b:c");
    }

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let (cache, _) = memory_cache();
        let data = json!({"total": 3});
        cache.set("k", &data, Some("\"v1\"")).await;

        let entry = cache.get("k").await.unwrap();
        assert_eq!(entry.data, data);
        assert_eq!(entry.etag.as_deref(), Some("\"v1\""));
        assert!(entry.expires_at.is_some());
    }

    #[tokio::test]
    async fn set_derives_expiry_from_the_write_instant() {
        let (cache, _) = memory_cache();
        cache.set("k", &json!(1), None).await;

        let entry = cache.get("k").await.unwrap();
        let written = entry.timestamp.unwrap().with_timezone(&chrono::Local);
        // The stored boundary is the one seen at the write instant itself.
        assert_eq!(
            entry.expires_at.unwrap(),
            cutover::next_cutover_at(written).to_utc()
        );
    }

    #[tokio::test]
    async fn get_etag_reads_validator_only() {
        let (cache, _) = memory_cache();
        cache.set("k", &json!([]), Some("\"v2\"")).await;
        assert_eq!(cache.get_etag("k").await.as_deref(), Some("\"v2\""));
        assert_eq!(cache.get_etag("missing").await, None);
    }

    #[tokio::test]
    async fn refresh_extends_expiry_and_keeps_payload() {
        let (cache, store) = memory_cache();
        cache.set("k", &json!({"n": 1}), Some("\"v1\"")).await;

        // Backdate the stored entry so the refresh visibly moves expiry.
        let mut stale = cache.get("k").await.unwrap();
        stale.expires_at = Some(Utc::now() - chrono::TimeDelta::milliseconds(1));
        store
            .set_ex("k", &serde_json::to_string(&stale).unwrap(), 60)
            .await
            .unwrap();

        cache.refresh("k", &stale.data, stale.etag.as_deref()).await;
        let refreshed = cache.get("k").await.unwrap();
        assert_eq!(refreshed.data, json!({"n": 1}));
        assert_eq!(refreshed.etag.as_deref(), Some("\"v1\""));
        assert!(refreshed.expires_at.unwrap() > stale.expires_at.unwrap());
    }

    #[tokio::test]
    async fn expired_entry_reads_as_miss_but_stale_read_sees_it() {
        let (cache, store) = memory_cache();
        let entry = CacheEntry {
            data: json!({"old": true}),
            etag: Some("\"old\"".into()),
            expires_at: Some(Utc::now() - chrono::TimeDelta::seconds(1)),
            timestamp: None,
            ttl_seconds: None,
        };
        store
            .set_ex("k", &serde_json::to_string(&entry).unwrap(), 60)
            .await
            .unwrap();

        assert!(cache.get("k").await.is_none());
        let stale = cache.get_stale("k").await.unwrap();
        assert_eq!(stale.etag.as_deref(), Some("\"old\""));
    }

    #[tokio::test]
    async fn malformed_payload_reads_as_miss() {
        let (cache, store) = memory_cache();
        store.set_ex("k", "{{{ not json", 60).await.unwrap();
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn broken_store_degrades_silently() {
        let cache = ResponseCache::new(Arc::new(BrokenStore));
        // None of these may panic or propagate an error.
        assert!(cache.get("k").await.is_none());
        assert!(cache.get_etag("k").await.is_none());
        cache.set("k", &json!({}), None).await;
        cache.refresh("k", &json!({}), None).await;
        cache.delete("k").await;
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let (cache, _) = memory_cache();
        cache.set("k", &json!(1), None).await;
        cache.delete("k").await;
        assert!(cache.get("k").await.is_none());
    }
}
