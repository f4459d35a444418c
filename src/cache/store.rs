//! Key/value store backends for the response cache.
//!
//! Redis is the system of record so cache entries are shared across
//! instances and survive restarts. When no `REDIS_URL` is configured or the
//! connection cannot be established at startup, the service degrades to a
//! process-local in-memory store rather than refusing to boot — the cache is
//! an optimization, never a dependency.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Minimal store surface the cache facade needs: get, set-with-expiry, delete.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Connect to Redis if configured, falling back to the in-memory store.
pub async fn connect(redis_url: Option<&str>) -> Arc<dyn KeyValueStore> {
    let Some(url) = redis_url else {
        info!("no REDIS_URL configured, using in-memory cache store");
        return Arc::new(MemoryStore::new());
    };

    match RedisStore::connect(url).await {
        Ok(store) => {
            info!("connected to redis cache store");
            Arc::new(store)
        }
        Err(e) => {
            warn!(error = ?e, "redis unavailable, degrading to in-memory cache store");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Redis-backed store using a self-reconnecting connection manager.
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(500));

        let client = redis::Client::open(url).context("invalid redis URL")?;
        let manager = client
            .get_connection_manager_with_config(config)
            .await
            .context("failed to establish redis connection")?;

        Ok(Self { manager })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await.context("redis GET failed")?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .context("redis SETEX failed")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await.context("redis DEL failed")?;
        Ok(())
    }
}

/// Process-local fallback store. Honors per-key expiry the way Redis would,
/// evicting lazily on read. Not visible to other instances.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, (String, DateTime<Utc>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            let (ref value, evict_at) = *entry;
            if Utc::now() < evict_at {
                return Ok(Some(value.clone()));
            }
            drop(entry);
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let evict_at = Utc::now() + TimeDelta::seconds(ttl_seconds as i64);
        self.entries
            .insert(key.to_owned(), (value.to_owned(), evict_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
