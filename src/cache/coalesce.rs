//! Single-flight deduplication of concurrent upstream fetches.
//!
//! N simultaneous callers asking for the same key share one upstream call
//! and one result, success or failure. The registry holds only transient
//! shared futures — it is not a cache, and a settled entry is removed before
//! any waiter observes the outcome so later callers always start fresh.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Errors are shared across waiters, so they travel behind an `Arc`.
pub type SharedError = Arc<anyhow::Error>;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, SharedError>>>;

/// Per-process request coalescer. Clone-cheap; an explicitly constructed
/// instance is injected wherever deduplication is needed. Does not
/// coordinate across processes.
#[derive(Clone)]
pub struct RequestCoalescer<T: Clone> {
    inflight: Arc<DashMap<String, SharedFetch<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Default for RequestCoalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> RequestCoalescer<T> {
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(DashMap::new()),
        }
    }

    /// Run `factory` for `key`, or join an already in-flight run.
    ///
    /// The first caller for a key invokes `factory` immediately and registers
    /// the resulting future; concurrent callers are handed the same shared
    /// future. Whatever way it settles, the registry entry is removed as the
    /// first effect of settlement, so a subsequent call re-invokes the
    /// factory rather than observing a stale result.
    ///
    /// No timeout is imposed here: a factory that never settles hangs every
    /// coalesced caller, and the factory is expected to bound its own work.
    pub async fn coalesce<F, Fut>(&self, key: &str, factory: F) -> Result<T, SharedError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let fetch = match self.inflight.entry(key.to_owned()) {
            Entry::Occupied(existing) => {
                debug!(key, "joining in-flight request");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                let work = factory();
                let registry = Arc::clone(&self.inflight);
                let owned_key = key.to_owned();
                let fetch = async move {
                    let result = work.await.map_err(Arc::new);
                    // Deregister before any waiter resumes with the result.
                    registry.remove(&owned_key);
                    result
                }
                .boxed()
                .shared();
                slot.insert(fetch.clone());
                fetch
            }
        };

        fetch.await
    }

    /// Number of requests currently in flight. Diagnostics only.
    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }
}
