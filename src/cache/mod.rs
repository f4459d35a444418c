//! GitHub response caching: cutover-pinned TTL entries over a Redis-like
//! store, plus single-flight coalescing of concurrent upstream fetches.

pub mod coalesce;
pub mod cutover;
pub mod entry;
pub mod response_cache;
pub mod store;

pub use coalesce::RequestCoalescer;
pub use entry::CacheEntry;
pub use response_cache::ResponseCache;
