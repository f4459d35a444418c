//! Application state shared across web handlers.

use crate::analytics::AnalyticsService;

/// Shared state injected into handlers. Clone-cheap (all `Arc`-wrapped
/// internals); the analytics service owns the cache facade and the request
/// coalescer as explicitly constructed instances.
#[derive(Clone)]
pub struct AppState {
    pub analytics: AnalyticsService,
}

impl AppState {
    pub fn new(analytics: AnalyticsService) -> Self {
        Self { analytics }
    }
}
