//! GitHub activity analytics cache service.
//!
//! Serves commit/issue/language/contributor analytics to dashboard users
//! while protecting GitHub's rate limit with a daily-reset TTL cache and
//! single-flight coalescing of concurrent identical fetches.

pub mod analytics;
pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod github;
pub mod logging;
pub mod state;
pub mod utils;
pub mod web;
