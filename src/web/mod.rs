//! Web API module for the pulse application.

pub mod analytics;
pub mod error;
pub mod routes;
pub mod status;

pub use routes::*;
