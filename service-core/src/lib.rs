//! service-core: shared infrastructure for the Saveful admin services.
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod observability;
