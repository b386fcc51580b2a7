pub mod app;
pub mod auth;
pub mod metrics;
pub mod proxy;
