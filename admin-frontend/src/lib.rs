pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
pub mod store;

use services::{ApiClient, SessionManager};

/// Shared application state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub api: ApiClient,
}

impl AppState {
    pub fn new(sessions: SessionManager) -> Self {
        Self {
            api: ApiClient::new(sessions.clone()),
            sessions,
        }
    }
}
