//! Shared helpers for the session integration tests.

#![allow(dead_code)]

use admin_frontend::config::AuthApiSettings;
use admin_frontend::models::Role;
use admin_frontend::services::SessionManager;
use admin_frontend::store::{CredentialStore, MemoryStore};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct TestContext {
    pub server: MockServer,
    pub store: Arc<MemoryStore>,
    pub sessions: SessionManager,
}

/// A session manager pointed at a fresh mock API with an empty store.
pub async fn setup() -> TestContext {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let sessions = SessionManager::new(AuthApiSettings::new(server.uri()), store.clone());

    TestContext {
        server,
        store,
        sessions,
    }
}

/// Write a role's session straight into the store, as a previous login would.
pub fn seed_session(store: &MemoryStore, role: Role, token: &str, refresh_token: &str) {
    store.set(&role.token_key(), token).unwrap();
    store.set(&role.refresh_token_key(), refresh_token).unwrap();
    store
        .set(&role.user_key(), &json!({ "role": role.as_str() }).to_string())
        .unwrap();
}

pub async fn mock_login(server: &MockServer, role: Role, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(format!("/api/auth/{}/login", role)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mock_refresh(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn count_requests(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}
