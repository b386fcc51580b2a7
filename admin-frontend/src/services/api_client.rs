use reqwest::{Method, Response, StatusCode};
use serde::Serialize;

use crate::error::SessionError;
use crate::models::Role;
use crate::services::session_manager::SessionManager;

/// Calls the Saveful REST API on behalf of a logged-in role.
///
/// Requests carry `Authorization: Bearer <stored token>`. A 401 triggers one
/// refresh and, if it succeeds, one retry with the new token.
#[derive(Clone)]
pub struct ApiClient {
    sessions: SessionManager,
}

impl ApiClient {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    pub async fn get(&self, role: Role, path: &str) -> Result<Response, SessionError> {
        self.send(role, Method::GET, path, None::<&()>).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        role: Role,
        path: &str,
        body: &B,
    ) -> Result<Response, SessionError> {
        self.send(role, Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        role: Role,
        path: &str,
        body: &B,
    ) -> Result<Response, SessionError> {
        self.send(role, Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, role: Role, path: &str) -> Result<Response, SessionError> {
        self.send(role, Method::DELETE, path, None::<&()>).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        role: Role,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, SessionError> {
        let token = self
            .sessions
            .get_stored_token(role)
            .ok_or(SessionError::NotAuthenticated(role))?;

        let response = self.send_once(&token, method.clone(), path, body).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(role = %role, path, "API returned 401, refreshing session");
        if !self.sessions.refresh_token(role).await {
            return Err(SessionError::NotAuthenticated(role));
        }

        let token = self
            .sessions
            .get_stored_token(role)
            .ok_or(SessionError::NotAuthenticated(role))?;
        self.send_once(&token, method, path, body).await
    }

    async fn send_once<B: Serialize + ?Sized>(
        &self,
        token: &str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, SessionError> {
        let mut request = self
            .sessions
            .auth_client()
            .request_with_auth(method, path, token);
        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(|e| {
            tracing::error!(path, error = %e, "API request failed");
            SessionError::Http(e)
        })
    }
}
