use crate::config::AuthApiSettings;
use crate::error::SessionError;
use reqwest::{Client, Method, Response};
use service_core::observability::{TracedClientExt, TracedRequest};

/// Thin HTTP wrapper around the Saveful REST API.
pub struct AuthClient {
    client: Client,
    settings: AuthApiSettings,
}

impl AuthClient {
    pub fn new(settings: AuthApiSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    pub fn base_url(&self) -> &str {
        self.settings.base_url.trim_end_matches('/')
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// POST a JSON body with trace context propagation.
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> Result<Response, SessionError> {
        let url = self.url(path);

        self.client
            .traced_post(&url)
            .timeout(self.settings.request_timeout())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send POST request to {}: {}", url, e);
                SessionError::Http(e)
            })
    }

    /// GET with a bearer token and trace context propagation.
    pub async fn get_with_auth(&self, path: &str, access_token: &str) -> Result<Response, SessionError> {
        let url = self.url(path);

        self.client
            .traced_get(&url)
            .timeout(self.settings.request_timeout())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send GET request to {}: {}", url, e);
                SessionError::Http(e)
            })
    }

    /// Start an arbitrary authenticated request; the caller adds a body and sends it.
    pub fn request_with_auth(&self, method: Method, path: &str, access_token: &str) -> TracedRequest {
        self.client
            .traced_request(method, &self.url(path))
            .timeout(self.settings.request_timeout())
            .bearer_auth(access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let client = AuthClient::new(AuthApiSettings::new("http://api.saveful.test/"));
        assert_eq!(
            client.url("/api/auth/me"),
            "http://api.saveful.test/api/auth/me"
        );
    }
}
