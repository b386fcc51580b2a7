//! Per-role session lifecycle: login, logout, validation and refresh.
//!
//! A role's session is exactly the presence of its three stored values
//! (`{role}_token`, `{role}_refresh_token`, `{role}_user`). Roles never share
//! state.

use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

use crate::config::AuthApiSettings;
use crate::error::SessionError;
use crate::models::session::{ApiErrorBody, LoginResponse, RefreshResponse};
use crate::models::{Credentials, LoginOutcome, Role, StoredSession};
use crate::services::auth_client::AuthClient;
use crate::services::metrics::{record_login, record_refresh, record_refresh_coalesced};
use crate::services::single_flight::SingleFlight;
use crate::store::{CredentialStore, StoreError};

pub const ME_PATH: &str = "/api/auth/me";
pub const REFRESH_PATH: &str = "/api/auth/refresh";

pub fn login_path(role: Role) -> String {
    format!("/api/auth/{}/login", role)
}

/// Cheap to clone; clones share the store and the in-flight refreshes.
#[derive(Clone)]
pub struct SessionManager {
    client: Arc<AuthClient>,
    store: Arc<dyn CredentialStore>,
    refreshes: Arc<SingleFlight<Role, bool>>,
}

impl SessionManager {
    pub fn new(settings: AuthApiSettings, store: Arc<dyn CredentialStore>) -> Self {
        Self::with_client(Arc::new(AuthClient::new(settings)), store)
    }

    pub fn with_client(client: Arc<AuthClient>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            store,
            refreshes: Arc::new(SingleFlight::new()),
        }
    }

    pub fn auth_client(&self) -> &AuthClient {
        &self.client
    }

    /// Authenticate `role` and persist its tokens and profile.
    ///
    /// Only `role`'s keys are written.
    #[instrument(skip(self, credentials), fields(role = %role))]
    pub async fn login(
        &self,
        credentials: &Credentials,
        role: Role,
    ) -> Result<LoginOutcome, SessionError> {
        credentials.validate()?;

        let response = self
            .client
            .post(&login_path(role), &credentials.to_body())
            .await
            .inspect_err(|_| record_login(role, "error"))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(ApiErrorBody::into_message)
                .unwrap_or_else(|| "Login failed".to_string());

            warn!(status = %status, "Login rejected by auth API");
            record_login(role, "rejected");
            return Err(SessionError::LoginFailed(message));
        }

        let body: LoginResponse = response.json().await.map_err(|e| {
            record_login(role, "malformed");
            SessionError::MalformedResponse(format!("login response: {}", e))
        })?;

        let Some(token) = body.access_token else {
            record_login(role, "malformed");
            return Err(SessionError::MalformedResponse(
                "login response has no accessToken".to_string(),
            ));
        };

        let user = serde_json::to_string(&body.user)?;
        let refresh_token = body.refresh_token.as_deref().unwrap_or_default();
        if let Err(e) = write_session(self.store.as_ref(), role, &token, refresh_token, &user) {
            error!(error = %e, "Failed to store session, clearing partial write");
            clear_role(self.store.as_ref(), role);
            record_login(role, "error");
            return Err(e.into());
        }
        // A refresh started under the previous session must not touch this one.
        self.refreshes.forget(&role);

        record_login(role, "success");
        info!("Logged in");

        Ok(LoginOutcome {
            success: true,
            token,
            user: body.user,
        })
    }

    /// Forget `role`'s session, or every role's when `None`. Never fails.
    pub fn logout(&self, role: Option<Role>) {
        let roles = match role {
            Some(role) => vec![role],
            None => Role::ALL.to_vec(),
        };
        for role in roles {
            self.refreshes.forget(&role);
            clear_role(self.store.as_ref(), role);
        }
    }

    /// Check `token` against the API. A 401 falls through to a refresh.
    ///
    /// Errors are logged and reported as `false`.
    #[instrument(skip(self, token), fields(role = %role))]
    pub async fn validate_token(&self, token: &str, role: Role) -> bool {
        match self.client.get_with_auth(ME_PATH, token).await {
            Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                debug!("Access token expired, attempting refresh");
                self.refresh_token(role).await
            }
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Exchange `role`'s refresh token for a new access token.
    ///
    /// Concurrent calls for the same role share a single request to the API
    /// and all observe its result. Any failure other than a malformed success
    /// body logs the role out. The request keeps running if the caller is
    /// dropped; its result is discarded if the role's session changed meanwhile.
    pub async fn refresh_token(&self, role: Role) -> bool {
        let client = Arc::clone(&self.client);
        let store = Arc::clone(&self.store);
        let flight = self
            .refreshes
            .run(role, move || attempt_refresh(client, store, role))
            .await;

        if flight.joined {
            debug!(role = %role, "Joined refresh already in flight");
            record_refresh_coalesced(role);
        }

        flight.value.unwrap_or_else(|e| {
            error!(role = %role, error = %e, "Refresh task did not complete");
            false
        })
    }

    pub fn get_stored_token(&self, role: Role) -> Option<String> {
        read(self.store.as_ref(), &role.token_key())
    }

    pub fn get_stored_refresh_token(&self, role: Role) -> Option<String> {
        read(self.store.as_ref(), &role.refresh_token_key())
    }

    /// The stored profile; unparseable JSON reads as absent.
    pub fn get_stored_user(&self, role: Role) -> Option<Value> {
        let raw = read(self.store.as_ref(), &role.user_key())?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(role = %role, error = %e, "Stored user profile is not valid JSON");
                None
            }
        }
    }

    /// Everything stored for `role`, if it is logged in.
    pub fn get_session(&self, role: Role) -> Option<StoredSession> {
        Some(StoredSession {
            access_token: self.get_stored_token(role)?,
            refresh_token: self.get_stored_refresh_token(role),
            user: self.get_stored_user(role),
        })
    }
}

#[instrument(skip(client, store), fields(role = %role))]
async fn attempt_refresh(
    client: Arc<AuthClient>,
    store: Arc<dyn CredentialStore>,
    role: Role,
) -> bool {
    let refresh_token = match read(store.as_ref(), &role.refresh_token_key()) {
        Some(token) if !token.is_empty() => token,
        _ => {
            debug!("No refresh token stored");
            record_refresh(role, "no_refresh_token");
            return false;
        }
    };

    match exchange_refresh_token(&client, store.as_ref(), role, &refresh_token).await {
        Ok(refreshed) => refreshed,
        Err(e) => {
            error!(error = %e, "Token refresh failed");
            if !is_current(store.as_ref(), role, &refresh_token) {
                return superseded(role);
            }
            clear_role(store.as_ref(), role);
            record_refresh(role, "error");
            false
        }
    }
}

async fn exchange_refresh_token(
    client: &AuthClient,
    store: &dyn CredentialStore,
    role: Role,
    refresh_token: &str,
) -> Result<bool, SessionError> {
    let response = client
        .post(
            REFRESH_PATH,
            &serde_json::json!({ "refreshToken": refresh_token }),
        )
        .await?;

    let status = response.status();
    if !status.is_success() {
        if !is_current(store, role, refresh_token) {
            return Ok(superseded(role));
        }
        warn!(status = %status, "Refresh token rejected, logging out");
        clear_role(store, role);
        record_refresh(role, "rejected");
        return Ok(false);
    }

    let body: RefreshResponse = response.json().await?;

    let Some(access_token) = body.access_token else {
        warn!("Refresh response has no accessToken");
        record_refresh(role, "malformed");
        return Ok(false);
    };

    if !is_current(store, role, refresh_token) {
        return Ok(superseded(role));
    }

    store.set(&role.token_key(), &access_token)?;
    // Rotation is optional; keep the old refresh token when none is issued.
    if let Some(rotated) = body.refresh_token {
        store.set(&role.refresh_token_key(), &rotated)?;
    }

    record_refresh(role, "success");
    info!("Access token refreshed");
    Ok(true)
}

fn superseded(role: Role) -> bool {
    debug!(role = %role, "Session changed during refresh, discarding result");
    record_refresh(role, "superseded");
    false
}

/// Whether `role` still holds the refresh token a refresh was started with.
fn is_current(store: &dyn CredentialStore, role: Role, refresh_token: &str) -> bool {
    read(store, &role.refresh_token_key()).as_deref() == Some(refresh_token)
}

fn write_session(
    store: &dyn CredentialStore,
    role: Role,
    token: &str,
    refresh_token: &str,
    user: &str,
) -> Result<(), StoreError> {
    store.set(&role.token_key(), token)?;
    store.set(&role.refresh_token_key(), refresh_token)?;
    store.set(&role.user_key(), user)
}

fn read(store: &dyn CredentialStore, key: &str) -> Option<String> {
    store.get(key).unwrap_or_else(|e| {
        warn!(key, error = %e, "Failed to read credential store");
        None
    })
}

fn clear_role(store: &dyn CredentialStore, role: Role) {
    for key in role.storage_keys() {
        if let Err(e) = store.delete(&key) {
            warn!(role = %role, key = %key, error = %e, "Failed to clear stored credential");
        }
    }
    debug!(role = %role, "Session cleared");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manager() -> (SessionManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        // Port 9 (discard) on localhost: nothing in these tests reaches the network.
        let manager = SessionManager::new(AuthApiSettings::new("http://127.0.0.1:9"), store.clone());
        (manager, store)
    }

    fn seed(store: &MemoryStore, role: Role, token: &str, refresh: &str) {
        store.set(&role.token_key(), token).unwrap();
        store.set(&role.refresh_token_key(), refresh).unwrap();
        store.set(&role.user_key(), r#"{"id":1}"#).unwrap();
    }

    #[test]
    fn logout_single_role_leaves_other_role() {
        let (manager, store) = manager();
        seed(&store, Role::Admin, "a", "ra");
        seed(&store, Role::Chef, "c", "rc");

        manager.logout(Some(Role::Admin));

        assert_eq!(manager.get_stored_token(Role::Admin), None);
        assert_eq!(manager.get_stored_refresh_token(Role::Admin), None);
        assert_eq!(manager.get_stored_user(Role::Admin), None);
        assert_eq!(manager.get_stored_token(Role::Chef).as_deref(), Some("c"));
    }

    #[test]
    fn logout_all_is_idempotent() {
        let (manager, store) = manager();
        seed(&store, Role::Admin, "a", "ra");
        seed(&store, Role::Chef, "c", "rc");

        manager.logout(None);
        manager.logout(None);

        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_user_reads_as_none() {
        let (manager, store) = manager();
        store.set("chef_user", "{not json").unwrap();
        assert_eq!(manager.get_stored_user(Role::Chef), None);
    }

    #[test]
    fn session_requires_access_token() {
        let (manager, store) = manager();
        assert!(manager.get_session(Role::Chef).is_none());

        seed(&store, Role::Chef, "c", "");
        let session = manager.get_session(Role::Chef).unwrap();
        assert_eq!(session.access_token, "c");
        assert_eq!(session.refresh_token.as_deref(), Some(""));
        assert_eq!(session.user, Some(serde_json::json!({"id": 1})));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_skips_network() {
        let (manager, store) = manager();
        assert!(!manager.refresh_token(Role::Admin).await);

        // An empty refresh token counts as absent.
        seed(&store, Role::Admin, "a", "");
        assert!(!manager.refresh_token(Role::Admin).await);
        assert_eq!(manager.get_stored_token(Role::Admin).as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn invalid_credentials_fail_before_network() {
        let (manager, _) = manager();
        let result = manager
            .login(&Credentials::new("nope", "pw"), Role::Admin)
            .await;
        assert!(matches!(result, Err(SessionError::Validation(_))));
    }
}
