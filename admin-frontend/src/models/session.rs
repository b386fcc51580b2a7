use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a successful `POST /api/auth/{role}/login`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Value,
}

/// Body of a successful `POST /api/auth/refresh`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Error payload the API returns on failed requests.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .filter(|message| !message.trim().is_empty())
    }
}

/// What `login` hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub success: bool,
    pub token: String,
    pub user: Value,
}

/// A role's stored session, as read back from the credential store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_response_tolerates_missing_fields() {
        let body: RefreshResponse = serde_json::from_str(r#"{"accessToken":"new"}"#).unwrap();
        assert_eq!(body.access_token.as_deref(), Some("new"));
        assert!(body.refresh_token.is_none());

        let empty: RefreshResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.access_token.is_none());
    }

    #[test]
    fn error_body_prefers_message() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"message":"Invalid credentials","error":"x"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invalid credentials"));

        let blank = ApiErrorBody {
            message: Some(" ".into()),
            error: None,
        };
        assert!(blank.into_message().is_none());
    }
}
