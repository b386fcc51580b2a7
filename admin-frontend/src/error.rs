use crate::models::Role;
use crate::store::StoreError;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The API rejected the login; carries the message to show the user.
    #[error("{0}")]
    LoginFailed(String),

    #[error("Invalid credentials: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Malformed response from auth API: {0}")]
    MalformedResponse(String),

    #[error("No stored session for role {0}")]
    NotAuthenticated(Role),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to serialize session data: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::LoginFailed(msg) => AppError::Unauthorized(msg),
            SessionError::NotAuthenticated(role) => {
                AppError::Unauthorized(format!("Not logged in as {}", role))
            }
            SessionError::Validation(errors) => AppError::ValidationError(errors),
            SessionError::MalformedResponse(msg) => AppError::BadGateway(msg),
            SessionError::Http(e) => AppError::BadGateway(e.to_string()),
            other => AppError::InternalError(anyhow::Error::new(other)),
        }
    }
}
