use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use service_core::error::AppError;

use crate::models::{Credentials, LoginOutcome, Role};
use crate::AppState;

#[derive(Serialize)]
pub struct RefreshResult {
    pub refreshed: bool,
}

#[derive(Serialize)]
pub struct ValidateResult {
    pub valid: bool,
}

#[derive(Serialize)]
pub struct SessionInfo {
    pub role: Role,
    pub authenticated: bool,
    pub user: Option<Value>,
}

fn parse_role(role: &str) -> Result<Role, AppError> {
    role.parse::<Role>()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

pub async fn login_handler(
    State(state): State<AppState>,
    Path(role): Path<String>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginOutcome>, AppError> {
    let role = parse_role(&role)?;
    let outcome = state.sessions.login(&credentials, role).await?;
    Ok(Json(outcome))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Result<StatusCode, AppError> {
    let role = parse_role(&role)?;
    state.sessions.logout(Some(role));
    tracing::info!(role = %role, "Logged out");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn logout_all_handler(State(state): State<AppState>) -> StatusCode {
    state.sessions.logout(None);
    tracing::info!("Logged out all roles");
    StatusCode::NO_CONTENT
}

pub async fn refresh_handler(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Result<Json<RefreshResult>, AppError> {
    let role = parse_role(&role)?;
    let refreshed = state.sessions.refresh_token(role).await;
    Ok(Json(RefreshResult { refreshed }))
}

pub async fn validate_handler(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Result<Json<ValidateResult>, AppError> {
    let role = parse_role(&role)?;
    let valid = match state.sessions.get_stored_token(role) {
        Some(token) => state.sessions.validate_token(&token, role).await,
        None => false,
    };
    Ok(Json(ValidateResult { valid }))
}

pub async fn session_handler(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Result<Json<SessionInfo>, AppError> {
    let role = parse_role(&role)?;
    let session = state
        .sessions
        .get_session(role)
        .ok_or_else(|| AppError::Unauthorized(format!("Not logged in as {}", role)))?;

    Ok(Json(SessionInfo {
        role,
        authenticated: true,
        user: session.user,
    }))
}
