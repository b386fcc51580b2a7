use axum::{
    extract::{Path, RawQuery, State},
    http::{header::CONTENT_TYPE, Method},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use service_core::error::AppError;

use crate::error::SessionError;
use crate::models::Role;
use crate::AppState;

/// Forward `/api/{role}/{path}` to the REST API as `role`.
///
/// Entity pages (recipes, ingredients, ...) talk to the API through this
/// route so their bearer tokens never leave the session service.
pub async fn proxy_handler(
    State(state): State<AppState>,
    Path((role, path)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    method: Method,
    body: Option<Json<Value>>,
) -> Result<Response, AppError> {
    let role = role
        .parse::<Role>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut target = format!("/api/{}", path);
    if let Some(query) = query {
        target.push('?');
        target.push_str(&query);
    }

    let body = body.map(|Json(value)| value).unwrap_or(Value::Null);
    let response = match method {
        Method::GET => state.api.get(role, &target).await?,
        Method::POST => state.api.post(role, &target, &body).await?,
        Method::PUT => state.api.put(role, &target, &body).await?,
        Method::DELETE => state.api.delete(role, &target).await?,
        other => {
            return Err(AppError::BadRequest(format!(
                "Method {} is not proxied",
                other
            )))
        }
    };

    let status = response.status();
    let content_type = response.headers().get(CONTENT_TYPE).cloned();
    let bytes = response.bytes().await.map_err(SessionError::Http)?;

    let mut proxied = (status, bytes).into_response();
    if let Some(content_type) = content_type {
        proxied.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(proxied)
}
