use axum::{
    middleware::from_fn,
    routing::{any, get, post},
    Router,
};
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::{StoreKind, StoreSettings};
use crate::handlers::{
    app::health_check,
    auth::{
        login_handler, logout_all_handler, logout_handler, refresh_handler, session_handler,
        validate_handler,
    },
    metrics::metrics,
    proxy::proxy_handler,
};
use crate::store::{CredentialStore, FileStore, MemoryStore, StoreError};
use crate::AppState;

/// Build the credential store described by the configuration.
pub fn build_store(settings: &StoreSettings) -> Result<Arc<dyn CredentialStore>, StoreError> {
    match settings.kind {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::File => {
            let path = settings
                .path
                .clone()
                .unwrap_or_else(|| "credentials.json".into());
            Ok(Arc::new(FileStore::open(path)?))
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/auth/logout", post(logout_all_handler))
        .route("/auth/:role/login", post(login_handler))
        .route("/auth/:role/logout", post(logout_handler))
        .route("/auth/:role/refresh", post(refresh_handler))
        .route("/auth/:role/validate", get(validate_handler))
        .route("/auth/:role/session", get(session_handler))
        .route("/api/:role/*path", any(proxy_handler))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri().path(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
