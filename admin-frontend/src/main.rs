use admin_frontend::config::get_configuration;
use admin_frontend::services::SessionManager;
use admin_frontend::startup::{build_router, build_store};
use admin_frontend::AppState;
use service_core::observability::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing("admin-frontend", &configuration.telemetry)?;

    admin_frontend::services::metrics::init_metrics();

    let store = build_store(&configuration.store).map_err(|e| {
        tracing::error!("Failed to open credential store: {}", e);
        anyhow::anyhow!("Credential store error: {}", e)
    })?;

    let sessions = SessionManager::new(configuration.auth_api.clone(), store);
    let app = build_router(AppState::new(sessions));

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!(
        auth_api = %configuration.auth_api.base_url,
        "Starting admin-frontend on {}", address
    );
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
