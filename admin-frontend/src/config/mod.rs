use serde::Deserialize;
use service_core::observability::TelemetrySettings;
use std::path::PathBuf;
use std::time::Duration;

pub const CRATE_NAME: &str = "admin-frontend";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth_api: AuthApiSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone)]
pub struct AuthApiSettings {
    /// Base URL of the Saveful REST API, without a trailing slash.
    pub base_url: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl AuthApiSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout_secs: None,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct StoreSettings {
    #[serde(default)]
    pub kind: StoreKind,
    /// Required when `kind` is `file`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    service_core::config::load_configuration(CRATE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_configuration_uses_memory_store() {
        let settings = get_configuration().expect("config/base.yaml loads");

        assert_eq!(settings.store.kind, StoreKind::Memory);
        assert_eq!(settings.auth_api.request_timeout(), None);
    }
}
