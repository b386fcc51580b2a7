use config::{Config, ConfigError, Environment, File};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Environment variable that overrides where `base.yaml` is looked up.
pub const CONFIG_DIR_ENV: &str = "APP_CONFIG_DIR";

/// Locate the `config/` directory of a workspace crate.
///
/// Works both when the binary is started from the crate directory and from
/// the workspace root.
pub fn configuration_directory(crate_name: &str) -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let base_path = std::env::current_dir().map_err(|e| {
        ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;

    if base_path.ends_with(crate_name) {
        Ok(base_path.join("config"))
    } else {
        Ok(base_path.join(crate_name).join("config"))
    }
}

/// Load `config/base.yaml` for the given crate, overlaid with `APP_*`
/// environment variables (`APP_AUTH_API__BASE_URL=...`).
pub fn load_configuration<T: DeserializeOwned>(crate_name: &str) -> Result<T, ConfigError> {
    dotenvy::dotenv().ok();

    let configuration_directory = configuration_directory(crate_name)?;

    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<T>()
}
