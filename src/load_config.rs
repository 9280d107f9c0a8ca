use crate::config::Config;
use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Environment variable carrying the (secret) Firebase ID token.
pub const AUTH_TOKEN_ENV: &str = "FIREBASE_AUTH_TOKEN";

/// Loads a static YAML config file (no secrets) and injects the auth token from the environment.
/// A missing token is not an error: requests are then sent unauthenticated.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let mut config: Config = if config_content.trim().is_empty() {
        info!(config_path = ?path_ref, "Config file is empty, using defaults");
        Config::default()
    } else {
        match serde_yaml::from_str(&config_content) {
            Ok(conf) => {
                info!(config_path = ?path_ref, "Parsed config YAML successfully");
                conf
            }
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
            }
        }
    };

    if let Some(firebase) = config.firebase.as_mut() {
        if firebase.project_id.trim().is_empty() || firebase.storage_bucket.trim().is_empty() {
            error!("firebase.project_id and firebase.storage_bucket must not be empty");
            anyhow::bail!("firebase.project_id and firebase.storage_bucket must not be empty");
        }
        match std::env::var(AUTH_TOKEN_ENV) {
            Ok(token) => {
                info!("{AUTH_TOKEN_ENV} found in env");
                firebase.auth_token = Some(token);
            }
            Err(_) => info!("{AUTH_TOKEN_ENV} not set, Firebase requests will be unauthenticated"),
        }
    }

    config.trace_loaded();
    Ok(config)
}
