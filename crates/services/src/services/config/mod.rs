use std::path::Path;

use thiserror::Error;

mod schema;

pub use schema::{CURRENT_CONFIG_VERSION, Config, NotificationConfig, ProjectConfig, ReportConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Will always return config, falling back to defaults on missing/invalid files.
pub async fn load_config_from_file(config_path: &Path) -> Config {
    match tokio::fs::read_to_string(config_path).await {
        Ok(raw_config) => Config::from_raw(&raw_config),
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                tracing::info!("No config file found, using defaults");
            } else {
                tracing::warn!("Failed to read config file: {}", err);
            }
            Config::default()
        }
    }
}

/// Saves the config to the given path
pub async fn save_config_to_file(config: &Config, config_path: &Path) -> Result<(), ConfigError> {
    let normalized = config.clone().normalized();
    let raw_config = serde_json::to_string_pretty(&normalized)?;
    tokio::fs::write(config_path, raw_config).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(load_config_from_file(&path).await, Config::default());

        let mut config = Config::default();
        config.projects.admin_override = true;
        config.notifications.realtime_enabled = false;
        save_config_to_file(&config, &path).await.unwrap();

        let loaded = load_config_from_file(&path).await;
        assert!(loaded.projects.admin_override);
        assert!(!loaded.notifications.realtime_enabled);
    }
}
