// Config file loading and path resolution

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::core::error::{MeterError, Result};
use crate::models::config_model::MeterConfig;
use crate::utils::platform;

/// Loads, resolves and validates the configuration.
///
/// Without a file every default applies. Relative paths are placed under
/// `data_dir`, falling back to the platform data directory.
pub async fn load_config(path: Option<&Path>) -> Result<MeterConfig> {
    let mut config = match path {
        Some(file_path) => {
            let data = fs::read_to_string(file_path).await.map_err(|e| {
                MeterError::Config(format!("cannot read {}: {e}", file_path.display()))
            })?;
            let parsed: MeterConfig = serde_json::from_str(&data)?;
            info!("Config loaded from {}", file_path.display());
            parsed
        }
        None => MeterConfig::default(),
    };

    resolve_paths(&mut config);
    config.validate()?;
    Ok(config)
}

pub fn resolve_paths(config: &mut MeterConfig) {
    let base = config.data_dir.clone().unwrap_or_else(platform::data_dir);
    let paths = &mut config.paths;
    for path in [
        &mut paths.readings,
        &mut paths.minute_table,
        &mut paths.hour_table,
        &mut paths.log_file,
    ] {
        let resolved = under(&base, path);
        *path = resolved;
    }
    config.data_dir = Some(base);
}

/// Creates every directory the configured files live in.
pub async fn ensure_dirs(config: &MeterConfig) -> Result<()> {
    let paths = &config.paths;
    for file in [&paths.readings, &paths.minute_table, &paths.hour_table, &paths.log_file] {
        if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

fn under(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        let hours = dir.path().join("elsewhere").join("hours.csv");
        let file = dir.path().join("meter.json");
        let json = serde_json::json!({
            "data_dir": data,
            "paths": { "hour_table": hours }
        });
        std::fs::write(&file, json.to_string()).unwrap();

        let config = load_config(Some(&file)).await.unwrap();
        assert_eq!(config.paths.readings, data.join("readings.txt"));
        assert_eq!(config.paths.minute_table, data.join("minute_agg.csv"));
        assert_eq!(config.paths.hour_table, hours);

        assert!(!data.exists());
        ensure_dirs(&config).await.unwrap();
        assert!(data.is_dir());
        assert!(dir.path().join("elsewhere").is_dir());
    }

    #[tokio::test]
    async fn test_missing_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("absent.json"))).await.unwrap_err();
        assert!(matches!(err, MeterError::Config(_)));
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("meter.json");
        std::fs::write(&file, "{ not json").unwrap();
        assert!(matches!(load_config(Some(&file)).await, Err(MeterError::Json(_))));
    }

    #[tokio::test]
    async fn test_defaults_without_file() {
        let config = load_config(None).await.unwrap();
        let base = config.data_dir.clone().unwrap();
        assert_eq!(config.paths.readings, base.join("readings.txt"));
        assert_eq!(config.paths.log_file, base.join("app.log"));
    }
}
