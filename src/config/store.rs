use std::path::Path;
use tracing::{debug, info};

use super::AppConfig;
use crate::error::{AppError, Result};

/// Load configuration from a JSON file
///
/// A missing file yields the built-in defaults. Sections and fields left out of the
/// file keep their default values. The result is validated before it is returned.
pub fn load(path: &Path) -> Result<AppConfig> {
    let config = match std::fs::read_to_string(path) {
        Ok(json) => {
            debug!("Loading configuration from {}", path.display());
            serde_json::from_str::<AppConfig>(&json)
                .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(
                "Configuration file {} not found, using defaults",
                path.display()
            );
            AppConfig::default()
        }
        Err(e) => return Err(e.into()),
    };

    config.validate()?;
    Ok(config)
}

/// Write configuration as pretty-printed JSON
pub fn save(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.controller.tick_ms, 300);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("etc/config.json");

        let mut config = AppConfig::default();
        config.transfer.copy_timeout_secs = Some(3600);
        config.sounds.dir = "/opt/sounds".to_string();
        save(&path, &config).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.transfer.copy_timeout_secs, Some(3600));
        assert_eq!(loaded.sounds.dir, "/opt/sounds");
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "controller": { "tick_ms": 0 } }"#).unwrap();
        assert!(load(&path).is_err());
    }
}
