use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PersistError;

pub const DEFAULT_REMOTE_URL: &str = "https://ddl.csbaoyan.top/config/schools.json";

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub remote_url: String,
    pub update_interval_minutes: u64,
    pub max_display_items: usize,
    pub request_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            update_interval_minutes: 10,
            max_display_items: 10,
            request_timeout_seconds: 10,
        }
    }
}

impl AppConfig {
    /// Platform config directory for the watcher, e.g. `~/.config/ddlwatch`.
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ddlwatch")
    }

    pub fn file_path(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(CONFIG_FILE)
    }

    /// Loads `config.json` from `dir`, or falls back to defaults and writes
    /// them out so the file exists for editing.
    pub fn load(dir: impl AsRef<Path>) -> Self {
        let path = Self::file_path(dir);
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "cannot load configuration, using defaults");
                let config = Self::default();
                if let Err(save_err) = config.save(&path) {
                    warn!(error = %save_err, "cannot save default configuration");
                }
                config
            }
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, PersistError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_minutes.saturating_mul(60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path());
        assert_eq!(config, AppConfig::default());
        assert!(AppConfig::file_path(dir.path()).exists());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            AppConfig::file_path(dir.path()),
            r#"{"update_interval_minutes": 30}"#,
        )
        .unwrap();

        let config = AppConfig::load(dir.path());
        assert_eq!(config.update_interval(), Duration::from_secs(1800));
        assert_eq!(config.remote_url, DEFAULT_REMOTE_URL);
        assert_eq!(config.max_display_items, 10);
    }

    #[test]
    fn oversized_interval_saturates() {
        let config = AppConfig {
            update_interval_minutes: u64::MAX,
            ..AppConfig::default()
        };
        assert_eq!(config.update_interval(), Duration::from_secs(u64::MAX));
    }
}
