use std::path::Path;
use std::time::Duration;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::core::bluetooth::DEFAULT_SCAN_DURATION_SECS;
use crate::core::bluetooth::registry::DedupPolicy;
use crate::error::Result;
use crate::utils::ensure_directory_exists;

const CONFIG_FILE_NAME: &str = "browser_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// How long one scan cycle runs before scanning stops on its own.
    pub scan_duration_secs: u64,

    /// Advertisements weaker than this RSSI (dBm) are not listed.
    pub min_rssi: Option<i16>,

    /// Treat a new identifier with the same advertised name as an
    /// existing peripheral and replace it.
    pub dedup_by_name: bool,

    /// Default log filter; `RUST_LOG` takes precedence.
    pub log_level: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            scan_duration_secs: DEFAULT_SCAN_DURATION_SECS,
            min_rssi: None,
            dedup_by_name: false,
            log_level: "info".to_string(),
        }
    }
}

impl BrowserConfig {
    pub fn scan_duration(&self) -> Duration {
        Duration::from_secs(self.scan_duration_secs)
    }

    pub fn dedup_policy(&self) -> DedupPolicy {
        if self.dedup_by_name {
            DedupPolicy::IdentifierThenName
        } else {
            DedupPolicy::Identifier
        }
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }

    /// Loads the config from `config_dir`, falling back to defaults.
    pub async fn load_config(config_dir: &Path) -> Result<Self> {
        let file_path = config_dir.join(CONFIG_FILE_NAME);
        let file_path_str = file_path.to_string_lossy().into_owned();

        if !file_path.exists() {
            warn!(
                "Config file not found at {:?}, using default.",
                file_path_str
            );
            return Ok(Self::default());
        }

        let config_json = fs::read_to_string(file_path).await?;
        let config: Self = serde_json::from_str(&config_json)?;

        info!("Config loaded from {:?}", file_path_str);
        Ok(config)
    }

    /// Saves the config into `config_dir`.
    pub async fn save_config(&self, config_dir: &Path) -> Result<()> {
        ensure_directory_exists(config_dir).await?;

        let file_path = config_dir.join(CONFIG_FILE_NAME);
        let file_path_str = file_path.to_string_lossy().into_owned();

        let config_json = match serde_json::to_string_pretty(&self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize browser config to JSON: {}", e);
                return Err(e.into());
            }
        };

        fs::write(&file_path, config_json).await?;

        info!("Browser config saved to {:?}.", file_path_str);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrowserError;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BrowserConfig::load_config(dir.path()).await.unwrap();
        assert_eq!(config, BrowserConfig::default());
        assert_eq!(config.scan_duration(), Duration::from_secs(2));
        assert_eq!(config.dedup_policy(), DedupPolicy::Identifier);
    }

    #[tokio::test]
    async fn saved_config_is_loaded_back() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("ble-service-browser");
        let config = BrowserConfig {
            scan_duration_secs: 10,
            min_rssi: Some(-80),
            dedup_by_name: true,
            log_level: "debug".to_string(),
        };

        config.save_config(&nested).await.unwrap();
        let loaded = BrowserConfig::load_config(&nested).await.unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.dedup_policy(), DedupPolicy::IdentifierThenName);
        assert_eq!(loaded.level_filter(), log::LevelFilter::Debug);
    }

    #[tokio::test]
    async fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{ "min_rssi": -70 }"#)
            .await
            .unwrap();

        let loaded = BrowserConfig::load_config(dir.path()).await.unwrap();

        assert_eq!(loaded.min_rssi, Some(-70));
        assert_eq!(loaded.scan_duration_secs, DEFAULT_SCAN_DURATION_SECS);
    }

    #[tokio::test]
    async fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{ scan_duration_secs: ")
            .await
            .unwrap();

        let result = BrowserConfig::load_config(dir.path()).await;

        assert!(matches!(result, Err(BrowserError::Config(_))));
    }

    #[tokio::test]
    async fn unwritable_location_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-directory");
        fs::write(&blocker, "").await.unwrap();

        let result = BrowserConfig::default().save_config(&blocker).await;

        assert!(matches!(result, Err(BrowserError::Io(_))));
    }
}
