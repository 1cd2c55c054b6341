//! Configuration management for tiercache

pub mod schema;

pub use schema::Config;

use crate::error::{TierError, TierResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tiercache")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tiercache")
    }

    /// Mirror directory, honouring `[mirror].dir`
    pub fn mirror_dir(config: &Config) -> PathBuf {
        config
            .mirror
            .dir
            .clone()
            .unwrap_or_else(|| Self::state_dir().join("mirror"))
    }

    /// Get the event log path
    pub fn event_log_path() -> PathBuf {
        Self::state_dir().join("events.log")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> TierResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> TierResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| TierError::io(format!("reading config from {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| TierError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate().map_err(|reason| TierError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> TierResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            TierError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> TierResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TierError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure the state directory exists
    pub async fn ensure_state_dirs() -> TierResult<()> {
        let dir = Self::state_dir();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| TierError::io(format!("creating directory {}", dir.display()), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(&dir, perms)
                .map_err(|e| TierError::io("setting state dir permissions", e))?;
        }

        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.throttle.cooldown_secs, 30);
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.remote.owner_id = "user_dev_001".to_string();

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.remote.owner_id, "user_dev_001");
    }

    #[tokio::test]
    async fn invalid_file_names_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[throttle]\ncooldown_secs = \"soon\"\n").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        match err {
            TierError::ConfigInvalid { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn out_of_range_listing_ttl_is_rejected_on_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[listing]\nttl_minutes = 9223372036854775807\n").unwrap();

        let err = ConfigManager::with_path(path).load().await.unwrap_err();
        match err {
            TierError::ConfigInvalid { reason, .. } => {
                assert!(reason.contains("listing.ttl_minutes"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn mirror_dir_override() {
        let mut config = Config::default();
        assert!(ConfigManager::mirror_dir(&config).ends_with("mirror"));

        config.mirror.dir = Some(PathBuf::from("/tmp/tc-mirror"));
        assert_eq!(
            ConfigManager::mirror_dir(&config),
            PathBuf::from("/tmp/tc-mirror")
        );
    }
}
