use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::FeedError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub feed: FeedConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Continuous play time before a view is recorded.
    pub dwell_ms: u64,
    pub visibility_threshold: f64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            request_timeout_seconds: 10,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            dwell_ms: 3_000,
            visibility_threshold: 0.7,
        }
    }
}

impl PlaybackConfig {
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }
}

impl AppConfig {
    /// Default location: `<config_dir>/switchat/config.json`.
    pub fn config_file_path() -> Result<PathBuf, FeedError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| FeedError::Config("no configuration directory on this platform".into()))?;
        Ok(config_dir.join("switchat").join("config.json"))
    }

    /// Loads the default file, or writes and returns the defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        let loaded = Self::config_file_path().and_then(|path| Self::from_file(&path));
        match loaded {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "could not load configuration, using defaults");
                let default_config = Self::default();
                if let Err(save_err) = default_config.save() {
                    warn!(error = %save_err, "could not save default configuration");
                }
                default_config
            }
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), FeedError> {
        self.save_to(Self::config_file_path()?)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), FeedError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), FeedError> {
        if self.feed.page_size == 0 {
            return Err(FeedError::Config("feed.page_size must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.playback.visibility_threshold) {
            return Err(FeedError::Config(format!(
                "playback.visibility_threshold {} is outside 0..=1",
                self.playback.visibility_threshold
            )));
        }
        Ok(())
    }
}
