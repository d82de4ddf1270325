//! Process configuration for rollcall.
//!
//! This is where the database lives and how the feed, capture sessions and
//! reports behave. It is separate from [`Settings`](crate::Settings), which
//! is user data persisted alongside the records.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Longest report window accepted from configuration, in days.
pub const MAX_WINDOW_DAYS: u32 = 36_600;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "rollcall";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "rollcall.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "ROLLCALL_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ROLLCALL_`, sections separated by
///    `__`, e.g. `ROLLCALL_SESSION__DETECTION_INTERVAL_MS`)
/// 2. TOML config file at `~/.config/rollcall/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Live feed configuration.
    pub feed: FeedConfig,
    /// Capture session configuration.
    pub session: SessionConfig,
    /// Report configuration.
    pub report: ReportConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/rollcall/rollcall.db`
    pub database_path: Option<PathBuf>,
}

/// Live feed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Maximum entries retained.
    pub capacity: usize,
    /// Entries shown by default.
    pub display_count: usize,
}

/// Capture session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Interval between detection polls in milliseconds.
    pub detection_interval_ms: u64,
    /// Chance that a poll detects someone, between 0 and 1.
    pub detection_probability: f64,
    /// Stop after this many detections. 0 runs until interrupted.
    pub max_detections: usize,
}

/// Report configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Days covered by a report when no date range is given.
    pub default_window_days: u32,
    /// Records shown in a student profile.
    pub history_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            capacity: crate::feed::DEFAULT_CAPACITY,
            display_count: 10,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            detection_interval_ms: 2000,
            detection_probability: 0.3,
            max_detections: 0,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_window_days: 30,
            history_limit: crate::engine::DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.feed.capacity == 0 {
            return Err(Error::ConfigValidation {
                message: "feed.capacity must be greater than 0".to_string(),
            });
        }

        if self.session.detection_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "session.detection_interval_ms must be greater than 0".to_string(),
            });
        }

        let p = self.session.detection_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::ConfigValidation {
                message: format!("session.detection_probability must be between 0 and 1, got {p}"),
            });
        }

        let days = self.report.default_window_days;
        if days > MAX_WINDOW_DAYS {
            return Err(Error::ConfigValidation {
                message: format!(
                    "report.default_window_days must be at most {MAX_WINDOW_DAYS}, got {days}"
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the detection poll interval as a Duration.
    #[must_use]
    pub fn detection_interval(&self) -> Duration {
        Duration::from_millis(self.session.detection_interval_ms)
    }
}
