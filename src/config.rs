//! Application configuration, read from `<config dir>/journal/config.toml`.
//!
//! ```toml
//! data_dir = "/home/me/journal"
//! log_level = "info"
//!
//! [autosave]
//! quiet_period_ms = 2000
//!
//! [retry]
//! max_attempts = 5
//! backoff = "linear"
//!
//! [drive]
//! folder_name = "Journal Entries"
//! ```
//!
//! Every key is optional. `JOURNAL_DATA_DIR` and `JOURNAL_DRIVE_TOKEN`
//! override the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::SqliteStorage;
use crate::sync::{AutosaveConfig, DriveConfig, RetryPolicy};

pub const ENV_DATA_DIR: &str = "JOURNAL_DATA_DIR";
pub const ENV_DRIVE_TOKEN: &str = "JOURNAL_DRIVE_TOKEN";

const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid config value: {0}")]
    Invalid(String),
    #[error("Could not determine a {0} directory")]
    NoDirectory(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the entry database
    pub data_dir: Option<PathBuf>,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: Option<String>,
    pub autosave: AutosaveConfig,
    pub retry: RetryPolicy,
    pub drive: DriveConfig,
}

impl AppConfig {
    /// Default location of the config file
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("journal").join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoDirectory("config"))
    }

    /// Read the config file if it exists, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay non-empty environment values
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(dir) = non_empty(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(token) = non_empty(ENV_DRIVE_TOKEN) {
            self.drive.access_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.autosave.quiet_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "autosave.quiet_period_ms must be positive".to_string(),
            ));
        }
        if self.drive.folder_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "drive.folder_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => SqliteStorage::default_data_dir().map_err(|_| ConfigError::NoDirectory("data")),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}
