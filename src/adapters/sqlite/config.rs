// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settings for the SQLite store.

use crate::domain::{ConfigError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of pooled connections.
pub const DEFAULT_POOL_SIZE: usize = 4;
/// Default time a writer waits for the database write lock (ms).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// File name used by [`SqliteStoreConfig::default_location`].
pub const DEFAULT_DATABASE_FILE: &str = "configuration.sqlite3";

/// SQLite journal mode.
///
/// Values map 1:1 to the `journal_mode` pragma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Write-ahead log; readers never block the writer.
    #[default]
    Wal,
    /// Rollback journal.
    Delete,
}

impl JournalMode {
    /// Returns the pragma value.
    pub fn pragma_value(self) -> &'static str {
        match self {
            JournalMode::Wal => "wal",
            JournalMode::Delete => "delete",
        }
    }
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Configuration for [`SqliteStore`](super::SqliteStore).
///
/// Only `path` is required when deserializing; every other field has a default.
///
/// # Examples
///
/// ```rust
/// use verscfg::adapters::sqlite::{JournalMode, SqliteStoreConfig};
///
/// let config = SqliteStoreConfig::new("/tmp/app.sqlite3")
///     .with_pool_size(8)
///     .with_journal_mode(JournalMode::Delete);
/// assert_eq!(config.pool_size, 8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Database file path; created if missing.
    pub path: PathBuf,
    /// Number of pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// How long a connection waits on a locked database before failing (ms).
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode.
    #[serde(default)]
    pub journal_mode: JournalMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with defaults for everything but the path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool_size: DEFAULT_POOL_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: JournalMode::default(),
        }
    }

    /// Places the database in the OS-appropriate data directory for the application.
    ///
    /// # Arguments
    ///
    /// * `app_name` - The application name
    /// * `qualifier` - The organization/qualifier (e.g., "com.example")
    pub fn default_location(app_name: &str, qualifier: &str) -> Result<Self> {
        let proj_dirs = ProjectDirs::from(qualifier, "", app_name).ok_or_else(|| {
            ConfigError::InvalidConfig {
                message: "Failed to determine project directories".to_string(),
            }
        })?;
        Ok(Self::new(proj_dirs.data_dir().join(DEFAULT_DATABASE_FILE)))
    }

    /// Parses a configuration from YAML.
    ///
    /// ```rust
    /// use verscfg::adapters::sqlite::SqliteStoreConfig;
    ///
    /// let config = SqliteStoreConfig::from_yaml_str("path: /var/lib/app/config.db\npool_size: 2").unwrap();
    /// assert_eq!(config.pool_size, 2);
    /// assert_eq!(config.busy_timeout_ms, 5_000);
    /// ```
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidConfig {
                message: format!("Failed to parse SQLite store configuration: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the number of pooled connections.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Sets the busy timeout in milliseconds.
    pub fn with_busy_timeout_ms(mut self, busy_timeout_ms: u64) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }

    /// Sets the journal mode.
    pub fn with_journal_mode(mut self, journal_mode: JournalMode) -> Self {
        self.journal_mode = journal_mode;
        self
    }

    /// Checks the configuration for values the store cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "pool_size must be greater than zero".to_string(),
            });
        }
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "path must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
