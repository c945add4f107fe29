//! Engine configuration.
//!
//! Compiled defaults cover every knob; an optional TOML file with a
//! `[sync]` section overrides individual fields. A missing file is not
//! an error (defaults apply); a file that exists but cannot be read or
//! parsed is.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    sync: SyncFileConfig,
}

/// `[sync]` section of the config file (all fields optional for
/// partial overrides).
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SyncFileConfig {
    cache_ttl_secs: Option<u64>,
    read_timeout_secs: Option<u64>,
    update_timeout_secs: Option<u64>,
    create_timeout_secs: Option<u64>,
    event_capacity: Option<usize>,
}

/// Resolved engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How long a cache entry stays fresh after a fetch.
    pub cache_ttl: Duration,
    /// Budget for reading a project's task list.
    pub read_timeout: Duration,
    /// Budget for partial updates (status moves, assignment changes).
    pub update_timeout: Duration,
    /// Budget for task creation.
    pub create_timeout: Duration,
    /// Capacity of the stale-project event channel.
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            read_timeout: Duration::from_secs(8),
            update_timeout: Duration::from_secs(10),
            create_timeout: Duration::from_secs(15),
            event_capacity: 64,
        }
    }
}

impl SyncConfig {
    /// Loads configuration from the given TOML file, layering it over
    /// the compiled defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadFile`] if the file cannot be read or
    /// [`ConfigError::ParseToml`] if its contents are not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&contents)?;
        Ok(Self::default().overlaid(&file.sync))
    }

    /// Like [`Self::from_file`], but a missing file yields the defaults
    /// instead of an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] only for files that exist but cannot be
    /// read or parsed.
    pub fn from_file_if_present(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    fn overlaid(mut self, file: &SyncFileConfig) -> Self {
        if let Some(secs) = file.cache_ttl_secs {
            self.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = file.read_timeout_secs {
            self.read_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.update_timeout_secs {
            self.update_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.create_timeout_secs {
            self.create_timeout = Duration::from_secs(secs);
        }
        if let Some(capacity) = file.event_capacity {
            self.event_capacity = capacity;
        }
        self
    }
}
