//! Configuration types for the replay server.

mod aliases;
mod listen;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use aliases::{AliasConfig, MatchOptions};
pub use listen::{ListenConfig, TlsConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("archive_path is required")]
    MissingArchivePath,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReplayConfig {
    /// HAR file to serve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_path: Option<PathBuf>,
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub aliases: AliasConfig,
    #[serde(default)]
    pub matching: MatchOptions,
}

impl ReplayConfig {
    /// Config for serving `archive_path` with every other setting at its default.
    pub fn for_archive(archive_path: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: Some(archive_path.into()),
            ..Self::default()
        }
    }

    /// Read a YAML (or JSON) config file. The result is not validated, so
    /// command-line overrides can still fill in missing fields.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.archive_path {
            Some(path) if !path.as_os_str().is_empty() => Ok(()),
            _ => Err(ConfigError::MissingArchivePath),
        }
    }
}
