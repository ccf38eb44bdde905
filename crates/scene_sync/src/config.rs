//! Configuration
//!
//! Engine tuning is plain serde data. The [`Config`] trait adds file
//! persistence in TOML or RON (chosen by extension) so hosts can keep sync
//! settings next to their own configuration files.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File-backed configuration.
///
/// Implementors get [`load_from_file`](Config::load_from_file) and
/// [`save_to_file`](Config::save_to_file) for free; the on-disk format is
/// picked from the file extension (`.toml` or `.ron`).
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Read and parse a configuration file.
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match extension(path) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse {
                format: "RON",
                message: e.to_string(),
            }),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Serialize and write a configuration file.
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match extension(path) {
            Some("toml") => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
                format: "TOML",
                message: e.to_string(),
            })?,
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize {
                    format: "RON",
                    message: e.to_string(),
                })?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Errors from reading or writing configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("config file I/O: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents did not parse as the expected format.
    #[error("{format} parse error: {message}")]
    Parse {
        /// Format implied by the file extension.
        format: &'static str,
        /// Underlying parser message.
        message: String,
    },

    /// The configuration could not be serialized.
    #[error("{format} serialize error: {message}")]
    Serialize {
        /// Format implied by the file extension.
        format: &'static str,
        /// Underlying serializer message.
        message: String,
    },

    /// The extension is neither `.toml` nor `.ron`.
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
}

/// Default recursion limit for the dependency walk.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Synchronization engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum dependency-tree depth before a pass is aborted. Guards
    /// against cyclic or degenerate state trees; well-formed scenes are a
    /// few levels deep.
    pub max_depth: usize,
}

impl SyncConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the recursion limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("max_depth must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for SyncConfig {}
