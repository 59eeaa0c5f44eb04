//! Manager configuration.
//!
//! Settings can be built in code or read from TOML:
//!
//! ```toml
//! register_default_converters = true
//! flag_terminator = true
//! max_suggestions = 20
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a [`ManagerConfig`] could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The manager config file could not be read.
    #[error("Cannot read manager config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has keys the manager does not know.
    #[error("Invalid manager config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A setting parsed but its value is unusable.
    #[error("Invalid value for '{key}' in manager config: {reason}")]
    InvalidSetting { key: &'static str, reason: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Behavior switches for a [`CommandManager`](crate::CommandManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// Register converters for `String`, numbers, `bool` and `char` on
    /// construction.
    #[serde(default = "default_true")]
    pub register_default_converters: bool,

    /// Treat a lone `--` as the end of flags for the current command.
    #[serde(default = "default_true")]
    pub flag_terminator: bool,

    /// Upper bound on suggestions returned per query.
    #[serde(default)]
    pub max_suggestions: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            register_default_converters: true,
            flag_terminator: true,
            max_suggestions: None,
        }
    }
}

impl ManagerConfig {
    /// Parse from TOML string.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Self::parse(content, PathBuf::from("<string>"))
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path.to_path_buf())
    }

    fn parse(content: &str, path: PathBuf) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::Parse { path, source: e })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but make no sense.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_suggestions == Some(0) {
            return Err(ConfigError::InvalidSetting {
                key: "max_suggestions",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}
