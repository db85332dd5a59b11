//! Application configuration.
//!
//! The configuration is a JSON file (by default
//! `$XDG_CONFIG_HOME/hyprevents/config.json`).  The `"general"` section lists
//! the handlers to load; every other top-level key is the configuration
//! section of the handler with that name.  Each handler validates its own
//! section against its schema when it is loaded.
//!
//! # Example
//!
//! ```json
//! {
//!   "general": { "loaded": ["workspaceswap"] },
//!   "workspaceswap": {
//!     "subscribes": ["focusedmon", "workspace", "moveworkspacev2", "custom"],
//!     "swap-ev": { "data": "^swapws (\\d+)$" }
//!   }
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Top-level configuration.
///
/// A minimal `{}` file is valid and loads no handlers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Settings that are not specific to one handler.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Per-handler sections, keyed by handler name.
    #[serde(flatten)]
    pub handlers: HashMap<String, Value>,
}

/// The `"general"` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Handlers loaded at startup, in order.
    pub loaded: Vec<String>,
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&contents).map_err(|e| match e {
            ConfigError::Parse { reason, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse configuration from a JSON string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
            path: "<string>".into(),
            reason: e.to_string(),
        })
    }

    /// The configuration section for handler `name`, if any.
    pub fn handler_section(&self, name: &str) -> Option<&Value> {
        self.handlers.get(name)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read (usually: it does not exist).
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },
    /// The file is not valid JSON or does not match the schema.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
}
