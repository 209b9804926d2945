//! Bus configuration.
//!
//! Configuration can be built in code or loaded from TOML:
//!
//! ```toml
//! [bus]
//! name = "orders"
//! debug = true
//! clone = true
//! history_limit = 500
//!
//! [logging]
//! level = "debug"
//! json_format = false
//! ```

use crate::error::BusError;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_name() -> String {
    "rail".to_string()
}

fn default_clone() -> bool {
    true
}

fn default_history_limit() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Settings for one bus instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Display name reported in stats and logs
    #[serde(default = "default_name")]
    pub name: String,
    /// Promotes per-emission traces to debug level
    #[serde(default)]
    pub debug: bool,
    /// Give every listener its own deep copy of the payload
    #[serde(default = "default_clone")]
    pub clone: bool,
    /// Maximum retained history entries (0 keeps everything)
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            debug: false,
            clone: default_clone(),
            history_limit: default_history_limit(),
        }
    }
}

impl BusConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_clone(mut self, clone: bool) -> Self {
        self.clone = clone;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

/// Logging configuration consumed by [`setup_logging`](crate::logging::setup_logging).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailConfig {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl RailConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, BusError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BusError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| BusError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!("🔧 Loaded bus configuration from {}", path.display());
        Ok(config)
    }
}
