use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid default_timeout_secs: {0} (must be a positive duration)")]
    InvalidTimeout(f64),
}

const fn default_timeout_secs() -> f64 {
    0.1
}
const fn default_lock_wait_warn_ms() -> u64 {
    100
}

/// Settings of the kinematics service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// IK timeout applied when a request asks for zero seconds.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: f64,

    /// Waiting longer than this for the scene read lock is logged.
    #[serde(default = "default_lock_wait_warn_ms")]
    pub lock_wait_warn_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            lock_wait_warn_ms: default_lock_wait_warn_ms(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match Duration::try_from_secs_f64(self.default_timeout_secs) {
            Ok(timeout) if !timeout.is_zero() => Ok(()),
            _ => Err(ConfigError::InvalidTimeout(self.default_timeout_secs)),
        }
    }

    /// Falls back to the built-in default when the field holds no usable
    /// duration, as a hand-built config may.
    pub fn default_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.default_timeout_secs)
            .ok()
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or(Duration::from_millis(100))
    }

    pub fn lock_wait_warn(&self) -> Duration {
        Duration::from_millis(self.lock_wait_warn_ms)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
