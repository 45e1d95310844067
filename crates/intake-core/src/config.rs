//! Runtime configuration, loaded from TOML.
//!
//! ```toml
//! status_capacity = 64
//! log_status_events = true
//! log_filter = "intake_core=debug,info"
//! connect_delay_ms = 100
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::IntakeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntakeConfig {
    /// Per-subscriber buffer of the status broadcast. Slow subscribers lag past this.
    pub status_capacity: usize,
    /// Install a listener that writes every worker status callback to the log.
    pub log_status_events: bool,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,
    /// How long the demo binary waits before connecting its worker.
    pub connect_delay_ms: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            status_capacity: 64,
            log_status_events: true,
            log_filter: "info".to_string(),
            connect_delay_ms: 100,
        }
    }
}

impl IntakeConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, IntakeError> {
        let config: Self = toml::from_str(raw).map_err(|e| IntakeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, IntakeError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), IntakeError> {
        if self.status_capacity == 0 {
            return Err(IntakeError::Config("status_capacity must be greater than 0".into()));
        }
        if self.log_filter.trim().is_empty() {
            return Err(IntakeError::Config("log_filter must not be empty".into()));
        }
        Ok(())
    }
}
