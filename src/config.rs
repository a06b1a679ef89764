use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_REFRESH_DEBOUNCE_WAIT_MS: u64 = 100;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Options accepted by `initialize`, in the embedding environment's
/// `{ "force": ..., "refreshDebounceWait": ... }` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuggyfillConfig {
    /// Activate even when the environment is not the buggy target.
    pub force: bool,
    /// Quiet period in milliseconds before a viewport change triggers a
    /// rewrite. `0` selects the default.
    pub refresh_debounce_wait: u64,
}

impl Default for BuggyfillConfig {
    fn default() -> Self {
        Self {
            force: false,
            refresh_debounce_wait: DEFAULT_REFRESH_DEBOUNCE_WAIT_MS,
        }
    }
}

impl BuggyfillConfig {
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }

    pub fn with_refresh_debounce_wait(mut self, wait_ms: u64) -> Self {
        self.refresh_debounce_wait = wait_ms;
        self
    }

    pub fn debounce_wait(&self) -> Duration {
        match self.refresh_debounce_wait {
            0 => Duration::from_millis(DEFAULT_REFRESH_DEBOUNCE_WAIT_MS),
            wait => Duration::from_millis(wait),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
