use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable that marks the process as running under automated tests
pub const TEST_ENV_VAR: &str = "FICTIVE_TEST";

/// Delay used when a settlement does not ask for one, in milliseconds
pub const DEFAULT_DELAY_MS: u64 = 200;

/// Log configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LogConfig {
    /// Log file path, if not set, logs will be printed to stdout
    pub file: Option<String>,
    /// Log level, default is "info"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
        }
    }
}

/// Simulated latency settings
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct DelayConfig {
    /// Delay applied when the caller passes none
    #[serde(default = "default_delay_ms")]
    pub default_ms: u64,
    /// When set, every settlement completes without waiting
    #[serde(default)]
    pub test_mode: bool,
}

fn default_delay_ms() -> u64 {
    DEFAULT_DELAY_MS
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            default_ms: DEFAULT_DELAY_MS,
            test_mode: false,
        }
    }
}

impl DelayConfig {
    /// Delay configuration for test suites: zero latency.
    pub fn testing() -> Self {
        Self {
            test_mode: true,
            ..Self::default()
        }
    }

    /// Build from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Turn on test mode if `FICTIVE_TEST` is set to a truthy value.
    pub fn apply_env(&mut self) {
        self.apply_lookup(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env`](Self::apply_env), reading variables through `lookup`.
    pub fn apply_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if is_truthy(lookup(TEST_ENV_VAR).as_deref()) {
            self.test_mode = true;
        }
    }

    /// The delay a settlement actually waits for.
    ///
    /// Test mode wins over anything the caller asked for.
    pub fn effective(&self, requested_ms: Option<u64>) -> Duration {
        if self.test_mode {
            return Duration::ZERO;
        }
        Duration::from_millis(requested_ms.unwrap_or(self.default_ms))
    }
}

/// Interpret a boolean-like environment value.
pub fn is_truthy(value: Option<&str>) -> bool {
    match value {
        Some(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        None => false,
    }
}

/// Toolkit configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Settlement delay configuration
    #[serde(default)]
    pub delay: DelayConfig,

    /// Log configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;

        toml::from_str(&config_str).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Apply environment overrides on top of the loaded values
    pub fn apply_env(mut self) -> Self {
        self.delay.apply_env();
        self
    }
}
