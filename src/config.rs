//! Engine Configuration Module
//!
//! Defaults applied to every run started from the CLI or through
//! [`EngineConfig::run_config`]. Config is stored in
//! `~/.config/wavegraph/config.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`WAVEGRAPH_MAX_ITERATIONS`, `WAVEGRAPH_TIMEOUT_MS`,
//!    `WAVEGRAPH_COMPONENT_TIMEOUT_MS`, `WAVEGRAPH_CONCURRENCY_LIMIT`)
//! 2. Config file
//! 3. Defaults
//!
//! ```toml
//! [run]
//! max_iterations = 20
//! timeout_ms = 60000
//! sequential = false
//!
//! [run.component_limits]
//! generator = 5
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WaveError};
use crate::runtime::{RunConfig, DEFAULT_MAX_ITERATIONS};

pub const ENV_MAX_ITERATIONS: &str = "WAVEGRAPH_MAX_ITERATIONS";
pub const ENV_TIMEOUT_MS: &str = "WAVEGRAPH_TIMEOUT_MS";
pub const ENV_COMPONENT_TIMEOUT_MS: &str = "WAVEGRAPH_COMPONENT_TIMEOUT_MS";
pub const ENV_CONCURRENCY_LIMIT: &str = "WAVEGRAPH_CONCURRENCY_LIMIT";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub run: RunDefaults,
}

/// Defaults for [`RunConfig`]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunDefaults {
    pub max_iterations: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub component_timeout_ms: Option<u64>,
    pub concurrency_limit: Option<usize>,
    #[serde(default)]
    pub sequential: bool,
    #[serde(default)]
    pub component_limits: BTreeMap<String, u32>,
}

impl EngineConfig {
    /// Returns `~/.config/wavegraph/` on Unix, `%APPDATA%/wavegraph/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wavegraph")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load the default config file, then apply environment overrides
    ///
    /// A missing file is not an error.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.with_env()
    }

    /// Load an explicit config file; it must exist
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| WaveError::ConfigError {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| WaveError::ConfigError {
            reason: format!("Failed to parse config file: {}", e),
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| WaveError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values. Empty
    /// variables are ignored; unparsable ones are an error.
    pub fn with_env(mut self) -> Result<Self> {
        if let Some(v) = env_value(ENV_MAX_ITERATIONS)? {
            self.run.max_iterations = Some(v);
        }
        if let Some(v) = env_value(ENV_TIMEOUT_MS)? {
            self.run.timeout_ms = Some(v);
        }
        if let Some(v) = env_value(ENV_COMPONENT_TIMEOUT_MS)? {
            self.run.component_timeout_ms = Some(v);
        }
        if let Some(v) = env_value(ENV_CONCURRENCY_LIMIT)? {
            self.run.concurrency_limit = Some(v);
        }
        Ok(self)
    }

    /// Build the default [`RunConfig`] and check it
    pub fn run_config(&self) -> Result<RunConfig> {
        let run = &self.run;
        let mut config = RunConfig::default()
            .with_max_iterations(run.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS));
        if let Some(ms) = run.timeout_ms {
            config = config.with_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = run.component_timeout_ms {
            config = config.with_component_timeout(Duration::from_millis(ms));
        }
        if let Some(limit) = run.concurrency_limit {
            config = config.with_concurrency_limit(limit);
        }
        if run.sequential {
            config = config.sequential();
        }
        for (component, limit) in &run.component_limits {
            config = config.with_component_limit(component.clone(), *limit);
        }
        config.validate()?;
        Ok(config)
    }
}

fn env_value<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw.trim().parse().map(Some).map_err(|e| WaveError::ConfigError {
            reason: format!("{}='{}': {}", name, raw, e),
        }),
        Err(_) => Ok(None),
    }
}
