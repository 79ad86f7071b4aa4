//! # Control-Plane Configuration
//!
//! Tunables for identity minting, actor lineage, argument resolution,
//! profiling and logging. Every section has working defaults so an empty
//! configuration is valid.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use taskspec_core::config::{ConfigLoader, ControlPlaneConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Defaults overlaid with TASKSPEC_* variables
//! let config = ControlPlaneConfig::from_env()?;
//!
//! // Or: optional TOML file plus TASKSPEC__SECTION__KEY variables
//! let config = ConfigLoader::load(None)?;
//! println!("poll interval: {:?}", config.resolver.poll_interval());
//! # Ok(())
//! # }
//! ```

pub mod loader;

use crate::error::{ControlPlaneError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use loader::ConfigLoader;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    pub identity: IdentityConfig,
    pub lineage: LineageConfig,
    pub resolver: ResolverConfig,
    pub profiling: ProfilingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Draws attempted before minting an actor id gives up
    pub max_mint_attempts: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            max_mint_attempts: 16,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageConfig {
    /// Reconstruction budget for actors created without an explicit one
    pub default_max_actor_reconstructions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub poll_interval_ms: u64,
    /// Upper bound on waiting for an object; `None` waits until cancelled
    pub max_wait_ms: Option<u64>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            max_wait_ms: None,
        }
    }
}

impl ResolverConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilingConfig {
    pub enabled: bool,
    pub flush_interval_ms: u64,
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            flush_interval_ms: 1000,
        }
    }
}

impl ProfilingConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `taskspec_core=debug`
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ControlPlaneConfig {
    pub fn validate(&self) -> Result<()> {
        if self.identity.max_mint_attempts == 0 {
            return Err(ControlPlaneError::Configuration(
                "identity.max_mint_attempts must be at least 1".to_string(),
            ));
        }
        if self.resolver.poll_interval_ms == 0 {
            return Err(ControlPlaneError::Configuration(
                "resolver.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.profiling.flush_interval_ms == 0 {
            return Err(ControlPlaneError::Configuration(
                "profiling.flush_interval_ms must be positive".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ControlPlaneError::Configuration(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Defaults overlaid with `TASKSPEC_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("TASKSPEC_MAX_MINT_ATTEMPTS") {
            config.identity.max_mint_attempts = parse_var("max_mint_attempts", &value)?;
        }
        if let Some(value) = lookup("TASKSPEC_MAX_ACTOR_RECONSTRUCTIONS") {
            config.lineage.default_max_actor_reconstructions =
                parse_var("default_max_actor_reconstructions", &value)?;
        }
        if let Some(value) = lookup("TASKSPEC_RESOLVER_POLL_INTERVAL_MS") {
            config.resolver.poll_interval_ms = parse_var("poll_interval_ms", &value)?;
        }
        if let Some(value) = lookup("TASKSPEC_RESOLVER_MAX_WAIT_MS") {
            config.resolver.max_wait_ms = Some(parse_var("max_wait_ms", &value)?);
        }
        if let Some(value) = lookup("TASKSPEC_PROFILING_ENABLED") {
            config.profiling.enabled = parse_var("profiling_enabled", &value)?;
        }
        if let Some(value) = lookup("TASKSPEC_PROFILE_FLUSH_INTERVAL_MS") {
            config.profiling.flush_interval_ms = parse_var("flush_interval_ms", &value)?;
        }
        if let Some(value) = lookup("TASKSPEC_LOG_LEVEL") {
            config.logging.level = value;
        }
        if let Some(value) = lookup("TASKSPEC_LOG_JSON") {
            config.logging.json = parse_var("log_json", &value)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| ControlPlaneError::Configuration(format!("Invalid {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = ControlPlaneConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolver.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.resolver.max_wait(), None);
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TASKSPEC_MAX_MINT_ATTEMPTS", "4"),
            ("TASKSPEC_RESOLVER_MAX_WAIT_MS", "250"),
            ("TASKSPEC_LOG_JSON", "true"),
        ]
        .into_iter()
        .collect();

        let config =
            ControlPlaneConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.identity.max_mint_attempts, 4);
        assert_eq!(config.resolver.max_wait(), Some(Duration::from_millis(250)));
        assert!(config.logging.json);
    }

    #[test]
    fn test_invalid_override_is_configuration_error() {
        let result = ControlPlaneConfig::from_lookup(|name| {
            (name == "TASKSPEC_RESOLVER_POLL_INTERVAL_MS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ControlPlaneError::Configuration(_))));
    }

    #[test]
    fn test_zero_mint_attempts_rejected() {
        let mut config = ControlPlaneConfig::default();
        config.identity.max_mint_attempts = 0;
        assert!(config.validate().is_err());
    }
}
