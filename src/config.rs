//! TOML configuration for the resolver and the evaluator.
//!
//! ```toml
//! [dns]
//! timeout_secs = 3
//! attempts = 1
//! nameservers = ["192.0.2.53"]
//!
//! [spf]
//! short_circuit = false
//! timeout_secs = 20
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::common::dns::DnsConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dns: DnsConfig,
    pub spf: SpfConfig,
}

impl Config {
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or has fields of the
    /// wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// Evaluator behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpfConfig {
    /// Return as soon as a directive matches instead of resolving every
    /// directive first. Off by default; turning it on changes which inputs
    /// end in `TempError` (a failing lookup after a match no longer counts).
    pub short_circuit: bool,
    /// Deadline for a whole top-level evaluation, in seconds. Expiry yields
    /// `TempError`.
    pub timeout_secs: Option<u64>,
}

impl SpfConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
