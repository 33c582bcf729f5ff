//! Configuration for the content extraction tool.
//!
//! Values can be constructed from defaults, loaded from environment variables
//! (with optional `.env` support via `dotenvy`), or merged with explicit
//! overrides for programmatic updates.

use std::env;
use std::num::ParseIntError;

use dotenvy::dotenv;
use serde::de::{Deserialize, Deserializer, Error as DeError};
use serde::ser::{Serialize, Serializer};
use thiserror::Error;

/// Default upper bound on the page readiness wait.
pub const DEFAULT_DOM_SETTLE_TIMEOUT_MS: u64 = 2_000;

/// The tool's own UI overlay, excluded from user-visible text extraction.
pub const DEFAULT_OVERLAY_SELECTOR: &str = "#agente-overlay";

/// Verbosity level for tool logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Minimal,
    Medium,
    Detailed,
}

impl Verbosity {
    fn as_u8(self) -> u8 {
        match self {
            Verbosity::Minimal => 0,
            Verbosity::Medium => 1,
            Verbosity::Detailed => 2,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Verbosity::Minimal),
            1 => Some(Verbosity::Medium),
            2 => Some(Verbosity::Detailed),
            _ => None,
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Medium
    }
}

impl Serialize for Verbosity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Verbosity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Verbosity::from_u8(value).ok_or_else(|| {
            DeError::custom(format!(
                "invalid verbosity value {value}; expected 0, 1, or 2"
            ))
        })
    }
}

/// Errors raised while loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ScoutConfigError {
    #[error("invalid integer in {var}")]
    InvalidInt {
        var: &'static str,
        #[source]
        source: ParseIntError,
    },
    #[error("invalid verbosity value {value}; expected 0, 1, or 2")]
    InvalidVerbosity { value: u8 },
}

/// Tool-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoutConfig {
    pub verbose: Verbosity,
    /// Upper bound on the readiness-gate wait before extraction proceeds anyway.
    pub dom_settle_timeout_ms: u64,
    /// Selectors hidden while reading user-visible text.
    pub overlay_selectors: Vec<String>,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            verbose: Verbosity::default(),
            dom_settle_timeout_ms: DEFAULT_DOM_SETTLE_TIMEOUT_MS,
            overlay_selectors: vec![DEFAULT_OVERLAY_SELECTOR.to_string()],
        }
    }
}

/// Optional overrides merged on top of an existing configuration.
#[derive(Debug, Clone, Default)]
pub struct ScoutConfigOverrides {
    pub verbose: Option<Verbosity>,
    pub dom_settle_timeout_ms: Option<u64>,
    pub overlay_selectors: Option<Vec<String>>,
}

impl ScoutConfig {
    /// Load configuration from `PAGESCOUT_*` environment variables, falling
    /// back to defaults. A `.env` file is honoured when present.
    pub fn from_env() -> Result<Self, ScoutConfigError> {
        let _ = dotenv();
        let mut config = Self::default();

        if let Some(raw) = env_var("PAGESCOUT_VERBOSE") {
            let value = raw
                .trim()
                .parse::<u8>()
                .map_err(|source| ScoutConfigError::InvalidInt {
                    var: "PAGESCOUT_VERBOSE",
                    source,
                })?;
            config.verbose = Verbosity::from_u8(value)
                .ok_or(ScoutConfigError::InvalidVerbosity { value })?;
        }

        if let Some(raw) = env_var("PAGESCOUT_DOM_SETTLE_TIMEOUT_MS") {
            config.dom_settle_timeout_ms =
                raw.trim()
                    .parse::<u64>()
                    .map_err(|source| ScoutConfigError::InvalidInt {
                        var: "PAGESCOUT_DOM_SETTLE_TIMEOUT_MS",
                        source,
                    })?;
        }

        if let Some(raw) = env_var("PAGESCOUT_OVERLAY_SELECTORS") {
            let selectors: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !selectors.is_empty() {
                config.overlay_selectors = selectors;
            }
        }

        Ok(config)
    }

    /// Merge explicit overrides on top of this configuration.
    pub fn with_overrides(mut self, overrides: ScoutConfigOverrides) -> Self {
        if let Some(verbose) = overrides.verbose {
            self.verbose = verbose;
        }
        if let Some(timeout) = overrides.dom_settle_timeout_ms {
            self.dom_settle_timeout_ms = timeout;
        }
        if let Some(selectors) = overrides.overlay_selectors {
            self.overlay_selectors = selectors;
        }
        self
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tool_contract() {
        let config = ScoutConfig::default();
        assert_eq!(config.dom_settle_timeout_ms, 2_000);
        assert_eq!(config.overlay_selectors, vec!["#agente-overlay"]);
        assert_eq!(config.verbose, Verbosity::Medium);
    }

    #[test]
    fn overrides_replace_only_provided_fields() {
        let config = ScoutConfig::default().with_overrides(ScoutConfigOverrides {
            dom_settle_timeout_ms: Some(500),
            ..Default::default()
        });
        assert_eq!(config.dom_settle_timeout_ms, 500);
        assert_eq!(config.verbose, Verbosity::Medium);
        assert_eq!(config.overlay_selectors, vec!["#agente-overlay"]);
    }

    #[test]
    fn verbosity_round_trips_through_serde() {
        let json = serde_json::to_string(&Verbosity::Detailed).unwrap();
        assert_eq!(json, "2");
        let parsed: Verbosity = serde_json::from_str("0").unwrap();
        assert_eq!(parsed, Verbosity::Minimal);
        assert!(serde_json::from_str::<Verbosity>("9").is_err());
    }

    #[test]
    fn from_env_reads_pagescout_variables() {
        env::set_var("PAGESCOUT_DOM_SETTLE_TIMEOUT_MS", "750");
        env::set_var("PAGESCOUT_OVERLAY_SELECTORS", "#overlay-a, .overlay-b");
        let config = ScoutConfig::from_env().expect("config");
        env::remove_var("PAGESCOUT_DOM_SETTLE_TIMEOUT_MS");
        env::remove_var("PAGESCOUT_OVERLAY_SELECTORS");

        assert_eq!(config.dom_settle_timeout_ms, 750);
        assert_eq!(
            config.overlay_selectors,
            vec!["#overlay-a".to_string(), ".overlay-b".to_string()]
        );
    }
}
