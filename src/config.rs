//! Resolver configuration.
//!
//! A `ResolverConfig` is built once and passed into every pass. The kill switch
//! lives here as `ResolutionMode::OverridesDisabled` instead of being threaded
//! through individual resolver calls.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default number of audit entries kept before the oldest are evicted.
pub const DEFAULT_TRACE_CAPACITY: usize = 500;

/// Environment variable selecting the resolution mode.
pub const MODE_ENV_VAR: &str = "LAYOUT_RESOLUTION_MODE";

/// Environment variable overriding the audit trail capacity.
pub const TRACE_CAPACITY_ENV_VAR: &str = "LAYOUT_TRACE_CAPACITY";

/// How override maps participate in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Full precedence chain, override maps first.
    #[default]
    Normal,
    /// Diagnostic run: override maps are ignored and the authored
    /// `node.layout` is preferred over any computed decision.
    OverridesDisabled,
}

impl ResolutionMode {
    /// Whether override maps may be applied in this mode.
    pub fn applies_overrides(self) -> bool {
        matches!(self, ResolutionMode::Normal)
    }

    pub fn name(self) -> &'static str {
        match self {
            ResolutionMode::Normal => "normal",
            ResolutionMode::OverridesDisabled => "overrides-disabled",
        }
    }
}

impl FromStr for ResolutionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" | "" => Ok(ResolutionMode::Normal),
            "overrides-disabled" | "kill-switch" => Ok(ResolutionMode::OverridesDisabled),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// Per-pass resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub mode: ResolutionMode,
    /// Capacity of the audit trail ring buffer.
    pub trace_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            mode: ResolutionMode::Normal,
            trace_capacity: DEFAULT_TRACE_CAPACITY,
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `LAYOUT_RESOLUTION_MODE` and `LAYOUT_TRACE_CAPACITY`.
    ///
    /// Unset variables fall back to defaults; set but unparsable values are
    /// reported rather than ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (used by `from_env` and tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(mode) = lookup(MODE_ENV_VAR) {
            config.mode = mode.parse()?;
        }
        if let Some(raw) = lookup(TRACE_CAPACITY_ENV_VAR) {
            config.trace_capacity = match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidCapacity(raw)),
            };
        }
        Ok(config)
    }

    /// Set the resolution mode.
    pub fn with_mode(mut self, mode: ResolutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the audit trail capacity.
    pub fn with_trace_capacity(mut self, capacity: usize) -> Self {
        self.trace_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(
            "normal".parse::<ResolutionMode>().unwrap(),
            ResolutionMode::Normal
        );
        assert_eq!(
            "Kill-Switch".parse::<ResolutionMode>().unwrap(),
            ResolutionMode::OverridesDisabled
        );
        assert!("sometimes".parse::<ResolutionMode>().is_err());
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ResolverConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ResolverConfig::default());
        assert!(config.mode.applies_overrides());
    }

    #[test]
    fn test_from_lookup_reads_both_vars() {
        let config = ResolverConfig::from_lookup(lookup(&[
            (MODE_ENV_VAR, "overrides-disabled"),
            (TRACE_CAPACITY_ENV_VAR, "32"),
        ]))
        .unwrap();
        assert_eq!(config.mode, ResolutionMode::OverridesDisabled);
        assert_eq!(config.trace_capacity, 32);
        assert!(!config.mode.applies_overrides());
    }

    #[test]
    fn test_invalid_capacity_is_reported() {
        let err = ResolverConfig::from_lookup(lookup(&[(TRACE_CAPACITY_ENV_VAR, "0")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidCapacity("0".into()));
    }
}
