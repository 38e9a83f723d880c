//! Engine configuration.
//!
//! Supports loading configuration from:
//! 1. A YAML file
//! 2. Environment variables (with `QNLP_NCU_` prefix)
//!
//! Environment variables override file values, which override defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NcuError, NcuResult};
use crate::unitary::DEFAULT_TOLERANCE;

/// Numerical and caching settings for [`NcuEngine`](crate::NcuEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NcuConfig {
    /// Smallest `|t|` accepted as a square-root denominator.
    #[serde(default = "default_tolerance")]
    pub degeneracy_tolerance: f64,

    /// Elementwise tolerance when checking a supplied gate against a cached one.
    #[serde(default = "default_tolerance")]
    pub match_tolerance: f64,

    /// Seed the Pauli-X chain when the engine creates its own cache.
    #[serde(default = "default_true")]
    pub preseed_pauli_x: bool,

    /// Deepest square-root chain a single decomposition may require.
    #[serde(default = "default_max_cache_depth")]
    pub max_cache_depth: usize,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_true() -> bool {
    true
}

fn default_max_cache_depth() -> usize {
    64
}

impl Default for NcuConfig {
    fn default() -> Self {
        Self {
            degeneracy_tolerance: default_tolerance(),
            match_tolerance: default_tolerance(),
            preseed_pauli_x: default_true(),
            max_cache_depth: default_max_cache_depth(),
        }
    }
}

impl NcuConfig {
    /// Parse configuration from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> NcuResult<Self> {
        let config: NcuConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> NcuResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    /// Load from an optional file, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(config_file: Option<P>) -> NcuResult<Self> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `QNLP_NCU_*` environment variables that are set and parse.
    #[must_use]
    pub fn merge_env(self) -> Self {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    fn merge_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("QNLP_NCU_DEGENERACY_TOLERANCE").and_then(|v| v.parse().ok()) {
            self.degeneracy_tolerance = val;
        }
        if let Some(val) = lookup("QNLP_NCU_MATCH_TOLERANCE").and_then(|v| v.parse().ok()) {
            self.match_tolerance = val;
        }
        if let Some(val) = lookup("QNLP_NCU_PRESEED_PAULI_X").and_then(|v| v.parse().ok()) {
            self.preseed_pauli_x = val;
        }
        if let Some(val) = lookup("QNLP_NCU_MAX_CACHE_DEPTH").and_then(|v| v.parse().ok()) {
            self.max_cache_depth = val;
        }
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> NcuResult<()> {
        for (name, value) in [
            ("degeneracy_tolerance", self.degeneracy_tolerance),
            ("match_tolerance", self.match_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(NcuError::Config(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.max_cache_depth == 0 {
            return Err(NcuError::Config(
                "max_cache_depth must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = NcuConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.degeneracy_tolerance, 1e-12);
        assert!(config.preseed_pauli_x);
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let config = NcuConfig::from_yaml_str("max_cache_depth: 8\n").unwrap();
        assert_eq!(config.max_cache_depth, 8);
        assert_eq!(config.match_tolerance, DEFAULT_TOLERANCE);
    }

    #[test]
    fn test_yaml_rejects_negative_tolerance() {
        let err = NcuConfig::from_yaml_str("degeneracy_tolerance: -1.0\n").unwrap_err();
        assert!(matches!(err, NcuError::Config(_)));
    }

    #[test]
    fn test_yaml_parse_error() {
        let err = NcuConfig::from_yaml_str("max_cache_depth: [oops").unwrap_err();
        assert!(matches!(err, NcuError::Serialization(_)));
    }

    #[test]
    fn test_env_overrides() {
        let config = NcuConfig::default().merge_vars(|key| match key {
            "QNLP_NCU_MAX_CACHE_DEPTH" => Some("12".to_string()),
            "QNLP_NCU_PRESEED_PAULI_X" => Some("false".to_string()),
            "QNLP_NCU_MATCH_TOLERANCE" => Some("not-a-number".to_string()),
            _ => None,
        });
        assert_eq!(config.max_cache_depth, 12);
        assert!(!config.preseed_pauli_x);
        assert_eq!(config.match_tolerance, DEFAULT_TOLERANCE);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = NcuConfig::from_file("/nonexistent/qnlp-ncu.yaml").unwrap_err();
        assert!(matches!(err, NcuError::Io(_)));
    }
}
