//! # Engine Configuration
//!
//! Runtime knobs for the orchestrator, loadable from TOML:
//!
//! ```toml
//! zero_threshold = 1e-7
//! max_nodes = 500000
//! ```
//!
//! Missing keys fall back to the [`primitives`](crate::primitives) defaults.

use crate::primitives::{MAX_CIRCUIT_NODES, ZERO_THRESHOLD};
use crate::WmcError;
use serde::{Deserialize, Serialize};

/// Orchestrator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Results with a smaller magnitude are reported as zero.
    /// Must lie in `[0, ZERO_THRESHOLD]`.
    pub zero_threshold: f64,
    /// Largest circuit the orchestrator accepts.
    pub max_nodes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            zero_threshold: ZERO_THRESHOLD,
            max_nodes: MAX_CIRCUIT_NODES,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, WmcError> {
        let config: Self =
            toml::from_str(source).map_err(|e| WmcError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the orchestrator relies on.
    pub fn validate(&self) -> Result<(), WmcError> {
        if !(0.0..=ZERO_THRESHOLD).contains(&self.zero_threshold) {
            return Err(WmcError::InvalidConfig(format!(
                "zero_threshold {} outside [0, {}]",
                self.zero_threshold, ZERO_THRESHOLD
            )));
        }
        if self.max_nodes == 0 {
            return Err(WmcError::InvalidConfig(
                "max_nodes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.zero_threshold, 1e-6);
        config.validate().expect("valid");
    }

    #[test]
    fn parses_partial_toml() {
        let config = EngineConfig::from_toml_str("zero_threshold = 1e-9").expect("parse");
        assert_eq!(config.zero_threshold, 1e-9);
        assert_eq!(config.max_nodes, MAX_CIRCUIT_NODES);

        let empty = EngineConfig::from_toml_str("").expect("parse");
        assert_eq!(empty, EngineConfig::default());
    }

    #[test]
    fn rejects_threshold_above_one_millionth() {
        let result = EngineConfig::from_toml_str("zero_threshold = 1e-3");
        assert!(matches!(result, Err(WmcError::InvalidConfig(_))));

        let negative = EngineConfig::from_toml_str("zero_threshold = -1e-9");
        assert!(negative.is_err());
    }

    #[test]
    fn rejects_unknown_keys_and_bad_limits() {
        assert!(EngineConfig::from_toml_str("threshold = 0.0").is_err());
        assert!(EngineConfig::from_toml_str("max_nodes = 0").is_err());
    }
}
