//! Builder configuration.

use serde::Deserialize;

use crate::error::GraphError;

/// Tunables of a relation build pass.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Skip driver variables reading a bone's final transform when the
    /// driver writes that same bone's local transform.
    pub same_bone_heuristic: bool,
    /// Send unresolved relations to the diagnostics sink.
    pub report_unresolved: bool,
    /// Upper bound on the number of bones walked for one IK chain.
    pub max_ik_chain_length: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            same_bone_heuristic: true,
            report_unresolved: true,
            max_ik_chain_length: 255,
        }
    }
}

impl BuilderConfig {
    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = BuilderConfig::from_json(r#"{ "max_ik_chain_length": 16 }"#).unwrap();
        assert_eq!(config.max_ik_chain_length, 16);
        assert!(config.same_bone_heuristic);
        assert!(config.report_unresolved);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            BuilderConfig::from_json("{ same_bone_heuristic: "),
            Err(GraphError::Config(_))
        ));
    }
}
