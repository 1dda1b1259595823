//! Error types for layout resolution.
//!
//! None of these are fatal to a resolution pass. `NodeError` is converted into
//! an audit record by the walker and only drops the offending subtree.

use thiserror::Error;

/// A node in the input document could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// The node value is not a JSON object.
    #[error("Node is not an object (found {found})")]
    NotAnObject {
        /// JSON type name of the value that was found.
        found: &'static str,
    },

    /// The node is an object but one of its fields has the wrong shape.
    #[error("Malformed node: {reason}")]
    Malformed {
        /// Deserializer message.
        reason: String,
    },
}

impl NodeError {
    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAnObject { .. } => "NOT_AN_OBJECT",
            Self::Malformed { .. } => "MALFORMED_NODE",
        }
    }
}

/// A template profile document could not be loaded.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Invalid profile JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid profile YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Resolver configuration from the environment is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Unknown resolution mode '{0}'. Valid values: normal, overrides-disabled, kill-switch")]
    InvalidMode(String),

    #[error("Invalid trace capacity '{0}' (expected a positive integer)")]
    InvalidCapacity(String),
}

/// JSON type name used in error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_error_codes() {
        let err = NodeError::NotAnObject { found: "string" };
        assert_eq!(err.code(), "NOT_AN_OBJECT");
        assert_eq!(err.to_string(), "Node is not an object (found string)");

        let err = NodeError::Malformed {
            reason: "invalid type".into(),
        };
        assert_eq!(err.code(), "MALFORMED_NODE");
    }

    #[test]
    fn test_json_type_name() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!([1])), "array");
        assert_eq!(json_type_name(&json!({"a": 1})), "object");
    }
}
