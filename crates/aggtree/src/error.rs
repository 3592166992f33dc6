//! Error types for aggregation tree construction.

use thiserror::Error;

/// Errors that can occur while building an aggregation tree.
///
/// Transformation of engine responses never produces an error; only
/// malformed node configuration is rejected, at construction time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggError {
    /// The body names an aggregation type the engine does not know.
    #[error("unknown aggregation type: {0}")]
    UnknownAggregationType(String),

    /// The body is not a mapping with exactly one aggregation-type key.
    #[error("invalid aggregation body: {reason}")]
    InvalidBody {
        /// Why the body was rejected.
        reason: String,
    },

    /// The configuration for an aggregation type is neither a shorthand
    /// string nor a mapping.
    #[error("invalid configuration for '{kind}' aggregation: expected a string or an object, got {found}")]
    InvalidConfig {
        /// The aggregation type being configured.
        kind: String,
        /// JSON type name of the rejected value.
        found: &'static str,
    },
}

/// Result type for aggregation tree operations.
pub type AggResult<T> = std::result::Result<T, AggError>;

/// Returns the JSON type name of a value, for error messages.
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
    fn test_error_display_unknown_type() {
        let err = AggError::UnknownAggregationType("sums".to_string());
        assert_eq!(err.to_string(), "unknown aggregation type: sums");
    }

    #[test]
    fn test_error_display_invalid_body() {
        let err = AggError::InvalidBody {
            reason: "expected exactly one key, found 2".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid aggregation body: expected exactly one key, found 2"
        );
    }

    #[test]
    fn test_error_display_invalid_config() {
        let err = AggError::InvalidConfig {
            kind: "terms".to_string(),
            found: "number",
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration for 'terms' aggregation: expected a string or an object, got number"
        );
    }

    #[test]
    fn test_json_type_name() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!([1])), "array");
        assert_eq!(json_type_name(&json!({})), "object");
        assert_eq!(json_type_name(&json!(1.5)), "number");
    }
}
