//! Model Layer Error Types

use thiserror::Error;

/// Result type for plugin-model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Model layer errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Operation addressed to an empty plugin id
    #[error("pluginId is required")]
    EmptyPluginId,

    /// Plugin id not in `category:name` form
    #[error("Invalid plugin id '{0}': expected <category>:<name>")]
    InvalidPluginId(String),

    /// Category string not known to this build
    #[error("Unknown plugin type: {0}")]
    UnknownCategory(String),

    /// Payload is not a valid operation envelope
    #[error("Malformed operation payload: {0}")]
    MalformedPayload(String),

    /// Envelope carried an operation tag this build cannot apply
    #[error("Unknown operation type: {kind}")]
    UnknownOperation {
        plugin_id: Option<String>,
        kind: String,
    },

    /// Envelope is missing the field its tag requires
    #[error("{field} is required for {kind} operation, pluginId={plugin_id}")]
    MissingField {
        plugin_id: String,
        kind: &'static str,
        field: &'static str,
    },

    /// Encoding failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ModelError {
    /// Plugin id the failing payload was addressed to, when it got that far
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            Self::UnknownOperation { plugin_id, .. } => plugin_id.as_deref(),
            Self::MissingField { plugin_id, .. } => Some(plugin_id),
            Self::InvalidPluginId(id) => Some(id),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_unknown_operation_message() {
        let err = ModelError::UnknownOperation {
            plugin_id: Some("trace:otel".to_string()),
            kind: "DELETE".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown operation type: DELETE");
        assert_eq!(err.plugin_id(), Some("trace:otel"));
    }

    #[test]
    fn test_missing_field_message() {
        let err = ModelError::MissingField {
            plugin_id: "trace:otel".to_string(),
            kind: "CHANGE_STATE",
            field: "enabled",
        };
        assert_eq!(
            err.to_string(),
            "enabled is required for CHANGE_STATE operation, pluginId=trace:otel"
        );
    }

    #[test]
    fn test_malformed_has_no_plugin_id() {
        let err = ModelError::MalformedPayload("eof".to_string());
        assert!(err.plugin_id().is_none());
    }
}
