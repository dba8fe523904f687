//! Replicated operations
//!
//! A [`PluginOperation`] is the unit the consensus log carries. On the wire it
//! is a JSON [`OperationEnvelope`]:
//!
//! ```text
//! { "type": "CHANGE_STATE" | "UPDATE_CONFIG", "pluginId": "...",
//!   "enabled": bool (CHANGE_STATE), "config": { ... } (UPDATE_CONFIG) }
//! ```
//!
//! Decoding goes through the raw envelope first so that a payload with a bad
//! tag or a missing field still reports which plugin it was addressed to.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ModelError, Result};
use crate::ConfigMap;

/// Operation tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ChangeState,
    UpdateConfig,
}

impl OperationKind {
    /// Wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::ChangeState => "CHANGE_STATE",
            OperationKind::UpdateConfig => "UPDATE_CONFIG",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "CHANGE_STATE" => Ok(OperationKind::ChangeState),
            "UPDATE_CONFIG" => Ok(OperationKind::UpdateConfig),
            other => Err(other.to_string()),
        }
    }
}

/// Change to one plugin's replicated state
///
/// Applying the same operation twice leaves the same state behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginOperation {
    ChangeState { plugin_id: String, enabled: bool },
    UpdateConfig { plugin_id: String, config: ConfigMap },
}

impl PluginOperation {
    pub fn change_state(plugin_id: impl Into<String>, enabled: bool) -> Result<Self> {
        let plugin_id = non_empty(plugin_id.into())?;
        Ok(PluginOperation::ChangeState { plugin_id, enabled })
    }

    pub fn update_config(plugin_id: impl Into<String>, config: ConfigMap) -> Result<Self> {
        let plugin_id = non_empty(plugin_id.into())?;
        Ok(PluginOperation::UpdateConfig { plugin_id, config })
    }

    pub fn plugin_id(&self) -> &str {
        match self {
            PluginOperation::ChangeState { plugin_id, .. }
            | PluginOperation::UpdateConfig { plugin_id, .. } => plugin_id,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            PluginOperation::ChangeState { .. } => OperationKind::ChangeState,
            PluginOperation::UpdateConfig { .. } => OperationKind::UpdateConfig,
        }
    }

    /// Serialize to the wire envelope
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&OperationEnvelope::from(self))?)
    }

    /// Parse a committed log payload
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let envelope: OperationEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| ModelError::MalformedPayload(e.to_string()))?;
        PluginOperation::try_from(envelope)
    }
}

fn non_empty(plugin_id: String) -> Result<String> {
    if plugin_id.trim().is_empty() {
        return Err(ModelError::EmptyPluginId);
    }
    Ok(plugin_id)
}

/// Raw wire shape of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub plugin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigMap>,
}

impl From<&PluginOperation> for OperationEnvelope {
    fn from(op: &PluginOperation) -> Self {
        let (enabled, config) = match op {
            PluginOperation::ChangeState { enabled, .. } => (Some(*enabled), None),
            PluginOperation::UpdateConfig { config, .. } => (None, Some(config.clone())),
        };
        OperationEnvelope {
            kind: op.kind().as_str().to_string(),
            plugin_id: Some(op.plugin_id().to_string()),
            enabled,
            config,
        }
    }
}

impl TryFrom<OperationEnvelope> for PluginOperation {
    type Error = ModelError;

    fn try_from(envelope: OperationEnvelope) -> Result<Self> {
        let kind: OperationKind =
            envelope
                .kind
                .parse()
                .map_err(|kind| ModelError::UnknownOperation {
                    plugin_id: envelope.plugin_id.clone(),
                    kind,
                })?;
        let plugin_id = non_empty(envelope.plugin_id.unwrap_or_default())?;

        match kind {
            OperationKind::ChangeState => {
                let enabled = envelope.enabled.ok_or_else(|| ModelError::MissingField {
                    plugin_id: plugin_id.clone(),
                    kind: kind.as_str(),
                    field: "enabled",
                })?;
                Ok(PluginOperation::ChangeState { plugin_id, enabled })
            }
            OperationKind::UpdateConfig => {
                let config = envelope.config.ok_or_else(|| ModelError::MissingField {
                    plugin_id: plugin_id.clone(),
                    kind: kind.as_str(),
                    field: "config",
                })?;
                Ok(PluginOperation::UpdateConfig { plugin_id, config })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_change_state_wire_shape() {
        let op = PluginOperation::change_state("trace:otel", false).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&op.encode().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "CHANGE_STATE", "pluginId": "trace:otel", "enabled": false})
        );
    }

    #[test]
    fn test_update_config_is_key_ordered() {
        let mut config = ConfigMap::new();
        config.insert("zeta".to_string(), "1".to_string());
        config.insert("alpha".to_string(), "2".to_string());
        let op = PluginOperation::update_config("encryption:aes", config).unwrap();
        let text = String::from_utf8(op.encode().unwrap()).unwrap();
        assert_eq!(
            text,
            r#"{"type":"UPDATE_CONFIG","pluginId":"encryption:aes","config":{"alpha":"2","zeta":"1"}}"#
        );
    }

    #[test]
    fn test_empty_plugin_id_rejected() {
        assert_eq!(
            PluginOperation::change_state("", true).unwrap_err(),
            ModelError::EmptyPluginId
        );
        assert_eq!(
            PluginOperation::update_config("  ", ConfigMap::new()).unwrap_err(),
            ModelError::EmptyPluginId
        );
    }

    #[test]
    fn test_decode_unknown_type_keeps_plugin_id() {
        let err =
            PluginOperation::decode(br#"{"type":"REMOVE","pluginId":"trace:otel"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Unknown operation type: REMOVE");
        assert_eq!(err.plugin_id(), Some("trace:otel"));
    }

    #[test]
    fn test_decode_missing_enabled() {
        let err = PluginOperation::decode(br#"{"type":"CHANGE_STATE","pluginId":"trace:otel"}"#)
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingField { field: "enabled", .. }));
        assert!(err.to_string().contains("pluginId=trace:otel"));
    }

    #[test]
    fn test_decode_missing_config() {
        let err = PluginOperation::decode(br#"{"type":"UPDATE_CONFIG","pluginId":"auth:ldap"}"#)
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingField { field: "config", .. }));
    }

    #[test]
    fn test_decode_garbage() {
        let err = PluginOperation::decode(b"not json").unwrap_err();
        assert!(matches!(err, ModelError::MalformedPayload(_)));
    }

    #[test]
    fn test_decode_round_trip() {
        let mut config = ConfigMap::new();
        config.insert("k".to_string(), "v".to_string());
        let op = PluginOperation::update_config("control:tps", config).unwrap();
        assert_eq!(PluginOperation::decode(&op.encode().unwrap()).unwrap(), op);
    }
}
