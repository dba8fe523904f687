//! Discovered plugin metadata and configuration schema

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::PluginCategory;
use crate::ConfigMap;

// ============================================================================
// Configuration Schema
// ============================================================================

/// Value type of one configuration item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigItemType {
    /// Free text
    #[default]
    String,
    /// Numeric value, kept as text
    Number,
    /// `true` / `false`
    Boolean,
    /// One of `enum_values`
    Enum,
    /// Secret; hidden in list views
    Password,
}

/// One declared configuration key of a configurable plugin
///
/// # Examples
/// ```
/// use plugin_model::{ConfigItemDefinition, ConfigItemType};
///
/// let item = ConfigItemDefinition::new("mode", "Mode", ConfigItemType::Enum)
///     .with_enum_values(["fast", "safe"])
///     .with_default_value("safe")
///     .required();
/// assert!(item.required);
/// assert_eq!(item.enum_values.as_deref(), Some(&["fast".to_string(), "safe".to_string()][..]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigItemDefinition {
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub value_type: ConfigItemType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl ConfigItemDefinition {
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        value_type: ConfigItemType,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            description: String::new(),
            default_value: None,
            value_type,
            required: false,
            enum_values: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// True when this item is required and `config` has no non-empty value for it
    pub fn is_missing_in(&self, config: &ConfigMap) -> bool {
        self.required
            && config
                .get(&self.key)
                .map(|value| value.is_empty())
                .unwrap_or(true)
    }
}

// ============================================================================
// Plugin Descriptor
// ============================================================================

/// Identity, metadata and replicated state of one discovered plugin
///
/// Only `enabled` and `config` change after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    /// `category:name`, the replication key
    pub plugin_id: String,
    pub category: PluginCategory,
    pub name: String,
    /// Type name of the backing instance
    pub implementation: String,
    pub discovered_at: DateTime<Utc>,
    pub critical: bool,
    pub configurable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_definitions: Vec<ConfigItemDefinition>,
    pub enabled: bool,
    #[serde(default)]
    pub config: ConfigMap,
}

impl PluginDescriptor {
    /// First required item (in declaration order) that `config` leaves empty
    pub fn first_missing_required<'a>(&'a self, config: &ConfigMap) -> Option<&'a ConfigItemDefinition> {
        self.config_definitions
            .iter()
            .find(|item| item.is_missing_in(config))
    }

    /// Projection used by list views
    pub fn summary(&self) -> PluginSummary {
        PluginSummary {
            plugin_id: self.plugin_id.clone(),
            category: self.category,
            name: self.name.clone(),
            enabled: self.enabled,
            critical: self.critical,
            configurable: self.configurable,
        }
    }
}

/// Compact view of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSummary {
    pub plugin_id: String,
    pub category: PluginCategory,
    pub name: String,
    pub enabled: bool,
    pub critical: bool,
    pub configurable: bool,
}
