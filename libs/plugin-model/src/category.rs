//! Plugin categories
//!
//! Every discovered plugin belongs to exactly one category. The category
//! decides how the default enabled flag is computed:
//! - exclusive categories (authentication, datasource dialect) enable at most
//!   one plugin by default, selected through external configuration
//! - every other category is multiplicative: all members default to enabled

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ModelError;

// ============================================================================
// Plugin Category
// ============================================================================

/// Kind of a pluggable component
///
/// The string form is the prefix of every plugin id (`auth:nacos`,
/// `datasource-dialect:mysql`, ...). New kinds are added here as new variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PluginCategory {
    /// Authentication system
    #[serde(rename = "auth")]
    Auth,

    /// SQL dialect of the backing datasource
    #[serde(rename = "datasource-dialect")]
    DatasourceDialect,

    /// Config change hooks
    #[serde(rename = "config-change")]
    ConfigChange,

    /// Encryption of stored values
    #[serde(rename = "encryption")]
    Encryption,

    /// Trace and audit event subscribers
    #[serde(rename = "trace")]
    Trace,

    /// Custom environment providers
    #[serde(rename = "environment")]
    Environment,

    /// Traffic and connection control
    #[serde(rename = "control")]
    Control,
}

impl PluginCategory {
    /// Every known category, in declaration order
    pub const ALL: [PluginCategory; 7] = [
        PluginCategory::Auth,
        PluginCategory::DatasourceDialect,
        PluginCategory::ConfigChange,
        PluginCategory::Encryption,
        PluginCategory::Trace,
        PluginCategory::Environment,
        PluginCategory::Control,
    ];

    /// Id prefix of this category
    ///
    /// # Examples
    /// ```
    /// # use plugin_model::PluginCategory;
    /// assert_eq!(PluginCategory::Auth.as_str(), "auth");
    /// assert_eq!(PluginCategory::DatasourceDialect.as_str(), "datasource-dialect");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginCategory::Auth => "auth",
            PluginCategory::DatasourceDialect => "datasource-dialect",
            PluginCategory::ConfigChange => "config-change",
            PluginCategory::Encryption => "encryption",
            PluginCategory::Trace => "trace",
            PluginCategory::Environment => "environment",
            PluginCategory::Control => "control",
        }
    }

    /// Human readable description
    pub fn description(&self) -> &'static str {
        match self {
            PluginCategory::Auth => "Authentication plugin",
            PluginCategory::DatasourceDialect => "Datasource dialect plugin",
            PluginCategory::ConfigChange => "Config change plugin",
            PluginCategory::Encryption => "Encryption plugin",
            PluginCategory::Trace => "Trace plugin",
            PluginCategory::Environment => "Custom environment plugin",
            PluginCategory::Control => "Control plugin",
        }
    }

    /// At most one member of an exclusive category is enabled by default
    ///
    /// # Examples
    /// ```
    /// # use plugin_model::PluginCategory;
    /// assert!(PluginCategory::Auth.is_exclusive());
    /// assert!(!PluginCategory::Trace.is_exclusive());
    /// ```
    pub fn is_exclusive(&self) -> bool {
        matches!(self, PluginCategory::Auth | PluginCategory::DatasourceDialect)
    }
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PluginCategory {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PluginCategory::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ModelError::UnknownCategory(s.to_string()))
    }
}
