//! Plugin Registry Data Model
//!
//! Plain data shared by every part of the plugin state control plane.
//! This library has no I/O and no locking; it only describes what is
//! replicated and how it looks on the wire.
//!
//! # Modules
//!
//! - `category`: plugin kinds and their default-enablement policy
//! - `descriptor`: discovered plugin metadata and configuration schema
//! - `operation`: the unit of replication (`ChangeState` / `UpdateConfig`)
//! - `snapshot`: point-in-time capture of all states and configs
//!
//! # Example
//!
//! ```
//! use plugin_model::{PluginOperation, OperationKind};
//!
//! let op = PluginOperation::change_state("trace:otel", false).unwrap();
//! let bytes = op.encode().unwrap();
//! let decoded = PluginOperation::decode(&bytes).unwrap();
//! assert_eq!(decoded.kind(), OperationKind::ChangeState);
//! assert_eq!(decoded.plugin_id(), "trace:otel");
//! ```

pub mod category;
pub mod descriptor;
pub mod error;
pub mod operation;
pub mod snapshot;

use std::collections::BTreeMap;

/// Configuration values of one plugin, ordered by key so that every node
/// serializes the same map to the same bytes.
pub type ConfigMap = BTreeMap<String, String>;

/// Separator between category and name inside a plugin id.
pub const PLUGIN_ID_SEPARATOR: char = ':';

// Re-exports for convenience
pub use category::PluginCategory;
pub use descriptor::{ConfigItemDefinition, ConfigItemType, PluginDescriptor, PluginSummary};
pub use error::{ModelError, Result};
pub use operation::{OperationEnvelope, OperationKind, PluginOperation};
pub use snapshot::RegistrySnapshot;

/// Build the replication key of a plugin: `category:name`
///
/// # Examples
/// ```
/// assert_eq!(plugin_model::plugin_id("trace", "otel"), "trace:otel");
/// ```
pub fn plugin_id(category: &str, name: &str) -> String {
    format!("{}{}{}", category, PLUGIN_ID_SEPARATOR, name)
}

/// Split a plugin id into `(category, name)`
///
/// The name may itself contain the separator; only the first one splits.
///
/// # Examples
/// ```
/// use plugin_model::split_plugin_id;
///
/// assert_eq!(split_plugin_id("datasource-dialect:mysql"), Some(("datasource-dialect", "mysql")));
/// assert_eq!(split_plugin_id("no-separator"), None);
/// assert_eq!(split_plugin_id(":name"), None);
/// ```
pub fn split_plugin_id(plugin_id: &str) -> Option<(&str, &str)> {
    let (category, name) = plugin_id.split_once(PLUGIN_ID_SEPARATOR)?;
    if category.is_empty() || name.is_empty() {
        return None;
    }
    Some((category, name))
}
