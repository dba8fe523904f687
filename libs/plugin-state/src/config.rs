//! Registry settings
//!
//! Loaded in layers: built-in defaults, then an optional TOML/YAML file, then
//! environment variables prefixed `PLUGIN_STATE_`
//! (e.g. `PLUGIN_STATE_AUTH_SYSTEM_TYPE=ldap`).

use std::path::{Path, PathBuf};

use common::config_loader::{load_layered, non_blank};
use plugin_model::PluginCategory;
use serde::{Deserialize, Serialize};

use crate::error::{PluginError, Result};

/// Environment variable prefix for every setting
pub const ENV_PREFIX: &str = "PLUGIN_STATE_";

/// Replication group the consensus adapter registers under
pub const DEFAULT_GROUP: &str = "plugin_state";

/// Authentication plugin enabled by default when nothing is configured
pub const DEFAULT_AUTH_SYSTEM_TYPE: &str = "nacos";

/// Datasource dialect enabled by default when nothing is configured
pub const DEFAULT_DATASOURCE_PLATFORM: &str = "mysql";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Name of the authentication plugin that is enabled by default
    pub auth_system_type: Option<String>,
    /// Datasource platform (current property name)
    pub sql_init_platform: Option<String>,
    /// Datasource platform (legacy property name), used when the current one is blank
    pub datasource_platform: Option<String>,
    /// Root of file-backed persistence
    pub data_dir: PathBuf,
    /// Replication group name
    pub group: String,
    /// Single node: apply changes directly instead of going through consensus
    pub standalone: bool,
    /// Upper bound on a consensus submission, in milliseconds
    pub submit_timeout_ms: Option<u64>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            auth_system_type: None,
            sql_init_platform: None,
            datasource_platform: None,
            data_dir: PathBuf::from("data"),
            group: DEFAULT_GROUP.to_string(),
            standalone: false,
            submit_timeout_ms: None,
        }
    }
}

impl RegistrySettings {
    /// Load settings from defaults, an optional file and the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let settings: RegistrySettings = load_layered(file, ENV_PREFIX)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.group.trim().is_empty() {
            return Err(PluginError::Configuration(
                "group must not be empty".to_string(),
            ));
        }
        if self.submit_timeout_ms == Some(0) {
            return Err(PluginError::Configuration(
                "submit_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Authentication plugin name selected for default enablement
    pub fn auth_default(&self) -> &str {
        non_blank(self.auth_system_type.as_deref()).unwrap_or(DEFAULT_AUTH_SYSTEM_TYPE)
    }

    /// Datasource dialect selected for default enablement: current name, then legacy name
    pub fn datasource_default(&self) -> &str {
        non_blank(self.sql_init_platform.as_deref())
            .or_else(|| non_blank(self.datasource_platform.as_deref()))
            .unwrap_or(DEFAULT_DATASOURCE_PLATFORM)
    }

    /// The single plugin name an exclusive category enables by default
    pub fn selected_plugin(&self, category: PluginCategory) -> Option<&str> {
        match category {
            PluginCategory::Auth => Some(self.auth_default()),
            PluginCategory::DatasourceDialect => Some(self.datasource_default()),
            _ => None,
        }
    }

    /// Default enabled flag for a freshly discovered plugin
    ///
    /// Exclusive categories enable only the selected name (case-insensitive);
    /// every other category enables all of its plugins.
    pub fn default_enabled(&self, category: PluginCategory, name: &str) -> bool {
        if !category.is_exclusive() {
            return true;
        }
        self.selected_plugin(category)
            .map(|selected| selected.eq_ignore_ascii_case(name))
            .unwrap_or(false)
    }
}
