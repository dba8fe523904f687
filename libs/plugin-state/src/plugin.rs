//! Plugin instance and provider seams
//!
//! The hosting process hands the registry a list of [`PluginProvider`]s; each
//! provider contributes the plugins of one category. A plugin instance is
//! either opaque or exposes a configuration capability.

use std::collections::BTreeMap;
use std::sync::Arc;

use plugin_model::{ConfigItemDefinition, ConfigMap, PluginCategory};

/// A loaded plugin implementation
pub trait Plugin: Send + Sync {
    /// Name of the implementing type, recorded in the descriptor
    fn implementation_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Plugin that accepts runtime configuration
pub trait ConfigurablePlugin: Plugin {
    /// Declared configuration items, in display order
    fn config_definitions(&self) -> Vec<ConfigItemDefinition>;

    /// Make `config` effective; an error means the plugin rejected it
    fn apply_config(&self, config: &ConfigMap) -> anyhow::Result<()>;

    /// Values the plugin is currently running with
    fn current_config(&self) -> ConfigMap;
}

/// Instance handed over by a provider
#[derive(Clone)]
pub enum PluginInstance {
    Opaque(Arc<dyn Plugin>),
    Configurable(Arc<dyn ConfigurablePlugin>),
}

impl PluginInstance {
    pub fn opaque<P: Plugin + 'static>(plugin: P) -> Self {
        PluginInstance::Opaque(Arc::new(plugin))
    }

    pub fn configurable<P: ConfigurablePlugin + 'static>(plugin: P) -> Self {
        PluginInstance::Configurable(Arc::new(plugin))
    }

    pub fn implementation_name(&self) -> &str {
        match self {
            PluginInstance::Opaque(p) => p.implementation_name(),
            PluginInstance::Configurable(p) => p.implementation_name(),
        }
    }

    pub fn as_configurable(&self) -> Option<&Arc<dyn ConfigurablePlugin>> {
        match self {
            PluginInstance::Configurable(p) => Some(p),
            PluginInstance::Opaque(_) => None,
        }
    }

    pub fn is_configurable(&self) -> bool {
        self.as_configurable().is_some()
    }
}

impl std::fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginInstance::Opaque(_) => write!(f, "Opaque({})", self.implementation_name()),
            PluginInstance::Configurable(_) => {
                write!(f, "Configurable({})", self.implementation_name())
            },
        }
    }
}

/// Source of the plugins of one category
pub trait PluginProvider: Send + Sync {
    fn category(&self) -> PluginCategory;

    /// Plugins keyed by name
    fn all_plugins(&self) -> anyhow::Result<BTreeMap<String, PluginInstance>>;

    /// Lower values are enumerated first
    fn order(&self) -> i32 {
        0
    }
}
