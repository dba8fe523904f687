//! Plugin discovery
//!
//! Walks the registered providers (sorted by `order()`) and turns every
//! `(category, name, instance)` into a descriptor with its default enabled
//! flag. A provider that errors or panics is skipped; discovery itself never
//! fails.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use plugin_model::{plugin_id, PluginCategory, PluginDescriptor};
use tracing::{debug, info, warn};

use crate::config::RegistrySettings;
use crate::critical::CriticalPlugins;
use crate::plugin::{PluginInstance, PluginProvider};

/// Descriptor plus the instance it was built from
#[derive(Debug, Clone)]
pub struct DiscoveredPlugin {
    pub descriptor: PluginDescriptor,
    pub instance: PluginInstance,
}

/// Builds registry entries from providers
pub struct PluginDiscovery<'a> {
    settings: &'a RegistrySettings,
    critical: &'a CriticalPlugins,
}

impl<'a> PluginDiscovery<'a> {
    pub fn new(settings: &'a RegistrySettings, critical: &'a CriticalPlugins) -> Self {
        Self { settings, critical }
    }

    /// Enumerate every provider, lowest `order()` first
    pub fn discover(&self, providers: &[Arc<dyn PluginProvider>]) -> Vec<DiscoveredPlugin> {
        let mut sorted: Vec<&Arc<dyn PluginProvider>> = providers.iter().collect();
        sorted.sort_by_key(|p| p.order());

        let mut discovered = Vec::new();
        for provider in sorted {
            let category = provider.category();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                provider
                    .all_plugins()
                    .map(|plugins| self.describe_all(category, plugins))
            }));

            match outcome {
                Ok(Ok(plugins)) if plugins.is_empty() => {
                    info!("[PluginDiscovery] No {} plugins found", category);
                },
                Ok(Ok(plugins)) => {
                    info!(
                        "[PluginDiscovery] Discovered {} {} plugin(s)",
                        plugins.len(),
                        category
                    );
                    discovered.extend(plugins);
                },
                Ok(Err(e)) => {
                    warn!(
                        "[PluginDiscovery] Skipping {} provider: {:#}",
                        category, e
                    );
                },
                Err(_) => {
                    warn!("[PluginDiscovery] Skipping {} provider: panicked", category);
                },
            }
        }
        discovered
    }

    fn describe_all(
        &self,
        category: PluginCategory,
        plugins: BTreeMap<String, PluginInstance>,
    ) -> Vec<DiscoveredPlugin> {
        plugins
            .into_iter()
            .map(|(name, instance)| self.describe(category, name, instance))
            .collect()
    }

    /// Build the descriptor of one plugin
    pub fn describe(
        &self,
        category: PluginCategory,
        name: String,
        instance: PluginInstance,
    ) -> DiscoveredPlugin {
        let id = plugin_id(category.as_str(), &name);
        let critical = self.critical.contains(&id);
        let enabled = self.settings.default_enabled(category, &name);

        let (config_definitions, config) = match instance.as_configurable() {
            Some(configurable) => (configurable.config_definitions(), configurable.current_config()),
            None => (Vec::new(), Default::default()),
        };

        debug!(
            "[PluginDiscovery] {} critical={} configurable={} default_enabled={}",
            id,
            critical,
            instance.is_configurable(),
            enabled
        );

        DiscoveredPlugin {
            descriptor: PluginDescriptor {
                plugin_id: id,
                category,
                name,
                implementation: instance.implementation_name().to_string(),
                discovered_at: Utc::now(),
                critical,
                configurable: instance.is_configurable(),
                config_definitions,
                enabled,
                config,
            },
            instance,
        }
    }
}
