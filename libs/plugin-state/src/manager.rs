//! Plugin registry and coordinator
//!
//! Owns the in-memory registry. Administrative mutations are validated here
//! and then handed to the synchronizer; the actual state change happens in
//! [`PluginStateApplier`] once the change is committed (or immediately in
//! local-only mode).

use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use plugin_model::{plugin_id, ConfigMap, PluginCategory, PluginDescriptor};
use tracing::{error, info, warn};

use crate::checker::PluginStateChecker;
use crate::config::RegistrySettings;
use crate::critical::CriticalPlugins;
use crate::discovery::{DiscoveredPlugin, PluginDiscovery};
use crate::error::{PluginError, Result};
use crate::persistence::PluginStatePersistence;
use crate::plugin::{ConfigurablePlugin, PluginInstance, PluginProvider};
use crate::sync::PluginStateSynchronizer;

/// The apply path: turns a committed change into local state
pub trait PluginStateApplier: Send + Sync {
    /// Returns the state now in effect, which is what gets persisted
    fn apply_state_change(&self, plugin_id: &str, enabled: bool) -> Result<bool>;

    fn apply_config_change(&self, plugin_id: &str, config: &ConfigMap) -> Result<()>;
}

struct RegistryEntry {
    descriptor: PluginDescriptor,
    instance: PluginInstance,
}

/// Plugin registry and coordinator
pub struct PluginManager {
    registry: DashMap<String, RegistryEntry>,
    settings: RegistrySettings,
    critical: CriticalPlugins,
    synchronizer: OnceLock<Arc<dyn PluginStateSynchronizer>>,
}

impl PluginManager {
    /// Registry with the built-in critical set
    pub fn new(settings: RegistrySettings) -> Self {
        Self::with_critical(settings, CriticalPlugins::builtin())
    }

    pub fn with_critical(settings: RegistrySettings, critical: CriticalPlugins) -> Self {
        Self {
            registry: DashMap::new(),
            settings,
            critical,
            synchronizer: OnceLock::new(),
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn critical_plugins(&self) -> &CriticalPlugins {
        &self.critical
    }

    /// Wire the synchronizer; only the first call takes effect
    pub fn set_synchronizer(&self, synchronizer: Arc<dyn PluginStateSynchronizer>) -> Result<()> {
        self.synchronizer
            .set(synchronizer)
            .map_err(|_| PluginError::Configuration("synchronizer already set".to_string()))
    }

    fn synchronizer(&self) -> Result<&Arc<dyn PluginStateSynchronizer>> {
        self.synchronizer
            .get()
            .ok_or_else(|| PluginError::sync("No plugin state synchronizer configured"))
    }

    // ========== Registration ==========

    /// Discover plugins from `providers` and register them; returns the number registered
    pub fn discover(&self, providers: &[Arc<dyn PluginProvider>]) -> usize {
        let discovered = PluginDiscovery::new(&self.settings, &self.critical).discover(providers);
        let registered = discovered
            .into_iter()
            .map(|plugin| self.insert(plugin))
            .filter(|inserted| *inserted)
            .count();
        info!("[PluginManager] Registered {} plugin(s)", registered);
        registered
    }

    /// Register one plugin; false when the id is already taken
    pub fn register(&self, category: PluginCategory, name: &str, instance: PluginInstance) -> bool {
        let plugin = PluginDiscovery::new(&self.settings, &self.critical).describe(
            category,
            name.to_string(),
            instance,
        );
        self.insert(plugin)
    }

    fn insert(&self, plugin: DiscoveredPlugin) -> bool {
        let id = plugin.descriptor.plugin_id.clone();
        match self.registry.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(existing) => {
                warn!(
                    "[PluginManager] Duplicate plugin {} ({}), keeping {}",
                    existing.key(),
                    plugin.descriptor.implementation,
                    existing.get().descriptor.implementation
                );
                false
            },
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(RegistryEntry {
                    descriptor: plugin.descriptor,
                    instance: plugin.instance,
                });
                true
            },
        }
    }

    /// Apply persisted overrides from a previous run over the discovered defaults
    ///
    /// Ids that are not registered on this node are ignored. A persisted config
    /// the plugin rejects is logged and does not stop the load.
    pub fn load_persisted(&self, persistence: &dyn PluginStatePersistence) -> Result<()> {
        let states = persistence.load_all_states()?;
        let configs = persistence.load_all_configs()?;

        let mut applied_states = 0;
        for (id, enabled) in &states {
            if self.is_plugin_available(id) {
                self.apply_state_change(id, *enabled)?;
                applied_states += 1;
            }
        }

        let mut applied_configs = 0;
        for (id, config) in &configs {
            if !self.is_plugin_available(id) {
                continue;
            }
            match self.apply_config_change(id, config) {
                Ok(()) => applied_configs += 1,
                Err(e) => error!("[PluginManager] Persisted config for {} not applied: {}", id, e),
            }
        }

        info!(
            "[PluginManager] Loaded persisted data: {} state(s), {} config(s)",
            applied_states, applied_configs
        );
        Ok(())
    }

    // ========== Queries ==========

    /// Enabled flag of `category:name`; unknown plugins are enabled
    pub fn is_enabled(&self, category: &str, name: &str) -> bool {
        self.is_enabled_by_id(&plugin_id(category, name))
    }

    pub fn is_enabled_by_id(&self, plugin_id: &str) -> bool {
        self.registry
            .get(plugin_id)
            .map(|entry| entry.descriptor.enabled)
            .unwrap_or(true)
    }

    /// All descriptors, ordered by plugin id
    pub fn list_all(&self) -> Vec<PluginDescriptor> {
        let mut all: Vec<_> = self
            .registry
            .iter()
            .map(|entry| entry.descriptor.clone())
            .collect();
        all.sort_by(|a, b| a.plugin_id.cmp(&b.plugin_id));
        all
    }

    pub fn list_by_category(&self, category: PluginCategory) -> Vec<PluginDescriptor> {
        self.list_all()
            .into_iter()
            .filter(|d| d.category == category)
            .collect()
    }

    pub fn get(&self, plugin_id: &str) -> Option<PluginDescriptor> {
        self.registry
            .get(plugin_id)
            .map(|entry| entry.descriptor.clone())
    }

    /// Ids of the plugins loaded on this node
    pub fn local_plugin_ids(&self) -> BTreeSet<String> {
        self.registry.iter().map(|e| e.key().clone()).collect()
    }

    pub fn is_plugin_available(&self, plugin_id: &str) -> bool {
        self.registry.contains_key(plugin_id)
    }

    /// Default enabled flag the registry computes for a newly discovered plugin
    pub fn default_enabled(&self, category: PluginCategory, name: &str) -> bool {
        self.settings.default_enabled(category, name)
    }

    // ========== Mutations ==========

    /// Enable or disable a plugin
    ///
    /// With `local_only` the change is applied to this node only and never
    /// replicated. Otherwise it is submitted to the synchronizer and becomes
    /// visible once committed.
    pub async fn set_enabled(&self, plugin_id: &str, enabled: bool, local_only: bool) -> Result<()> {
        let critical = self
            .registry
            .get(plugin_id)
            .map(|entry| entry.descriptor.critical)
            .ok_or_else(|| PluginError::NotFound(plugin_id.to_string()))?;

        if critical && !enabled {
            return Err(PluginError::invalid_parameter(format!(
                "Cannot disable critical plugin: {}",
                plugin_id
            )));
        }

        if local_only {
            warn!(
                "[PluginManager] LocalOnly mode: applying state change to this node only, pluginId={}",
                plugin_id
            );
            self.apply_state_change(plugin_id, enabled)?;
            return Ok(());
        }

        self.synchronizer()?
            .sync_state_change(plugin_id, enabled)
            .await?;
        info!(
            "[PluginManager] Plugin {} status change to {} submitted",
            plugin_id,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Replace a plugin's configuration
    ///
    /// Every required item must have a non-empty value; the first violation
    /// in declaration order is reported.
    pub async fn update_config(
        &self,
        plugin_id: &str,
        config: ConfigMap,
        local_only: bool,
    ) -> Result<()> {
        {
            let entry = self
                .registry
                .get(plugin_id)
                .ok_or_else(|| PluginError::NotFound(plugin_id.to_string()))?;

            if !entry.descriptor.configurable {
                return Err(PluginError::invalid_parameter(format!(
                    "Plugin does not support configuration: {}",
                    plugin_id
                )));
            }

            if let Some(missing) = entry.descriptor.first_missing_required(&config) {
                return Err(PluginError::MissingRequiredConfig {
                    plugin_id: plugin_id.to_string(),
                    key: missing.key.clone(),
                });
            }
        }

        if local_only {
            warn!(
                "[PluginManager] LocalOnly mode: applying config change to this node only, pluginId={}",
                plugin_id
            );
            return self.apply_config_change(plugin_id, &config);
        }

        self.synchronizer()?
            .sync_config_change(plugin_id, &config)
            .await?;
        info!("[PluginManager] Plugin {} config update submitted", plugin_id);
        Ok(())
    }
}

impl PluginStateApplier for PluginManager {
    fn apply_state_change(&self, plugin_id: &str, enabled: bool) -> Result<bool> {
        match self.registry.get_mut(plugin_id) {
            Some(mut entry) => {
                if entry.descriptor.critical && !enabled {
                    warn!(
                        "[PluginManager] Ignoring disable of critical plugin {}",
                        plugin_id
                    );
                    return Ok(true);
                }
                entry.descriptor.enabled = enabled;
            },
            None => {
                warn!(
                    "[PluginManager] State change for unknown plugin {} not applied locally",
                    plugin_id
                );
            },
        }
        Ok(enabled)
    }

    fn apply_config_change(&self, plugin_id: &str, config: &ConfigMap) -> Result<()> {
        let configurable = match self.registry.get_mut(plugin_id) {
            Some(mut entry) => {
                entry.descriptor.config = config.clone();
                entry.instance.as_configurable().cloned()
            },
            None => {
                warn!(
                    "[PluginManager] Config change for unknown plugin {} not applied locally",
                    plugin_id
                );
                return Ok(());
            },
        };

        // Registry shard is released before plugin code runs
        match configurable {
            Some(plugin) => forward_config(plugin_id, &plugin, config),
            None => Ok(()),
        }
    }
}

impl PluginStateChecker for PluginManager {
    fn is_plugin_enabled(&self, category: &str, name: &str) -> bool {
        self.is_enabled(category, name)
    }
}

/// Hand `config` to the plugin; errors and panics become `ApplyFailure`
fn forward_config(
    plugin_id: &str,
    plugin: &Arc<dyn ConfigurablePlugin>,
    config: &ConfigMap,
) -> Result<()> {
    let cause = match panic::catch_unwind(AssertUnwindSafe(|| plugin.apply_config(config))) {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(e)) => format!("{:#}", e),
        Err(payload) => panic_message(payload.as_ref()),
    };

    error!(
        "[PluginManager] Failed to apply config to plugin {}: {}",
        plugin_id, cause
    );
    Err(PluginError::ApplyFailure {
        plugin_id: plugin_id.to_string(),
        message: format!("Failed to apply config to plugin: {}: {}", plugin_id, cause),
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}
