//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use plugin_model::{ConfigItemDefinition, ConfigItemType, ConfigMap, PluginCategory, PluginOperation};
use plugin_state::{
    ConfigurablePlugin, MemoryPersistence, Plugin, PluginInstance, PluginProvider,
    PluginStateApplier, PluginStatePersistence, PluginStateSynchronizer, Result,
};

// ============================================================================
// Plugins and Providers
// ============================================================================

pub struct Noop;
impl Plugin for Noop {}

/// Configurable plugin that declares `requiredKey` and records what it receives
#[derive(Default)]
pub struct Tunable {
    pub applied: Mutex<Vec<ConfigMap>>,
}

impl Plugin for Tunable {}

impl ConfigurablePlugin for Tunable {
    fn config_definitions(&self) -> Vec<ConfigItemDefinition> {
        vec![
            ConfigItemDefinition::new("requiredKey", "Required Key", ConfigItemType::String).required(),
            ConfigItemDefinition::new("optionalKey", "Optional Key", ConfigItemType::Number),
        ]
    }

    fn apply_config(&self, config: &ConfigMap) -> anyhow::Result<()> {
        self.applied.lock().push(config.clone());
        Ok(())
    }

    fn current_config(&self) -> ConfigMap {
        self.applied.lock().last().cloned().unwrap_or_default()
    }
}

/// Provider returning a fixed set of plugins for one category
pub struct FixedProvider {
    pub category: PluginCategory,
    pub plugins: BTreeMap<String, PluginInstance>,
}

impl FixedProvider {
    pub fn new(category: PluginCategory) -> Self {
        Self {
            category,
            plugins: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, instance: PluginInstance) -> Self {
        self.plugins.insert(name.to_string(), instance);
        self
    }

    pub fn shared(self) -> Arc<dyn PluginProvider> {
        Arc::new(self)
    }
}

impl PluginProvider for FixedProvider {
    fn category(&self) -> PluginCategory {
        self.category
    }

    fn all_plugins(&self) -> anyhow::Result<BTreeMap<String, PluginInstance>> {
        Ok(self.plugins.clone())
    }
}

pub fn config(pairs: &[(&str, &str)]) -> ConfigMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ============================================================================
// Synchronizer
// ============================================================================

/// Accepts every submission and keeps it for inspection
#[derive(Default)]
pub struct RecordingSync {
    pub submitted: Mutex<Vec<PluginOperation>>,
}

#[async_trait]
impl PluginStateSynchronizer for RecordingSync {
    async fn sync_state_change(&self, plugin_id: &str, enabled: bool) -> Result<()> {
        self.submitted
            .lock()
            .push(PluginOperation::change_state(plugin_id, enabled)?);
        Ok(())
    }

    async fn sync_config_change(&self, plugin_id: &str, config: &ConfigMap) -> Result<()> {
        self.submitted
            .lock()
            .push(PluginOperation::update_config(plugin_id, config.clone())?);
        Ok(())
    }
}

// ============================================================================
// Applier
// ============================================================================

/// Counts apply-path invocations per plugin id
#[derive(Default)]
pub struct RecordingApplier {
    pub states: Mutex<Vec<(String, bool)>>,
    pub configs: Mutex<Vec<(String, ConfigMap)>>,
}

impl RecordingApplier {
    pub fn total(&self) -> usize {
        self.states.lock().len() + self.configs.lock().len()
    }
}

impl PluginStateApplier for RecordingApplier {
    fn apply_state_change(&self, plugin_id: &str, enabled: bool) -> Result<bool> {
        self.states.lock().push((plugin_id.to_string(), enabled));
        Ok(enabled)
    }

    fn apply_config_change(&self, plugin_id: &str, config: &ConfigMap) -> Result<()> {
        self.configs
            .lock()
            .push((plugin_id.to_string(), config.clone()));
        Ok(())
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// In-memory persistence that logs every write
#[derive(Default)]
pub struct RecordingPersistence {
    pub inner: MemoryPersistence,
    pub state_writes: Mutex<Vec<(String, bool)>>,
    pub config_writes: Mutex<Vec<(String, ConfigMap)>>,
}

impl PluginStatePersistence for RecordingPersistence {
    fn load_all_states(&self) -> Result<BTreeMap<String, bool>> {
        self.inner.load_all_states()
    }

    fn load_all_configs(&self) -> Result<BTreeMap<String, ConfigMap>> {
        self.inner.load_all_configs()
    }

    fn save_state(&self, plugin_id: &str, enabled: bool) -> Result<()> {
        self.state_writes
            .lock()
            .push((plugin_id.to_string(), enabled));
        self.inner.save_state(plugin_id, enabled)
    }

    fn save_config(&self, plugin_id: &str, config: &ConfigMap) -> Result<()> {
        self.config_writes
            .lock()
            .push((plugin_id.to_string(), config.clone()));
        self.inner.save_config(plugin_id, config)
    }

    fn delete_state(&self, plugin_id: &str) -> Result<()> {
        self.inner.delete_state(plugin_id)
    }

    fn delete_config(&self, plugin_id: &str) -> Result<()> {
        self.inner.delete_config(plugin_id)
    }
}

/// Persistence call a [`GatedPersistence`] parks in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePoint {
    /// `load_all_states`, reached by a snapshot save
    LoadStates,
    /// `save_state`, reached by a snapshot load
    SaveState,
}

/// Persistence that parks on its first call at a [`GatePoint`]
///
/// The gated call signals `entered` and then blocks on `release`, which lets
/// a test hold a snapshot save or load in the middle of its critical section.
pub struct GatedPersistence {
    pub inner: MemoryPersistence,
    point: GatePoint,
    gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

/// Handles the test keeps to drive a [`GatedPersistence`]
pub struct Gate {
    pub entered: Receiver<()>,
    pub release: Sender<()>,
}

impl GatedPersistence {
    pub fn new(inner: MemoryPersistence) -> (Self, Gate) {
        Self::at(inner, GatePoint::LoadStates)
    }

    pub fn at(inner: MemoryPersistence, point: GatePoint) -> (Self, Gate) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let persistence = Self {
            inner,
            point,
            gate: Mutex::new(Some((entered_tx, release_rx))),
        };
        (
            persistence,
            Gate {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }

    fn park(&self, point: GatePoint) {
        if point != self.point {
            return;
        }
        // Only the first call parks
        let gate = self.gate.lock().take();
        if let Some((entered, release)) = gate {
            let _ = entered.send(());
            let _ = release.recv();
        }
    }
}

impl PluginStatePersistence for GatedPersistence {
    fn load_all_states(&self) -> Result<BTreeMap<String, bool>> {
        self.park(GatePoint::LoadStates);
        self.inner.load_all_states()
    }

    fn load_all_configs(&self) -> Result<BTreeMap<String, ConfigMap>> {
        self.inner.load_all_configs()
    }

    fn save_state(&self, plugin_id: &str, enabled: bool) -> Result<()> {
        self.park(GatePoint::SaveState);
        self.inner.save_state(plugin_id, enabled)
    }

    fn save_config(&self, plugin_id: &str, config: &ConfigMap) -> Result<()> {
        self.inner.save_config(plugin_id, config)
    }

    fn delete_state(&self, plugin_id: &str) -> Result<()> {
        self.inner.delete_state(plugin_id)
    }

    fn delete_config(&self, plugin_id: &str) -> Result<()> {
        self.inner.delete_config(plugin_id)
    }
}
