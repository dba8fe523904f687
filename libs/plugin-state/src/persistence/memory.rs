//! In-memory persistence
//!
//! Uses DashMap for concurrent access. Nothing survives the process; intended
//! for tests and single-process embedding.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use plugin_model::ConfigMap;

use super::PluginStatePersistence;
use crate::error::Result;

/// In-memory persistence backend
#[derive(Clone, Default)]
pub struct MemoryPersistence {
    states: Arc<DashMap<String, bool>>,
    configs: Arc<DashMap<String, ConfigMap>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.states.clear();
        self.configs.clear();
    }

    /// Get statistics about stored data
    pub fn stats(&self) -> MemoryPersistenceStats {
        MemoryPersistenceStats {
            state_count: self.states.len(),
            config_count: self.configs.len(),
        }
    }
}

/// Memory persistence statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryPersistenceStats {
    pub state_count: usize,
    pub config_count: usize,
}

impl PluginStatePersistence for MemoryPersistence {
    fn load_all_states(&self) -> Result<BTreeMap<String, bool>> {
        Ok(self
            .states
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect())
    }

    fn load_all_configs(&self) -> Result<BTreeMap<String, ConfigMap>> {
        Ok(self
            .configs
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    fn save_state(&self, plugin_id: &str, enabled: bool) -> Result<()> {
        self.states.insert(plugin_id.to_string(), enabled);
        Ok(())
    }

    fn save_config(&self, plugin_id: &str, config: &ConfigMap) -> Result<()> {
        self.configs.insert(plugin_id.to_string(), config.clone());
        Ok(())
    }

    fn delete_state(&self, plugin_id: &str) -> Result<()> {
        self.states.remove(plugin_id);
        Ok(())
    }

    fn delete_config(&self, plugin_id: &str) -> Result<()> {
        self.configs.remove(plugin_id);
        Ok(())
    }
}
