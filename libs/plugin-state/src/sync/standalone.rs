//! Single-node synchronizer: apply, then persist

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use plugin_model::ConfigMap;
use tracing::debug;

use super::PluginStateSynchronizer;
use crate::error::{PluginError, Result};
use crate::manager::PluginStateApplier;
use crate::persistence::PluginStatePersistence;

/// Applies changes immediately on this node
///
/// Holds the applier weakly: the coordinator owns the synchronizer.
pub struct StandaloneSynchronizer {
    applier: Weak<dyn PluginStateApplier>,
    persistence: Arc<dyn PluginStatePersistence>,
}

impl StandaloneSynchronizer {
    pub fn new(
        applier: Weak<dyn PluginStateApplier>,
        persistence: Arc<dyn PluginStatePersistence>,
    ) -> Self {
        Self {
            applier,
            persistence,
        }
    }

    fn applier(&self) -> Result<Arc<dyn PluginStateApplier>> {
        self.applier
            .upgrade()
            .ok_or_else(|| PluginError::sync("Plugin registry is no longer available"))
    }
}

#[async_trait]
impl PluginStateSynchronizer for StandaloneSynchronizer {
    async fn sync_state_change(&self, plugin_id: &str, enabled: bool) -> Result<()> {
        let effective = self.applier()?.apply_state_change(plugin_id, enabled)?;
        self.persistence
            .save_state(plugin_id, effective)
            .map_err(|e| PluginError::sync(format!("Failed to persist plugin state: {}", e)))?;
        debug!("[StandaloneSync] Applied state change {}={}", plugin_id, effective);
        Ok(())
    }

    async fn sync_config_change(&self, plugin_id: &str, config: &ConfigMap) -> Result<()> {
        self.applier()?.apply_config_change(plugin_id, config)?;
        self.persistence
            .save_config(plugin_id, config)
            .map_err(|e| PluginError::sync(format!("Failed to persist plugin config: {}", e)))?;
        debug!("[StandaloneSync] Applied config change for {}", plugin_id);
        Ok(())
    }
}
