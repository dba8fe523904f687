//! Node bootstrap
//!
//! Wires one registry per process: discovery, persisted overrides, the
//! synchronizer and (when clustered) the consensus adapter.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::checker::PluginStateChecker;
use crate::consensus::CpProtocol;
use crate::error::{PluginError, Result};
use crate::manager::{PluginManager, PluginStateApplier};
use crate::persistence::PluginStatePersistence;
use crate::plugin::PluginProvider;
use crate::processor::PluginStateProcessor;
use crate::sync::{RaftSynchronizer, StandaloneSynchronizer};

/// A fully wired plugin registry
pub struct PluginStateNode {
    manager: Arc<PluginManager>,
    persistence: Arc<dyn PluginStatePersistence>,
    processor: Option<Arc<PluginStateProcessor>>,
}

impl PluginStateNode {
    /// Single-node registry: changes apply and persist immediately
    pub fn standalone(
        manager: PluginManager,
        providers: &[Arc<dyn PluginProvider>],
        persistence: Arc<dyn PluginStatePersistence>,
    ) -> Result<Self> {
        let manager = Self::bootstrap(manager, providers, persistence.as_ref())?;

        let applier: Arc<dyn PluginStateApplier> = manager.clone();
        manager.set_synchronizer(Arc::new(StandaloneSynchronizer::new(
            Arc::downgrade(&applier),
            persistence.clone(),
        )))?;

        info!("[PluginStateNode] Started in standalone mode");
        Ok(Self {
            manager,
            persistence,
            processor: None,
        })
    }

    /// Clustered registry: changes go through the replication group
    pub fn clustered(
        manager: PluginManager,
        providers: &[Arc<dyn PluginProvider>],
        persistence: Arc<dyn PluginStatePersistence>,
        protocol: Arc<dyn CpProtocol>,
    ) -> Result<Self> {
        let manager = Self::bootstrap(manager, providers, persistence.as_ref())?;
        let group = manager.settings().group.clone();

        let mut synchronizer = RaftSynchronizer::new(protocol.clone(), group.clone());
        if let Some(ms) = manager.settings().submit_timeout_ms {
            synchronizer = synchronizer.with_timeout(Duration::from_millis(ms));
        }
        manager.set_synchronizer(Arc::new(synchronizer))?;

        let processor = Arc::new(PluginStateProcessor::new(
            group.clone(),
            manager.clone(),
            persistence.clone(),
        ));
        protocol
            .add_request_processor(processor.clone())
            .map_err(|e| PluginError::sync(format!("Failed to register processor: {:#}", e)))?;

        info!("[PluginStateNode] Joined replication group {}", group);
        Ok(Self {
            manager,
            persistence,
            processor: Some(processor),
        })
    }

    fn bootstrap(
        manager: PluginManager,
        providers: &[Arc<dyn PluginProvider>],
        persistence: &dyn PluginStatePersistence,
    ) -> Result<Arc<PluginManager>> {
        let manager = Arc::new(manager);
        manager.discover(providers);
        manager.load_persisted(persistence)?;
        Ok(manager)
    }

    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.manager
    }

    pub fn persistence(&self) -> &Arc<dyn PluginStatePersistence> {
        &self.persistence
    }

    /// Consensus adapter, present only for clustered nodes
    pub fn processor(&self) -> Option<&Arc<PluginStateProcessor>> {
        self.processor.as_ref()
    }

    /// Read-only view for callers that only need `is_plugin_enabled`
    pub fn checker(&self) -> Arc<dyn PluginStateChecker> {
        self.manager.clone()
    }

    pub fn is_clustered(&self) -> bool {
        self.processor.is_some()
    }
}

impl std::fmt::Debug for PluginStateNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginStateNode")
            .field("plugins", &self.manager.local_plugin_ids().len())
            .field("clustered", &self.is_clustered())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::config::RegistrySettings;
    use crate::consensus::{RequestProcessor, Response, WriteRequest};
    use crate::persistence::MemoryPersistence;
    use crate::plugin::{Plugin, PluginInstance};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use plugin_model::PluginCategory;
    use std::collections::BTreeMap;

    struct Noop;
    impl Plugin for Noop {}

    struct TraceProvider;
    impl PluginProvider for TraceProvider {
        fn category(&self) -> PluginCategory {
            PluginCategory::Trace
        }
        fn all_plugins(&self) -> anyhow::Result<BTreeMap<String, PluginInstance>> {
            let mut plugins = BTreeMap::new();
            plugins.insert("otel".to_string(), PluginInstance::opaque(Noop));
            Ok(plugins)
        }
    }

    #[derive(Default)]
    struct CapturingProtocol {
        processors: Mutex<Vec<Arc<dyn RequestProcessor>>>,
    }

    #[async_trait]
    impl CpProtocol for CapturingProtocol {
        async fn write(&self, _request: WriteRequest) -> anyhow::Result<Response> {
            Ok(Response::ok())
        }
        fn add_request_processor(&self, processor: Arc<dyn RequestProcessor>) -> anyhow::Result<()> {
            self.processors.lock().push(processor);
            Ok(())
        }
    }

    fn providers() -> Vec<Arc<dyn PluginProvider>> {
        vec![Arc::new(TraceProvider)]
    }

    #[tokio::test]
    async fn test_standalone_applies_immediately() {
        let persistence = Arc::new(MemoryPersistence::new());
        let node = PluginStateNode::standalone(
            PluginManager::new(RegistrySettings::default()),
            &providers(),
            persistence.clone(),
        )
        .unwrap();

        assert!(!node.is_clustered());
        node.manager()
            .set_enabled("trace:otel", false, false)
            .await
            .unwrap();
        assert!(!node.checker().is_plugin_enabled("trace", "otel"));
        assert_eq!(persistence.stats().state_count, 1);
    }

    #[test]
    fn test_persisted_overrides_win() {
        let persistence = Arc::new(MemoryPersistence::new());
        persistence.save_state("trace:otel", false).unwrap();

        let node = PluginStateNode::standalone(
            PluginManager::new(RegistrySettings::default()),
            &providers(),
            persistence,
        )
        .unwrap();
        assert!(!node.manager().is_enabled("trace", "otel"));
    }

    #[test]
    fn test_clustered_registers_processor() {
        let protocol = Arc::new(CapturingProtocol::default());
        let node = PluginStateNode::clustered(
            PluginManager::new(RegistrySettings::default()),
            &providers(),
            Arc::new(MemoryPersistence::new()),
            protocol.clone(),
        )
        .unwrap();

        assert!(node.is_clustered());
        let processors = protocol.processors.lock();
        assert_eq!(processors.len(), 1);
        assert_eq!(processors[0].group(), "plugin_state");
    }
}
