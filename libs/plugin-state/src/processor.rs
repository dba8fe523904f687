//! Consensus adapter
//!
//! The state machine endpoint registered for the plugin replication group.
//! Committed entries are decoded, applied to the registry, then persisted.
//! Applies share a read lock; snapshot save/load take it exclusively.

use std::sync::Arc;

use parking_lot::RwLock;
use plugin_model::{ModelError, PluginOperation};
use tracing::{error, info};

use crate::consensus::{ReadRequest, RequestProcessor, Response, SnapshotOperation, WriteRequest};
use crate::error::Result;
use crate::manager::PluginStateApplier;
use crate::persistence::PluginStatePersistence;
use crate::snapshot::PluginStateSnapshotOperation;

/// Replicated state machine for plugin state
pub struct PluginStateProcessor {
    group: String,
    applier: Arc<dyn PluginStateApplier>,
    persistence: Arc<dyn PluginStatePersistence>,
    lock: Arc<RwLock<()>>,
    snapshot: Arc<PluginStateSnapshotOperation>,
}

impl PluginStateProcessor {
    pub fn new(
        group: impl Into<String>,
        applier: Arc<dyn PluginStateApplier>,
        persistence: Arc<dyn PluginStatePersistence>,
    ) -> Self {
        let lock = Arc::new(RwLock::new(()));
        let snapshot = Arc::new(PluginStateSnapshotOperation::new(
            applier.clone(),
            persistence.clone(),
            lock.clone(),
        ));
        Self {
            group: group.into(),
            applier,
            persistence,
            lock,
            snapshot,
        }
    }

    /// Lock shared by applies (read) and snapshots (write)
    pub fn lock(&self) -> Arc<RwLock<()>> {
        self.lock.clone()
    }

    pub fn snapshot_operation(&self) -> Arc<PluginStateSnapshotOperation> {
        self.snapshot.clone()
    }

    fn apply(&self, operation: &PluginOperation) -> Result<()> {
        match operation {
            PluginOperation::ChangeState { plugin_id, enabled } => {
                let effective = self.applier.apply_state_change(plugin_id, *enabled)?;
                self.persistence.save_state(plugin_id, effective)?;
                info!(
                    "[PluginStateProcessor] Applied state change: {}={}",
                    plugin_id, effective
                );
            },
            PluginOperation::UpdateConfig { plugin_id, config } => {
                self.applier.apply_config_change(plugin_id, config)?;
                self.persistence.save_config(plugin_id, config)?;
                info!(
                    "[PluginStateProcessor] Applied config change: {}",
                    plugin_id
                );
            },
        }
        Ok(())
    }
}

/// `pluginId=..., operation=...` for failure messages
fn operation_context(plugin_id: Option<&str>, operation: Option<&str>) -> String {
    match (plugin_id, operation) {
        (Some(id), Some(op)) => format!("pluginId={}, operation={}", id, op),
        (Some(id), None) => format!("pluginId={}, operation=null", id),
        (None, Some(op)) => format!("operation={}", op),
        (None, None) => "operation=null".to_string(),
    }
}

fn decode_context(err: &ModelError) -> String {
    match err {
        ModelError::UnknownOperation { plugin_id, kind } => {
            operation_context(plugin_id.as_deref(), Some(kind.as_str()))
        },
        ModelError::MissingField { plugin_id, kind, .. } => {
            operation_context(Some(plugin_id.as_str()), Some(*kind))
        },
        other => operation_context(other.plugin_id(), None),
    }
}

impl RequestProcessor for PluginStateProcessor {
    fn group(&self) -> &str {
        &self.group
    }

    fn on_request(&self, _request: &ReadRequest) -> Response {
        // Reads are served from the registry directly
        Response::ok()
    }

    fn on_apply(&self, request: &WriteRequest) -> Response {
        let _guard = self.lock.read();

        let operation = match PluginOperation::decode(&request.data) {
            Ok(operation) => operation,
            Err(e) => {
                let context = decode_context(&e);
                error!(
                    "[PluginStateProcessor] Failed to decode operation [{}]: {}",
                    context, e
                );
                return Response::fail(format!("[{}] {}", context, e));
            },
        };

        match self.apply(&operation) {
            Ok(()) => Response::ok(),
            Err(e) => {
                let context =
                    operation_context(Some(operation.plugin_id()), Some(operation.kind().as_str()));
                error!(
                    plugin_id = %operation.plugin_id(),
                    operation = %operation.kind(),
                    "[PluginStateProcessor] Failed to apply operation [{}]: {}",
                    context,
                    e
                );
                Response::fail(format!("[{}] {}", context, e))
            },
        }
    }

    fn snapshot_operations(&self) -> Vec<Arc<dyn SnapshotOperation>> {
        vec![self.snapshot.clone()]
    }
}
