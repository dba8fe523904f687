//! Consensus-backed synchronizer
//!
//! Serializes each change into a `PluginOperation` and submits it to the
//! replication group. The change is applied later, on every node, by the
//! processor's apply path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use plugin_model::{ConfigMap, PluginOperation};
use tracing::{debug, error};

use super::PluginStateSynchronizer;
use crate::consensus::{CpProtocol, WriteRequest};
use crate::error::{PluginError, Result};

/// Operation tag carried on every write request
pub const WRITE_OPERATION: &str = "CHANGE";

/// Submits plugin changes through the consensus protocol
pub struct RaftSynchronizer {
    protocol: Arc<dyn CpProtocol>,
    group: String,
    timeout: Option<Duration>,
}

impl RaftSynchronizer {
    pub fn new(protocol: Arc<dyn CpProtocol>, group: impl Into<String>) -> Self {
        Self {
            protocol,
            group: group.into(),
            timeout: None,
        }
    }

    /// Fail submissions that take longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn submit(&self, operation: PluginOperation) -> Result<()> {
        let request = WriteRequest {
            group: self.group.clone(),
            data: Bytes::from(operation.encode()?),
            operation: WRITE_OPERATION.to_string(),
        };

        let pending = self.protocol.write(request);
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, pending).await.map_err(|_| {
                PluginError::sync(format!(
                    "Timed out submitting plugin state to Raft after {:?}",
                    limit
                ))
            })?,
            None => pending.await,
        };

        let response = outcome.map_err(|e| {
            error!(
                "[RaftSync] Submission failed, pluginId={}: {:#}",
                operation.plugin_id(),
                e
            );
            PluginError::sync(format!("Failed to submit plugin state to Raft: {:#}", e))
        })?;

        if !response.success {
            return Err(PluginError::sync(format!(
                "Failed to submit plugin state to Raft: {}",
                response.error_message()
            )));
        }

        debug!(
            "[RaftSync] Submitted {} for {}",
            operation.kind(),
            operation.plugin_id()
        );
        Ok(())
    }
}

#[async_trait]
impl PluginStateSynchronizer for RaftSynchronizer {
    async fn sync_state_change(&self, plugin_id: &str, enabled: bool) -> Result<()> {
        self.submit(PluginOperation::change_state(plugin_id, enabled)?)
            .await
    }

    async fn sync_config_change(&self, plugin_id: &str, config: &ConfigMap) -> Result<()> {
        self.submit(PluginOperation::update_config(plugin_id, config.clone())?)
            .await
    }
}
