//! Cluster synchronizers
//!
//! The coordinator never mutates replicated state on its own; it hands the
//! change to a synchronizer:
//! - `RaftSynchronizer` submits a `PluginOperation` to the consensus protocol
//! - `StandaloneSynchronizer` applies and persists immediately (single node)

mod raft;
mod standalone;

pub use raft::{RaftSynchronizer, WRITE_OPERATION};
pub use standalone::StandaloneSynchronizer;

use async_trait::async_trait;
use plugin_model::ConfigMap;

use crate::error::Result;

/// Submits state changes to the cluster
///
/// Returning `Ok` means the change was accepted, not that it was applied.
#[async_trait]
pub trait PluginStateSynchronizer: Send + Sync {
    async fn sync_state_change(&self, plugin_id: &str, enabled: bool) -> Result<()>;

    async fn sync_config_change(&self, plugin_id: &str, config: &ConfigMap) -> Result<()>;
}
