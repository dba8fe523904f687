//! Durable storage of plugin states and configs
//!
//! Implementations:
//! - `FilePersistence`: JSON documents under `<data_dir>/plugin/`
//! - `MemoryPersistence`: in-memory backend for tests and embedded use
//!
//! Every call is expected to be crash-consistent on its own; no multi-key
//! transaction is required.

mod file;
mod memory;

pub use file::{FilePersistence, CONFIGS_FILE, PLUGIN_SUBDIR, STATES_FILE};
pub use memory::{MemoryPersistence, MemoryPersistenceStats};

use std::collections::BTreeMap;

use plugin_model::ConfigMap;

use crate::error::Result;

/// Persistence collaborator of the registry
pub trait PluginStatePersistence: Send + Sync {
    // ========== Bulk Reads ==========

    /// All persisted enabled flags, keyed by plugin id
    fn load_all_states(&self) -> Result<BTreeMap<String, bool>>;

    /// All persisted configs, keyed by plugin id
    fn load_all_configs(&self) -> Result<BTreeMap<String, ConfigMap>>;

    // ========== Single-Key Writes ==========

    fn save_state(&self, plugin_id: &str, enabled: bool) -> Result<()>;

    fn save_config(&self, plugin_id: &str, config: &ConfigMap) -> Result<()>;

    fn delete_state(&self, plugin_id: &str) -> Result<()>;

    fn delete_config(&self, plugin_id: &str) -> Result<()>;
}
