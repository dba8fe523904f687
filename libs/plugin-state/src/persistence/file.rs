//! File-backed persistence
//!
//! Two JSON documents under `<data_dir>/plugin/`:
//! - `plugin-states.json`: `{ "<pluginId>": bool }`
//! - `plugin-configs.json`: `{ "<pluginId>": { "<key>": "<value>" } }`
//!
//! Each write is a read-modify-write of the whole document under that file's
//! mutex, landing through a temp file and a rename.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use plugin_model::ConfigMap;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use super::PluginStatePersistence;
use crate::error::{PluginError, Result};

/// Subdirectory of the data dir holding plugin documents
pub const PLUGIN_SUBDIR: &str = "plugin";
pub const STATES_FILE: &str = "plugin-states.json";
pub const CONFIGS_FILE: &str = "plugin-configs.json";

/// File persistence backend
pub struct FilePersistence {
    dir: PathBuf,
    states_path: PathBuf,
    configs_path: PathBuf,
    states_lock: Mutex<()>,
    configs_lock: Mutex<()>,
}

impl FilePersistence {
    /// Open (and create if needed) `<data_dir>/plugin/`
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref().join(PLUGIN_SUBDIR);
        fs::create_dir_all(&dir).map_err(|e| {
            PluginError::persistence(format!(
                "Failed to create plugin data directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        info!("[PluginPersistence] Using data directory {}", dir.display());

        Ok(Self {
            states_path: dir.join(STATES_FILE),
            configs_path: dir.join(CONFIGS_FILE),
            dir,
            states_lock: Mutex::new(()),
            configs_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn update_states<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, bool>),
    {
        let _guard = self.states_lock.lock();
        let mut states: BTreeMap<String, bool> = read_document(&self.states_path)?;
        mutate(&mut states);
        write_document(&self.states_path, &states)
    }

    fn update_configs<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, ConfigMap>),
    {
        let _guard = self.configs_lock.lock();
        let mut configs: BTreeMap<String, ConfigMap> = read_document(&self.configs_path)?;
        mutate(&mut configs);
        write_document(&self.configs_path, &configs)
    }
}

impl PluginStatePersistence for FilePersistence {
    fn load_all_states(&self) -> Result<BTreeMap<String, bool>> {
        let _guard = self.states_lock.lock();
        read_document(&self.states_path)
    }

    fn load_all_configs(&self) -> Result<BTreeMap<String, ConfigMap>> {
        let _guard = self.configs_lock.lock();
        read_document(&self.configs_path)
    }

    fn save_state(&self, plugin_id: &str, enabled: bool) -> Result<()> {
        self.update_states(|states| {
            states.insert(plugin_id.to_string(), enabled);
        })?;
        debug!("[PluginPersistence] Saved state {}={}", plugin_id, enabled);
        Ok(())
    }

    fn save_config(&self, plugin_id: &str, config: &ConfigMap) -> Result<()> {
        self.update_configs(|configs| {
            configs.insert(plugin_id.to_string(), config.clone());
        })?;
        debug!("[PluginPersistence] Saved config for {}", plugin_id);
        Ok(())
    }

    fn delete_state(&self, plugin_id: &str) -> Result<()> {
        self.update_states(|states| {
            states.remove(plugin_id);
        })
    }

    fn delete_config(&self, plugin_id: &str) -> Result<()> {
        self.update_configs(|configs| {
            configs.remove(plugin_id);
        })
    }
}

/// Missing or blank file reads as an empty document
fn read_document<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path).map_err(|e| {
        PluginError::persistence(format!("Failed to read {}: {}", path.display(), e))
    })?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&content).map_err(|e| {
        PluginError::persistence(format!("Failed to parse {}: {}", path.display(), e))
    })
}

fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");

    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    };
    write().map_err(|e| {
        PluginError::persistence(format!("Failed to write {}: {}", path.display(), e))
    })
}
