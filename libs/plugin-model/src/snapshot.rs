//! Point-in-time capture of all replicated plugin state

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::ConfigMap;

/// States and configs of every plugin, as stored in a snapshot archive
///
/// Either half may be absent; an absent half restores nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub states: Option<BTreeMap<String, bool>>,
    #[serde(default)]
    pub configs: Option<BTreeMap<String, ConfigMap>>,
}

impl RegistrySnapshot {
    pub fn new(states: BTreeMap<String, bool>, configs: BTreeMap<String, ConfigMap>) -> Self {
        Self {
            states: Some(states),
            configs: Some(configs),
        }
    }

    pub fn state_count(&self) -> usize {
        self.states.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn config_count(&self) -> usize {
        self.configs.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.state_count() == 0 && self.config_count() == 0
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
