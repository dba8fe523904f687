//! Plugins that may never be disabled

use std::collections::BTreeSet;

/// Built-in critical plugin ids
pub const BUILTIN_CRITICAL_PLUGINS: [&str; 3] = [
    "datasource-dialect:mysql",
    "datasource-dialect:derby",
    "datasource-dialect:postgresql",
];

/// Fixed set of critical plugin ids, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalPlugins {
    ids: BTreeSet<String>,
}

impl CriticalPlugins {
    pub fn builtin() -> Self {
        Self::from_ids(BUILTIN_CRITICAL_PLUGINS)
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, plugin_id: &str) -> bool {
        self.ids.contains(plugin_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for CriticalPlugins {
    fn default() -> Self {
        Self::builtin()
    }
}
