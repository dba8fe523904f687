//! Read-only view of plugin enablement for unrelated callers

/// Answers whether a plugin is enabled on this node
pub trait PluginStateChecker: Send + Sync {
    /// Unknown plugins report `true`
    fn is_plugin_enabled(&self, category: &str, name: &str) -> bool;
}

/// Fallback for callers built before the registry exists
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysEnabled;

impl PluginStateChecker for AlwaysEnabled {
    fn is_plugin_enabled(&self, _category: &str, _name: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_always_enabled() {
        let checker: Arc<dyn PluginStateChecker> = Arc::new(AlwaysEnabled);
        assert!(checker.is_plugin_enabled("auth", "ldap"));
        assert!(checker.is_plugin_enabled("", ""));
    }
}
