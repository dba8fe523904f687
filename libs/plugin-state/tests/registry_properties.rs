//! Coordinator and apply-path properties
//!
//! Exercises the registry through its public API with recording doubles for
//! the synchronizer and persistence, then feeds submitted operations back
//! through the consensus adapter the way a committed log entry would be.

// Allow unwrap() in tests for cleaner test code
#![allow(clippy::disallowed_methods)]

mod support;

use std::sync::Arc;

use bytes::Bytes;
use plugin_model::{PluginCategory, PluginOperation};
use plugin_state::{
    CriticalPlugins, ErrorKind, PluginError, PluginInstance, PluginManager,
    PluginStatePersistence, PluginStateProcessor, RegistrySettings, RequestProcessor, WriteRequest,
};
use support::{config, FixedProvider, Noop, RecordingPersistence, RecordingSync, Tunable};

fn committed(op: &PluginOperation) -> WriteRequest {
    WriteRequest {
        group: "plugin_state".to_string(),
        data: Bytes::from(op.encode().unwrap()),
        operation: "CHANGE".to_string(),
    }
}

/// Registry with `trace:otel`, the built-in dialects and `control:tps`
fn wired(critical: CriticalPlugins) -> (Arc<PluginManager>, Arc<RecordingSync>, Arc<Tunable>) {
    let manager = Arc::new(PluginManager::with_critical(RegistrySettings::default(), critical));
    let tunable = Arc::new(Tunable::default());

    let providers = vec![
        FixedProvider::new(PluginCategory::Trace)
            .with("otel", PluginInstance::opaque(Noop))
            .shared(),
        FixedProvider::new(PluginCategory::DatasourceDialect)
            .with("mysql", PluginInstance::opaque(Noop))
            .with("derby", PluginInstance::opaque(Noop))
            .with("postgresql", PluginInstance::opaque(Noop))
            .shared(),
        FixedProvider::new(PluginCategory::Control)
            .with("tps", PluginInstance::Configurable(tunable.clone()))
            .shared(),
        FixedProvider::new(PluginCategory::Auth)
            .with("nacos", PluginInstance::opaque(Noop))
            .with("ldap", PluginInstance::opaque(Noop))
            .shared(),
    ];
    manager.discover(&providers);

    let sync = Arc::new(RecordingSync::default());
    manager.set_synchronizer(sync.clone()).unwrap();
    (manager, sync, tunable)
}

// ============================================================================
// Critical Plugins
// ============================================================================

#[tokio::test]
async fn test_critical_plugins_cannot_be_disabled() {
    let (manager, sync, _) = wired(CriticalPlugins::builtin());

    for id in CriticalPlugins::builtin().iter() {
        let before = manager.get(id).unwrap();
        assert!(before.critical);

        let err = manager.set_enabled(id, false, false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let err = manager.set_enabled(id, false, true).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        assert_eq!(manager.get(id).unwrap().enabled, before.enabled);
    }
    assert!(sync.submitted.lock().is_empty());
}

#[tokio::test]
async fn test_auth_nacos_scenario() {
    let (manager, sync, _) = wired(CriticalPlugins::from_ids(["auth:nacos"]));

    let err = manager
        .set_enabled("auth:nacos", false, false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert!(err.to_string().contains("critical"));
    assert!(sync.submitted.lock().is_empty());

    manager.set_enabled("auth:nacos", true, false).await.unwrap();
    assert_eq!(
        *sync.submitted.lock(),
        vec![PluginOperation::change_state("auth:nacos", true).unwrap()]
    );
}

// ============================================================================
// Defaults and Lookups
// ============================================================================

#[test]
fn test_unknown_plugins_are_enabled() {
    let (manager, _, _) = wired(CriticalPlugins::builtin());
    assert!(manager.is_enabled("trace", "zipkin"));
    assert!(manager.is_enabled("no-such-category", "x"));
    assert!(manager.is_enabled_by_id("garbage"));
    assert!(manager.get("trace:zipkin").is_none());
}

#[test]
fn test_exclusive_defaults() {
    let (manager, _, _) = wired(CriticalPlugins::builtin());

    assert!(manager.is_enabled("auth", "nacos"));
    assert!(!manager.is_enabled("auth", "ldap"));
    assert!(manager.is_enabled("datasource-dialect", "mysql"));
    assert!(!manager.is_enabled("datasource-dialect", "derby"));
    assert!(manager.is_enabled("trace", "otel"));
}

#[tokio::test]
async fn test_unknown_plugin_mutations_fail() {
    let (manager, sync, _) = wired(CriticalPlugins::builtin());

    let err = manager
        .set_enabled("trace:zipkin", false, false)
        .await
        .unwrap_err();
    assert!(matches!(err, PluginError::NotFound(_)));

    let err = manager
        .update_config("trace:zipkin", config(&[]), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(sync.submitted.lock().is_empty());
}

// ============================================================================
// Config Validation
// ============================================================================

#[tokio::test]
async fn test_required_field_validation() {
    let (manager, sync, _) = wired(CriticalPlugins::builtin());

    let err = manager
        .update_config("control:tps", config(&[("optionalKey", "5")]), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert!(err.to_string().contains("requiredKey"));

    let err = manager
        .update_config("control:tps", config(&[("requiredKey", "")]), false)
        .await
        .unwrap_err();
    assert!(matches!(err, PluginError::MissingRequiredConfig { ref key, .. } if key == "requiredKey"));
    assert!(sync.submitted.lock().is_empty());

    let accepted = config(&[("requiredKey", "v")]);
    manager
        .update_config("control:tps", accepted.clone(), false)
        .await
        .unwrap();
    assert_eq!(
        *sync.submitted.lock(),
        vec![PluginOperation::update_config("control:tps", accepted).unwrap()]
    );
}

#[tokio::test]
async fn test_config_on_opaque_plugin_rejected() {
    let (manager, sync, _) = wired(CriticalPlugins::builtin());
    let err = manager
        .update_config("trace:otel", config(&[("k", "v")]), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert!(err.to_string().contains("does not support configuration"));
    assert!(sync.submitted.lock().is_empty());
}

// ============================================================================
// Apply Path
// ============================================================================

#[tokio::test]
async fn test_trace_otel_scenario() {
    let (manager, sync, _) = wired(CriticalPlugins::builtin());
    let persistence = Arc::new(RecordingPersistence::default());
    let processor = PluginStateProcessor::new("plugin_state", manager.clone(), persistence.clone());

    assert!(manager.is_enabled("trace", "otel"));
    manager.set_enabled("trace:otel", false, false).await.unwrap();

    // Submission alone does not flip the flag
    assert!(manager.is_enabled("trace", "otel"));

    let submitted = sync.submitted.lock().clone();
    assert_eq!(
        submitted,
        vec![PluginOperation::change_state("trace:otel", false).unwrap()]
    );

    let response = processor.on_apply(&committed(&submitted[0]));
    assert!(response.success);
    assert!(!manager.is_enabled("trace", "otel"));
    assert_eq!(
        *persistence.state_writes.lock(),
        vec![("trace:otel".to_string(), false)]
    );
}

#[test]
fn test_apply_is_idempotent_and_not_deduplicated() {
    let (manager, _, _) = wired(CriticalPlugins::builtin());
    let persistence = Arc::new(RecordingPersistence::default());
    let processor = PluginStateProcessor::new("plugin_state", manager.clone(), persistence.clone());

    let op = PluginOperation::change_state("trace:otel", false).unwrap();
    assert!(processor.on_apply(&committed(&op)).success);
    assert!(processor.on_apply(&committed(&op)).success);

    assert!(!manager.is_enabled("trace", "otel"));
    assert_eq!(persistence.state_writes.lock().len(), 2);
}

#[test]
fn test_committed_config_reaches_plugin() {
    let (manager, _, tunable) = wired(CriticalPlugins::builtin());
    let persistence = Arc::new(RecordingPersistence::default());
    let processor = PluginStateProcessor::new("plugin_state", manager.clone(), persistence.clone());

    let values = config(&[("requiredKey", "v"), ("optionalKey", "3")]);
    let op = PluginOperation::update_config("control:tps", values.clone()).unwrap();
    assert!(processor.on_apply(&committed(&op)).success);

    assert_eq!(*tunable.applied.lock(), vec![values.clone()]);
    assert_eq!(manager.get("control:tps").unwrap().config, values);
    assert_eq!(persistence.config_writes.lock().len(), 1);
}

#[test]
fn test_committed_disable_of_critical_is_ignored() {
    let (manager, _, _) = wired(CriticalPlugins::builtin());
    let persistence = Arc::new(RecordingPersistence::default());
    let processor = PluginStateProcessor::new("plugin_state", manager.clone(), persistence.clone());

    let op = PluginOperation::change_state("datasource-dialect:mysql", false).unwrap();
    assert!(processor.on_apply(&committed(&op)).success);
    assert!(manager.is_enabled("datasource-dialect", "mysql"));

    // Persisted state matches what the registry kept
    assert_eq!(
        *persistence.state_writes.lock(),
        vec![("datasource-dialect:mysql".to_string(), true)]
    );
    assert_eq!(
        persistence.inner.load_all_states().unwrap().get("datasource-dialect:mysql"),
        Some(&true)
    );
}

#[tokio::test]
async fn test_local_only_bypasses_synchronizer() {
    let (manager, sync, tunable) = wired(CriticalPlugins::builtin());

    manager.set_enabled("trace:otel", false, true).await.unwrap();
    assert!(!manager.is_enabled("trace", "otel"));

    manager
        .update_config("control:tps", config(&[("requiredKey", "local")]), true)
        .await
        .unwrap();
    assert_eq!(tunable.applied.lock().len(), 1);
    assert!(sync.submitted.lock().is_empty());
}

#[test]
fn test_list_views_are_copies() {
    let (manager, _, _) = wired(CriticalPlugins::builtin());

    let mut all = manager.list_all();
    assert_eq!(all.len(), 7);
    let ids: Vec<_> = all.iter().map(|d| d.plugin_id.clone()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    all[0].enabled = !all[0].enabled;
    assert_ne!(manager.get(&all[0].plugin_id).unwrap().enabled, all[0].enabled);

    let dialects = manager.list_by_category(PluginCategory::DatasourceDialect);
    assert_eq!(dialects.len(), 3);
    assert!(dialects.iter().all(|d| d.summary().critical));
}
