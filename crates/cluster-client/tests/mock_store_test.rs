//! Store semantics of MockClusterClient
//!
//! The reconciler tests lean on the mock behaving like the API server, so the
//! behaviours they depend on are pinned down here.

use cluster_client::{ClusterClientTrait, ClusterError, Failure, MockClusterClient, ObjectKey, Operation};
use crds::{DashboardConfig, DashboardConfigSpec, DashboardConfigStatus};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

fn dashboard(name: &str) -> DashboardConfig {
    let mut dc = DashboardConfig::new(
        name,
        DashboardConfigSpec {
            title: name.to_string(),
            payload: "{}".to_string(),
        },
    );
    dc.metadata.namespace = Some("monitoring".to_string());
    dc
}

fn config_map(name: &str, value: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("monitoring".to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([("dashboard.json".to_string(), value.to_string())])),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_get_missing_objects_is_not_found() {
    let mock = MockClusterClient::new();
    let key = ObjectKey::new("monitoring", "ghost");

    let err = mock.get_dashboard_config(&key).await.unwrap_err();
    assert!(err.is_not_found());
    let err = mock.get_config_map(&key).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_add_assigns_uid_and_resource_version() {
    let mock = MockClusterClient::new();
    let stored = mock.add_dashboard_config(dashboard("alpha"));

    assert!(stored.metadata.uid.is_some());
    assert!(stored.metadata.resource_version.is_some());

    let fetched = mock
        .get_dashboard_config(&ObjectKey::new("monitoring", "alpha"))
        .await
        .unwrap();
    assert_eq!(fetched.metadata.uid, stored.metadata.uid);
}

#[tokio::test]
async fn test_create_twice_is_already_exists() {
    let mock = MockClusterClient::new();
    mock.create_config_map(&config_map("alpha-dashboard", "1")).await.unwrap();

    let err = mock
        .create_config_map(&config_map("alpha-dashboard", "2"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterError::AlreadyExists(_)));
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_replace_with_stale_version_conflicts() {
    let mock = MockClusterClient::new();
    let created = mock.create_config_map(&config_map("alpha-dashboard", "1")).await.unwrap();

    let mut first = created.clone();
    first.data = Some(BTreeMap::from([("dashboard.json".to_string(), "2".to_string())]));
    mock.replace_config_map(&first).await.unwrap();

    // `created` still carries the original resourceVersion
    let err = mock.replace_config_map(&created).await.unwrap_err();
    assert!(matches!(err, ClusterError::Conflict(_)));

    let key = ObjectKey::new("monitoring", "alpha-dashboard");
    assert_eq!(mock.config_map(&key).unwrap().data.unwrap()["dashboard.json"], "2");
}

#[tokio::test]
async fn test_status_update_only_touches_status() {
    let mock = MockClusterClient::new();
    let mut stored = mock.add_dashboard_config(dashboard("alpha"));

    stored.spec.payload = "changed".to_string();
    stored.status = Some(DashboardConfigStatus { applied: true });
    let updated = mock.update_dashboard_config_status(&stored).await.unwrap();

    assert!(updated.is_applied());
    assert_eq!(updated.spec.payload, "{}");
    assert_ne!(updated.metadata.resource_version, stored.metadata.resource_version);
}

#[tokio::test]
async fn test_status_update_after_edit_conflicts() {
    let mock = MockClusterClient::new();
    let key = ObjectKey::new("monitoring", "alpha");
    let mut stored = mock.add_dashboard_config(dashboard("alpha"));

    mock.edit_dashboard_config(&key, |spec| spec.payload = "{\"a\":2}".to_string());

    stored.status = Some(DashboardConfigStatus { applied: true });
    let err = mock.update_dashboard_config_status(&stored).await.unwrap_err();
    assert!(matches!(err, ClusterError::Conflict(_)));
    assert!(!mock.dashboard_config(&key).unwrap().is_applied());
}

#[tokio::test]
async fn test_delete_collects_controlled_config_maps_only() {
    let mock = MockClusterClient::new();
    let owner = mock.add_dashboard_config(dashboard("alpha"));

    let mut owned = config_map("alpha-dashboard", "1");
    mock.set_controller_reference(&owner, &mut owned.metadata).unwrap();
    mock.put_config_map(owned);
    mock.put_config_map(config_map("unrelated", "x"));

    mock.delete_dashboard_config(&ObjectKey::new("monitoring", "alpha"));

    assert!(mock.config_map(&ObjectKey::new("monitoring", "alpha-dashboard")).is_none());
    assert!(mock.config_map(&ObjectKey::new("monitoring", "unrelated")).is_some());
}

#[tokio::test]
async fn test_injected_failures_fire_once_in_order() {
    let mock = MockClusterClient::new();
    mock.add_dashboard_config(dashboard("alpha"));
    let key = ObjectKey::new("monitoring", "alpha");

    mock.fail_next(Operation::GetDashboardConfig, Failure::Unavailable);
    mock.fail_next(Operation::GetDashboardConfig, Failure::NotFound);

    let err = mock.get_dashboard_config(&key).await.unwrap_err();
    assert!(matches!(err, ClusterError::Api { code: 503, .. }));
    assert!(mock.get_dashboard_config(&key).await.unwrap_err().is_not_found());
    assert!(mock.get_dashboard_config(&key).await.is_ok());

    assert_eq!(mock.calls(), vec![Operation::GetDashboardConfig; 3]);
    assert_eq!(mock.write_count(), 0);
}

#[test]
fn test_debug_output_summarises_store() {
    let mock = MockClusterClient::new();
    mock.add_dashboard_config(dashboard("alpha"));

    let rendered = format!("{:?}", mock);
    assert!(rendered.starts_with("MockClusterClient"));
    assert!(rendered.contains("dashboard_configs: 1"));
    assert!(rendered.contains("config_maps: 0"));
}
