//! Test utilities for unit testing reconcilers
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::reconciler::Reconciler;
use cluster_client::{MockClusterClient, ObjectKey};
use crds::{DashboardConfig, DashboardConfigSpec};

/// Helper to create a test DashboardConfig CRD (not yet stored)
pub fn create_test_dashboard_config(name: &str, namespace: &str, payload: &str) -> DashboardConfig {
    let mut dc = DashboardConfig::new(
        name,
        DashboardConfigSpec {
            title: format!("{} dashboard", name),
            payload: payload.to_string(),
        },
    );
    dc.metadata.namespace = Some(namespace.to_string());
    dc
}

/// Helper to create a reconciler over a fresh mock, with `name` stored in `monitoring`.
///
/// Returns the reconciler, a handle onto the same mock store, and the key of
/// the stored DashboardConfig.
pub fn setup_reconciler(
    name: &str,
    payload: &str,
) -> (Reconciler<MockClusterClient>, MockClusterClient, ObjectKey) {
    let mock = MockClusterClient::new();
    mock.add_dashboard_config(create_test_dashboard_config(name, "monitoring", payload));
    let reconciler = Reconciler::new(mock.clone());
    (reconciler, mock, ObjectKey::new("monitoring", name))
}

/// Key of the ConfigMap derived from the DashboardConfig at `key`
pub fn config_map_key(key: &ObjectKey) -> ObjectKey {
    ObjectKey::new(key.namespace.clone(), format!("{}-dashboard", key.name))
}
