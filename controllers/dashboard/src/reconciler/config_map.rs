//! Desired ConfigMap for a DashboardConfig
//!
//! The naming and labelling here is what the Grafana dashboard sidecar
//! discovers, so it must stay bit-exact.

use crate::error::ControllerError;
use crds::DashboardConfig;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Label the Grafana sidecar selects dashboard ConfigMaps by
pub const DASHBOARD_LABEL_KEY: &str = "grafana_dashboard";
pub const DASHBOARD_LABEL_VALUE: &str = "true";

/// The single data key holding the dashboard JSON
pub const DASHBOARD_DATA_KEY: &str = "dashboard.json";

const CONFIG_MAP_SUFFIX: &str = "-dashboard";

/// Name of the ConfigMap derived from the DashboardConfig called `source_name`.
pub fn config_map_name(source_name: &str) -> String {
    format!("{}{}", source_name, CONFIG_MAP_SUFFIX)
}

/// Builds the ConfigMap a DashboardConfig should produce.
///
/// Pure: the same spec always yields the same object. Owner references are
/// attached separately by the caller.
pub fn desired_config_map(dashboard: &DashboardConfig) -> Result<ConfigMap, ControllerError> {
    let name = dashboard
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| ControllerError::InvalidResource("DashboardConfig missing name".to_string()))?;
    let namespace = dashboard.metadata.namespace.as_deref().ok_or_else(|| {
        ControllerError::InvalidResource(format!("DashboardConfig {} missing namespace", name))
    })?;

    Ok(ConfigMap {
        metadata: ObjectMeta {
            name: Some(config_map_name(name)),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                DASHBOARD_LABEL_KEY.to_string(),
                DASHBOARD_LABEL_VALUE.to_string(),
            )])),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            DASHBOARD_DATA_KEY.to_string(),
            dashboard.spec.payload.clone(),
        )])),
        ..Default::default()
    })
}

fn has_dashboard_label(config_map: &ConfigMap) -> bool {
    config_map
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(DASHBOARD_LABEL_KEY))
        .is_some_and(|value| value == DASHBOARD_LABEL_VALUE)
}

/// True if `existing` already carries the desired data and label.
///
/// Binary data counts as drift since the desired object has none.
pub fn content_matches(existing: &ConfigMap, desired: &ConfigMap) -> bool {
    existing.data == desired.data
        && existing.binary_data.as_ref().is_none_or(BTreeMap::is_empty)
        && has_dashboard_label(existing)
}

/// Overwrites the content of `existing` with `desired`.
///
/// Data is replaced wholesale; labels are merged so ones added by other
/// tooling survive while the dashboard label is forced back on.
pub fn apply_desired(existing: &mut ConfigMap, desired: &ConfigMap) {
    existing.data.clone_from(&desired.data);
    existing.binary_data = None;
    existing
        .metadata
        .labels
        .get_or_insert_with(BTreeMap::new)
        .insert(DASHBOARD_LABEL_KEY.to_string(), DASHBOARD_LABEL_VALUE.to_string());
}
