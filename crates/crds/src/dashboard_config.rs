//! DashboardConfig CRD
//!
//! Declares a Grafana dashboard as a title plus an opaque JSON payload. The
//! controller publishes the payload in a labelled ConfigMap for the Grafana
//! sidecar to pick up.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "grafana.cyberwizzard.com",
    version = "v1alpha1",
    kind = "DashboardConfig",
    namespaced,
    status = "DashboardConfigStatus",
    shortname = "dbc",
    printcolumn = r#"{"name":"Title","type":"string","jsonPath":".spec.title"}"#,
    printcolumn = r#"{"name":"Applied","type":"boolean","jsonPath":".status.applied"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfigSpec {
    /// Display title of the dashboard
    pub title: String,

    /// Serialized dashboard JSON, published verbatim
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfigStatus {
    /// Whether the last reconciliation published the dashboard
    #[serde(default)]
    pub applied: bool,
}

/// List form of [`DashboardConfig`], as returned by list calls.
pub type DashboardConfigList = kube::core::ObjectList<DashboardConfig>;

impl DashboardConfig {
    /// Returns true once the controller has published this dashboard.
    pub fn is_applied(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.applied)
    }
}
