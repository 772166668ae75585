//! Kind registry
//!
//! The explicit table of custom resource kinds this workspace declares. The
//! `crdgen` binary renders it to manifests and the controller logs it at
//! startup, so adding a kind means adding a row here.

use crate::DashboardConfig;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{CustomResourceExt, Resource};

/// A custom resource kind registered with the API server.
#[derive(Debug, Clone)]
pub struct RegisteredKind {
    /// API group, e.g. `grafana.cyberwizzard.com`
    pub group: String,
    /// API version, e.g. `v1alpha1`
    pub version: String,
    /// Kind name, e.g. `DashboardConfig`
    pub kind: String,
    /// Plural resource name used in API paths
    pub plural: String,
    /// Generates the CRD manifest for this kind
    pub crd: fn() -> CustomResourceDefinition,
}

impl RegisteredKind {
    fn of<K>() -> Self
    where
        K: Resource<DynamicType = ()> + CustomResourceExt,
    {
        Self {
            group: K::group(&()).into_owned(),
            version: K::version(&()).into_owned(),
            kind: K::kind(&()).into_owned(),
            plural: K::plural(&()).into_owned(),
            crd: K::crd,
        }
    }

    /// `group/version` string as it appears in `apiVersion`.
    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }
}

/// All kinds declared by this workspace.
pub fn registered_kinds() -> Vec<RegisteredKind> {
    vec![RegisteredKind::of::<DashboardConfig>()]
}
