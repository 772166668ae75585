//! ClusterClient trait for mocking
//!
//! This trait abstracts the object store so the reconciler can be driven by
//! the kube-backed [`ClusterClient`](crate::ClusterClient) in production and
//! by an in-memory mock in unit tests.

use crate::error::ClusterError;
use crate::key::ObjectKey;
use crds::DashboardConfig;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Object-store operations used by reconciliation.
///
/// Writes carry the `resourceVersion` of the object they were derived from;
/// a stale version fails with [`ClusterError::Conflict`] instead of
/// overwriting a concurrent change. All futures are `Send` so reconciliations
/// can run on Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    /// Reads a DashboardConfig; a missing object is [`ClusterError::NotFound`].
    async fn get_dashboard_config(&self, key: &ObjectKey) -> Result<DashboardConfig, ClusterError>;

    /// Persists `dashboard.status` through the status subresource.
    async fn update_dashboard_config_status(
        &self,
        dashboard: &DashboardConfig,
    ) -> Result<DashboardConfig, ClusterError>;

    /// Reads a ConfigMap; a missing object is [`ClusterError::NotFound`].
    async fn get_config_map(&self, key: &ObjectKey) -> Result<ConfigMap, ClusterError>;
    /// Creates a ConfigMap; an existing one is [`ClusterError::AlreadyExists`].
    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap, ClusterError>;
    /// Overwrites a ConfigMap at the resourceVersion it carries.
    async fn replace_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap, ClusterError>;

    /// Makes `owner` the controlling owner of `child`.
    fn set_controller_reference(
        &self,
        owner: &DashboardConfig,
        child: &mut ObjectMeta,
    ) -> Result<(), ClusterError> {
        crate::owner::set_controller_reference(owner, child)
    }
}
