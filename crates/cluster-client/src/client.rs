//! Kubernetes-backed object store client

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::key::ObjectKey;
use crds::DashboardConfig;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

/// Object store client talking to the Kubernetes API server.
#[derive(Clone)]
pub struct ClusterClient {
    client: Client,
}

impl std::fmt::Debug for ClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterClient").finish_non_exhaustive()
    }
}

impl ClusterClient {
    /// Wraps an already configured kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn dashboard_configs(&self, namespace: &str) -> Api<DashboardConfig> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn key_of<K: kube::ResourceExt>(kind: &str, resource: &K) -> Result<ObjectKey, ClusterError> {
    ObjectKey::for_resource(resource).ok_or_else(|| ClusterError::Api {
        code: 422,
        reason: "Invalid".to_string(),
        message: format!("{} is missing a name or namespace", kind),
    })
}

#[async_trait::async_trait]
impl ClusterClientTrait for ClusterClient {
    async fn get_dashboard_config(&self, key: &ObjectKey) -> Result<DashboardConfig, ClusterError> {
        self.dashboard_configs(&key.namespace)
            .get(&key.name)
            .await
            .map_err(|e| ClusterError::from_kube(e, format!("DashboardConfig {}", key)))
    }

    async fn update_dashboard_config_status(
        &self,
        dashboard: &DashboardConfig,
    ) -> Result<DashboardConfig, ClusterError> {
        let key = key_of("DashboardConfig", dashboard)?;
        // Carrying resourceVersion makes the API server reject the patch if the
        // object changed since it was read.
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": dashboard.metadata.resource_version },
            "status": dashboard.status,
        });
        debug!("Patching DashboardConfig {} status", key);
        self.dashboard_configs(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| ClusterError::from_kube(e, format!("DashboardConfig {}", key)))
    }

    async fn get_config_map(&self, key: &ObjectKey) -> Result<ConfigMap, ClusterError> {
        self.config_maps(&key.namespace)
            .get(&key.name)
            .await
            .map_err(|e| ClusterError::from_kube(e, format!("ConfigMap {}", key)))
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap, ClusterError> {
        let key = key_of("ConfigMap", config_map)?;
        self.config_maps(&key.namespace)
            .create(&PostParams::default(), config_map)
            .await
            .map_err(|e| ClusterError::from_kube(e, format!("ConfigMap {}", key)))
    }

    async fn replace_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap, ClusterError> {
        let key = key_of("ConfigMap", config_map)?;
        self.config_maps(&key.namespace)
            .replace(&key.name, &PostParams::default(), config_map)
            .await
            .map_err(|e| ClusterError::from_kube(e, format!("ConfigMap {}", key)))
    }
}
