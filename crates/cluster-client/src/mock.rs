//! Mock ClusterClient for unit testing
//!
//! This module provides an in-memory implementation of [`ClusterClientTrait`]
//! that behaves like the API server where reconciliation can observe it:
//! resource versions are bumped on every write and checked on replace, create
//! fails if the object exists, the status subresource only touches status, and
//! deleting a `DashboardConfig` garbage-collects the objects it controls.
//!
//! Failures and latency can be injected per operation, and every call is
//! recorded so tests can assert which writes happened.

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::key::ObjectKey;
use crds::DashboardConfig;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Store operation, used for call recording and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`ClusterClientTrait::get_dashboard_config`]
    GetDashboardConfig,
    /// [`ClusterClientTrait::update_dashboard_config_status`]
    UpdateDashboardConfigStatus,
    /// [`ClusterClientTrait::get_config_map`]
    GetConfigMap,
    /// [`ClusterClientTrait::create_config_map`]
    CreateConfigMap,
    /// [`ClusterClientTrait::replace_config_map`]
    ReplaceConfigMap,
    /// [`ClusterClientTrait::set_controller_reference`]
    SetControllerReference,
}

impl Operation {
    /// True for operations that mutate the store.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Self::UpdateDashboardConfigStatus | Self::CreateConfigMap | Self::ReplaceConfigMap
        )
    }
}

/// Failure to inject into the next call of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Reports the object as missing, like a read from a stale cache
    NotFound,
    /// Create lost a race with another writer
    AlreadyExists,
    /// Stale resourceVersion
    Conflict,
    /// Owner reference could not be attached
    Reference,
    /// API server unavailable (503)
    Unavailable,
}

impl Failure {
    fn into_error(self, what: &str) -> ClusterError {
        match self {
            Self::NotFound => ClusterError::NotFound(what.to_string()),
            Self::AlreadyExists => ClusterError::AlreadyExists(what.to_string()),
            Self::Conflict => ClusterError::Conflict(what.to_string()),
            Self::Reference => ClusterError::Reference(what.to_string()),
            Self::Unavailable => ClusterError::Api {
                code: 503,
                reason: "ServiceUnavailable".to_string(),
                message: format!("{} unavailable", what),
            },
        }
    }
}

/// Mock ClusterClient for testing
///
/// Clones share the same store, so one clone can be handed to the reconciler
/// while the test keeps another to arrange and inspect state.
#[derive(Clone, Default)]
pub struct MockClusterClient {
    pub(crate) dashboard_configs: Arc<Mutex<BTreeMap<ObjectKey, DashboardConfig>>>,
    pub(crate) config_maps: Arc<Mutex<BTreeMap<ObjectKey, ConfigMap>>>,
    failures: Arc<Mutex<HashMap<Operation, VecDeque<Failure>>>>,
    calls: Arc<Mutex<Vec<Operation>>>,
    latency: Arc<Mutex<Option<Duration>>>,
    // Shared counter for resourceVersion and uid generation
    next_id: Arc<Mutex<u64>>,
}

impl std::fmt::Debug for MockClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClusterClient")
            .field("dashboard_configs", &self.dashboard_configs.lock().map(|s| s.len()).unwrap_or(0))
            .field("config_maps", &self.config_maps.lock().map(|s| s.len()).unwrap_or(0))
            .finish_non_exhaustive()
    }
}

impl MockClusterClient {
    /// Create a new, empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        *id
    }

    fn stamp_new(&self, meta: &mut ObjectMeta) {
        if meta.uid.is_none() {
            meta.uid = Some(format!("uid-{}", self.next_id()));
        }
        meta.resource_version = Some(self.next_id().to_string());
    }

    fn bump_version(&self, meta: &mut ObjectMeta) {
        meta.resource_version = Some(self.next_id().to_string());
    }

    fn record(&self, op: Operation) {
        self.calls.lock().unwrap().push(op);
    }

    fn take_failure(&self, op: Operation) -> Option<Failure> {
        self.failures
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
    }

    /// Records the call, waits out any configured latency, then returns an
    /// injected failure if one is queued.
    async fn enter(&self, op: Operation, what: &str) -> Result<(), ClusterError> {
        self.record(op);
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match self.take_failure(op) {
            Some(failure) => Err(failure.into_error(what)),
            None => Ok(()),
        }
    }

    // ---- Test setup ----

    /// Queue a failure for the next call of `op`. Failures queue up in order.
    pub fn fail_next(&self, op: Operation, failure: Failure) {
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(failure);
    }

    /// Delay every operation by `latency`
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Add a DashboardConfig as a user would (`kubectl apply`), assigning uid
    /// and resourceVersion. Returns the stored object.
    pub fn add_dashboard_config(&self, mut dashboard: DashboardConfig) -> DashboardConfig {
        let key = ObjectKey::for_resource(&dashboard)
            .expect("mock DashboardConfig needs a name and namespace");
        self.stamp_new(&mut dashboard.metadata);
        self.dashboard_configs
            .lock()
            .unwrap()
            .insert(key, dashboard.clone());
        dashboard
    }

    /// Replace the spec of a stored DashboardConfig, as a user edit would.
    pub fn edit_dashboard_config(
        &self,
        key: &ObjectKey,
        edit: impl FnOnce(&mut crds::DashboardConfigSpec),
    ) -> Option<DashboardConfig> {
        let mut store = self.dashboard_configs.lock().unwrap();
        let stored = store.get_mut(key)?;
        edit(&mut stored.spec);
        stored.metadata.resource_version = Some(self.next_id().to_string());
        Some(stored.clone())
    }

    /// Delete a DashboardConfig and run the garbage collector over ConfigMaps:
    /// the owner reference is dropped and objects left without any owner that
    /// were owned by it are deleted.
    pub fn delete_dashboard_config(&self, key: &ObjectKey) -> Option<DashboardConfig> {
        let removed = self.dashboard_configs.lock().unwrap().remove(key)?;
        if let Some(uid) = removed.metadata.uid.as_deref() {
            let mut config_maps = self.config_maps.lock().unwrap();
            config_maps.retain(|_, cm| {
                let Some(refs) = cm.metadata.owner_references.as_mut() else {
                    return true;
                };
                let before = refs.len();
                refs.retain(|r| r.uid != uid);
                before == refs.len() || !refs.is_empty()
            });
        }
        Some(removed)
    }

    /// Store a ConfigMap directly, bypassing reconciliation (a user write).
    pub fn put_config_map(&self, mut config_map: ConfigMap) -> ConfigMap {
        let key = ObjectKey::for_resource(&config_map)
            .expect("mock ConfigMap needs a name and namespace");
        self.stamp_new(&mut config_map.metadata);
        self.config_maps
            .lock()
            .unwrap()
            .insert(key, config_map.clone());
        config_map
    }

    /// Delete a ConfigMap directly, bypassing reconciliation (a user delete).
    pub fn delete_config_map(&self, key: &ObjectKey) -> Option<ConfigMap> {
        self.config_maps.lock().unwrap().remove(key)
    }

    // ---- Inspection ----

    /// Stored DashboardConfig at `key`, if any
    pub fn dashboard_config(&self, key: &ObjectKey) -> Option<DashboardConfig> {
        self.dashboard_configs.lock().unwrap().get(key).cloned()
    }

    /// Stored ConfigMap at `key`, if any
    pub fn config_map(&self, key: &ObjectKey) -> Option<ConfigMap> {
        self.config_maps.lock().unwrap().get(key).cloned()
    }

    /// Number of stored ConfigMaps across namespaces
    pub fn config_map_count(&self) -> usize {
        self.config_maps.lock().unwrap().len()
    }

    /// Every operation called so far, in order
    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of mutating calls so far, including failed ones
    pub fn write_count(&self) -> usize {
        self.calls().into_iter().filter(|op| op.is_write()).count()
    }

    /// Forget recorded calls, keeping the store and queued failures
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

fn check_version(stored: &ObjectMeta, submitted: &ObjectMeta, what: &str) -> Result<(), ClusterError> {
    match submitted.resource_version.as_deref() {
        Some(rv) if Some(rv) != stored.resource_version.as_deref() => Err(ClusterError::Conflict(
            format!("{}: the object has been modified", what),
        )),
        _ => Ok(()),
    }
}

fn require_key<K: kube::ResourceExt>(resource: &K, what: &str) -> Result<ObjectKey, ClusterError> {
    ObjectKey::for_resource(resource).ok_or_else(|| ClusterError::Api {
        code: 422,
        reason: "Invalid".to_string(),
        message: format!("{} is missing a name or namespace", what),
    })
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn get_dashboard_config(&self, key: &ObjectKey) -> Result<DashboardConfig, ClusterError> {
        let what = format!("DashboardConfig {}", key);
        self.enter(Operation::GetDashboardConfig, &what).await?;
        self.dashboard_config(key).ok_or(ClusterError::NotFound(what))
    }

    async fn update_dashboard_config_status(
        &self,
        dashboard: &DashboardConfig,
    ) -> Result<DashboardConfig, ClusterError> {
        let key = require_key(dashboard, "DashboardConfig")?;
        let what = format!("DashboardConfig {}", key);
        self.enter(Operation::UpdateDashboardConfigStatus, &what).await?;

        let mut store = self.dashboard_configs.lock().unwrap();
        let stored = store.get_mut(&key).ok_or_else(|| ClusterError::NotFound(what.clone()))?;
        check_version(&stored.metadata, &dashboard.metadata, &what)?;
        stored.status = dashboard.status.clone();
        self.bump_version(&mut stored.metadata);
        Ok(stored.clone())
    }

    async fn get_config_map(&self, key: &ObjectKey) -> Result<ConfigMap, ClusterError> {
        let what = format!("ConfigMap {}", key);
        self.enter(Operation::GetConfigMap, &what).await?;
        self.config_map(key).ok_or(ClusterError::NotFound(what))
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap, ClusterError> {
        let key = require_key(config_map, "ConfigMap")?;
        let what = format!("ConfigMap {}", key);
        self.enter(Operation::CreateConfigMap, &what).await?;

        let mut store = self.config_maps.lock().unwrap();
        if store.contains_key(&key) {
            return Err(ClusterError::AlreadyExists(what));
        }
        let mut created = config_map.clone();
        created.metadata.uid = None;
        self.stamp_new(&mut created.metadata);
        store.insert(key, created.clone());
        Ok(created)
    }

    async fn replace_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap, ClusterError> {
        let key = require_key(config_map, "ConfigMap")?;
        let what = format!("ConfigMap {}", key);
        self.enter(Operation::ReplaceConfigMap, &what).await?;

        let mut store = self.config_maps.lock().unwrap();
        let stored = store.get_mut(&key).ok_or_else(|| ClusterError::NotFound(what.clone()))?;
        check_version(&stored.metadata, &config_map.metadata, &what)?;
        let uid = stored.metadata.uid.clone();
        *stored = config_map.clone();
        stored.metadata.uid = uid;
        self.bump_version(&mut stored.metadata);
        Ok(stored.clone())
    }

    fn set_controller_reference(
        &self,
        owner: &DashboardConfig,
        child: &mut ObjectMeta,
    ) -> Result<(), ClusterError> {
        self.record(Operation::SetControllerReference);
        if let Some(failure) = self.take_failure(Operation::SetControllerReference) {
            return Err(failure.into_error("owner reference"));
        }
        crate::owner::set_controller_reference(owner, child)
    }
}
