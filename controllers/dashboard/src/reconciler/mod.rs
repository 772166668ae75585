//! Reconciliation logic for DashboardConfig CRDs.
//!
//! Each pass reads the DashboardConfig, derives the ConfigMap it should
//! produce, creates or overwrites the live ConfigMap to match, and marks the
//! DashboardConfig as applied. Passes are stateless and idempotent; all
//! coordination with concurrent writers goes through resource versions.

pub mod config_map;

use crate::error::ControllerError;
use cluster_client::{ClusterClientTrait, ClusterError, ObjectKey, is_controlled_by};
use config_map::{apply_desired, config_map_name, content_matches, desired_config_map};
use crds::DashboardConfigStatus;
use std::time::Duration;
use tracing::{debug, error, info};

/// What a successful reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The DashboardConfig no longer exists; nothing was written
    SourceAbsent,
    /// The ConfigMap did not exist and was created
    Created,
    /// The ConfigMap had drifted and was overwritten
    Updated,
    /// The ConfigMap already matched; only status was written
    Unchanged,
}

impl ReconcileOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceAbsent => "source_absent",
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Reconciles DashboardConfig resources into Grafana dashboard ConfigMaps.
pub struct Reconciler<C> {
    client: C,
}

impl<C: ClusterClientTrait> Reconciler<C> {
    /// Creates a new reconciler instance.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Reconciles the DashboardConfig identified by `key`.
    ///
    /// This method:
    /// 1. Fetches the DashboardConfig (absent means deleted: success, no writes)
    /// 2. Builds the desired ConfigMap and makes the DashboardConfig its controller
    /// 3. Creates the ConfigMap, or overwrites it if content, label or owner drifted
    /// 4. Sets `status.applied = true` on the DashboardConfig
    ///
    /// Any failure returns immediately; retrying is left to the caller.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome, ControllerError> {
        let mut dashboard = match self.client.get_dashboard_config(key).await {
            Ok(dc) => dc,
            Err(ClusterError::NotFound(_)) => {
                debug!("DashboardConfig {} not found, assuming deleted", key);
                return Ok(ReconcileOutcome::SourceAbsent);
            }
            Err(e) => {
                error!("Failed to fetch DashboardConfig {}: {}", key, e);
                return Err(e.into());
            }
        };

        info!("Reconciling DashboardConfig {}", key);

        let mut desired = desired_config_map(&dashboard)?;
        if let Err(e) = self
            .client
            .set_controller_reference(&dashboard, &mut desired.metadata)
        {
            error!("Failed to set controller reference for DashboardConfig {}: {}", key, e);
            return Err(e.into());
        }

        let cm_key = ObjectKey::new(key.namespace.clone(), config_map_name(&key.name));
        let outcome = match self.client.get_config_map(&cm_key).await {
            Err(ClusterError::NotFound(_)) => {
                if let Err(e) = self.client.create_config_map(&desired).await {
                    error!("Failed to create ConfigMap {}: {}", cm_key, e);
                    return Err(e.into());
                }
                info!("ConfigMap {} created", cm_key);
                ReconcileOutcome::Created
            }
            Err(e) => {
                error!("Failed to fetch ConfigMap {}: {}", cm_key, e);
                return Err(e.into());
            }
            Ok(mut existing) => {
                if content_matches(&existing, &desired) && is_controlled_by(&dashboard, &existing.metadata) {
                    debug!("ConfigMap {} already up to date", cm_key);
                    ReconcileOutcome::Unchanged
                } else {
                    apply_desired(&mut existing, &desired);
                    if let Err(e) = self
                        .client
                        .set_controller_reference(&dashboard, &mut existing.metadata)
                    {
                        error!("Failed to set controller reference on ConfigMap {}: {}", cm_key, e);
                        return Err(e.into());
                    }
                    if let Err(e) = self.client.replace_config_map(&existing).await {
                        error!("Failed to update ConfigMap {}: {}", cm_key, e);
                        return Err(e.into());
                    }
                    info!("ConfigMap {} updated", cm_key);
                    ReconcileOutcome::Updated
                }
            }
        };

        // Status records the last successful pass, so it is written even
        // when the ConfigMap was already correct.
        dashboard.status = Some(DashboardConfigStatus { applied: true });
        if let Err(e) = self.client.update_dashboard_config_status(&dashboard).await {
            error!("Failed to update DashboardConfig {} status: {}", key, e);
            return Err(e.into());
        }

        Ok(outcome)
    }

    /// [`reconcile`](Self::reconcile) bounded by `timeout`.
    ///
    /// On expiry the in-flight call is dropped, which aborts its request, and
    /// the pass fails with [`ControllerError::Timeout`]. Writes already
    /// acknowledged stay; the next pass picks up from there.
    pub async fn reconcile_with_timeout(
        &self,
        key: &ObjectKey,
        timeout: Duration,
    ) -> Result<ReconcileOutcome, ControllerError> {
        match tokio::time::timeout(timeout, self.reconcile(key)).await {
            Ok(result) => result,
            Err(_) => {
                error!("Reconciliation of DashboardConfig {} timed out after {:?}", key, timeout);
                Err(ControllerError::Timeout {
                    key: key.to_string(),
                    timeout,
                })
            }
        }
    }
}
