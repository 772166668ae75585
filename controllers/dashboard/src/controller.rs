//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the kube client,
//! reconciler, watcher and probe server together and runs them until one of
//! them exits.

use crate::backoff::BackoffTracker;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::probes::{self, ProbeState};
use crate::reconciler::Reconciler;
use crate::watcher::{WatchContext, Watcher};
use cluster_client::ClusterClient;
use crds::{DashboardConfig, registered_kinds};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Api, Client};
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for DashboardConfig resources.
#[derive(Debug)]
pub struct Controller {
    watcher: JoinHandle<Result<(), ControllerError>>,
    probe_server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Dashboard Controller");
        for kind in registered_kinds() {
            info!("  Managing {} {} ({})", kind.api_version(), kind.kind, kind.plural);
        }

        let kube_client = Client::try_default().await?;

        let (dashboard_api, config_map_api): (Api<DashboardConfig>, Api<ConfigMap>) =
            match config.namespace.as_deref() {
                Some(ns) => (
                    Api::namespaced(kube_client.clone(), ns),
                    Api::namespaced(kube_client.clone(), ns),
                ),
                None => (Api::all(kube_client.clone()), Api::all(kube_client.clone())),
            };

        let metrics = Metrics::new()?;
        let probe_state = ProbeState::new(metrics.clone());

        let reconciler = Reconciler::new(ClusterClient::new(kube_client));
        let context = WatchContext::new(
            reconciler,
            BackoffTracker::new(config.backoff_min, config.backoff_max),
            metrics,
            config.reconcile_timeout,
            config.resync_interval,
        );
        let watcher_instance = Watcher::new(
            context,
            dashboard_api,
            config_map_api,
            config.debounce,
            config.concurrency,
            probe_state.clone(),
        );

        let watcher = tokio::spawn(watcher_instance.run());
        let probe_server = tokio::spawn(probes::serve(config.probe_addr, probe_state));

        Ok(Self {
            watcher,
            probe_server,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Dashboard Controller running");

        // The watcher returns on SIGTERM/SIGINT; the probe server only on failure
        tokio::select! {
            result = &mut self.watcher => {
                result.map_err(|e| ControllerError::Watch(format!("DashboardConfig watcher panicked: {}", e)))??;
            }
            result = &mut self.probe_server => {
                result.map_err(|e| ControllerError::Watch(format!("Probe server panicked: {}", e)))??;
                return Err(ControllerError::Watch("Probe server exited".to_string()));
            }
        }

        info!("Dashboard Controller stopped");
        Ok(())
    }
}
