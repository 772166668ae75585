//! Kubernetes resource watcher.
//!
//! Drives reconciliation of DashboardConfig resources through
//! `kube_runtime::Controller`. The controller also watches the ConfigMaps
//! it owns, so a user edit or delete of a derived ConfigMap reconciles its
//! owner again.

use crate::backoff::BackoffTracker;
use crate::error::{ControllerError, ErrorKind};
use crate::metrics::Metrics;
use crate::probes::ProbeState;
use crate::reconciler::config_map::{DASHBOARD_LABEL_KEY, DASHBOARD_LABEL_VALUE};
use crate::reconciler::{ReconcileOutcome, Reconciler};
use cluster_client::{ClusterClientTrait, ObjectKey};
use crds::DashboardConfig;
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::Api;
use kube_runtime::{
    Controller,
    controller::{self, Action, Config as RuntimeConfig},
    watcher,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Everything a reconciliation pass needs besides the object itself.
pub struct WatchContext<C> {
    reconciler: Reconciler<C>,
    backoff: BackoffTracker,
    metrics: Metrics,
    reconcile_timeout: Duration,
    resync_interval: Duration,
}

impl<C: ClusterClientTrait> WatchContext<C> {
    pub fn new(
        reconciler: Reconciler<C>,
        backoff: BackoffTracker,
        metrics: Metrics,
        reconcile_timeout: Duration,
        resync_interval: Duration,
    ) -> Self {
        Self {
            reconciler,
            backoff,
            metrics,
            reconcile_timeout,
            resync_interval,
        }
    }
}

fn key_of(obj: &DashboardConfig) -> Result<ObjectKey, ControllerError> {
    ObjectKey::for_resource(obj).ok_or_else(|| {
        ControllerError::InvalidResource("DashboardConfig event without name or namespace".to_string())
    })
}

/// Reconcile callback handed to the runtime controller.
///
/// Converged objects are revisited after the resync interval; a deleted
/// object waits for the next change.
pub async fn reconcile<C: ClusterClientTrait>(
    obj: Arc<DashboardConfig>,
    ctx: Arc<WatchContext<C>>,
) -> Result<Action, ControllerError> {
    let key = key_of(&obj)?;
    debug!("Reconciling DashboardConfig {}", key);

    let started = Instant::now();
    match ctx.reconciler.reconcile_with_timeout(&key, ctx.reconcile_timeout).await {
        Ok(outcome) => {
            ctx.metrics.record_success(outcome, started.elapsed());
            ctx.backoff.reset(&key);
            match outcome {
                ReconcileOutcome::SourceAbsent => Ok(Action::await_change()),
                _ => Ok(Action::requeue(ctx.resync_interval)),
            }
        }
        Err(e) => {
            ctx.metrics.record_failure(e.kind(), started.elapsed());
            Err(e)
        }
    }
}

/// Maps a failed pass to its retry delay.
///
/// Conflicts retry after the minimum delay since the next pass re-reads
/// state; everything else backs off per object.
pub fn error_policy<C: ClusterClientTrait>(
    obj: Arc<DashboardConfig>,
    error: &ControllerError,
    ctx: Arc<WatchContext<C>>,
) -> Action {
    let Ok(key) = key_of(&obj) else {
        error!("Reconciliation error for unnamed DashboardConfig: {}", error);
        return Action::requeue(ctx.backoff.min());
    };

    let delay = match error.kind() {
        ErrorKind::Conflict => ctx.backoff.min(),
        _ => ctx.backoff.next_backoff(&key),
    };
    warn!(
        "Reconciliation of DashboardConfig {} failed ({}): {}, retrying in {:?}",
        key,
        error.kind().as_str(),
        error,
        delay
    );
    Action::requeue(delay)
}

/// Watches DashboardConfig resources and their ConfigMaps.
pub struct Watcher<C> {
    context: Arc<WatchContext<C>>,
    dashboard_api: Api<DashboardConfig>,
    config_map_api: Api<ConfigMap>,
    debounce: Duration,
    concurrency: u16,
    probes: ProbeState,
}

impl<C: ClusterClientTrait + 'static> Watcher<C> {
    /// Creates a new watcher instance.
    pub fn new(
        context: WatchContext<C>,
        dashboard_api: Api<DashboardConfig>,
        config_map_api: Api<ConfigMap>,
        debounce: Duration,
        concurrency: u16,
        probes: ProbeState,
    ) -> Self {
        Self {
            context: Arc::new(context),
            dashboard_api,
            config_map_api,
            debounce,
            concurrency,
            probes,
        }
    }

    /// Runs the watch until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Starting DashboardConfig watcher");

        // Debounce batches bursts of events on one object into a single pass
        let runtime_config = RuntimeConfig::default()
            .debounce(self.debounce)
            .concurrency(self.concurrency);
        let owned_selector = format!("{}={}", DASHBOARD_LABEL_KEY, DASHBOARD_LABEL_VALUE);

        let controller = Controller::new(self.dashboard_api, watcher::Config::default())
            .owns(
                self.config_map_api,
                watcher::Config::default().labels(&owned_selector),
            )
            .with_config(runtime_config)
            .shutdown_on_signal();

        self.probes.set_ready(true);
        controller
            .run(reconcile::<C>, error_policy::<C>, self.context)
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled DashboardConfig {}", obj),
                    Err(controller::Error::ObjectNotFound(obj)) => {
                        debug!("DashboardConfig {} left the cache before reconciling", obj)
                    }
                    Err(e) => error!("Controller error for DashboardConfig: {}", e),
                }
            })
            .await;
        self.probes.set_ready(false);

        info!("DashboardConfig watcher stopped");
        Ok(())
    }
}
