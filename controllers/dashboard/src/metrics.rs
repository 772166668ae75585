//! Prometheus metrics for reconciliation passes.

use crate::error::ErrorKind;
use crate::reconciler::ReconcileOutcome;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

const NAMESPACE: &str = "dashboard_controller";

/// Reconciliation counters and latency histogram, exported on `/metrics`.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reconciliations: IntCounterVec,
    errors: IntCounterVec,
    duration: Histogram,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some(NAMESPACE.to_string()), None)?;

        let reconciliations = IntCounterVec::new(
            Opts::new(
                "reconciliations_total",
                "Successful reconciliations grouped by outcome",
            ),
            &["outcome"],
        )?;
        let errors = IntCounterVec::new(
            Opts::new(
                "reconcile_errors_total",
                "Failed reconciliations grouped by error kind",
            ),
            &["kind"],
        )?;
        let duration = Histogram::with_opts(
            HistogramOpts::new(
                "reconcile_duration_seconds",
                "Wall-clock time of a reconciliation pass",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;

        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            reconciliations,
            errors,
            duration,
        })
    }

    pub fn record_success(&self, outcome: ReconcileOutcome, elapsed: Duration) {
        self.reconciliations
            .with_label_values(&[outcome.as_str()])
            .inc();
        self.duration.observe(elapsed.as_secs_f64());
    }

    pub fn record_failure(&self, kind: ErrorKind, elapsed: Duration) {
        self.errors.with_label_values(&[kind.as_str()]).inc();
        self.duration.observe(elapsed.as_secs_f64());
    }

    /// Encodes all metrics using the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
