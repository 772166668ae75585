//! Controller configuration, read from environment variables.

use crate::error::ControllerError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Runtime configuration of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch (`WATCH_NAMESPACE`); all namespaces when unset
    pub namespace: Option<String>,
    /// Maximum concurrent reconciliations (`RECONCILE_CONCURRENCY`)
    pub concurrency: u16,
    /// Quiet period before acting on a burst of events (`RECONCILE_DEBOUNCE_SECS`)
    pub debounce: Duration,
    /// Deadline for a single reconciliation (`RECONCILE_TIMEOUT_SECS`)
    pub reconcile_timeout: Duration,
    /// Periodic resync of converged objects (`RESYNC_INTERVAL_SECS`)
    pub resync_interval: Duration,
    /// Smallest error requeue delay (`BACKOFF_MIN_SECS`)
    pub backoff_min: Duration,
    /// Largest error requeue delay (`BACKOFF_MAX_SECS`)
    pub backoff_max: Duration,
    /// Listen address of the probe/metrics server (`PROBE_ADDR`)
    pub probe_addr: SocketAddr,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            concurrency: 3,
            debounce: Duration::from_secs(1),
            reconcile_timeout: Duration::from_secs(30),
            resync_interval: Duration::from_secs(600),
            backoff_min: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
            probe_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

fn parse<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T, ControllerError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{} has invalid value {:?}: {}", name, value, e))
        }),
    }
}

fn parse_secs(name: &str, raw: Option<String>, default: Duration) -> Result<Duration, ControllerError> {
    parse(name, raw, default.as_secs()).map(Duration::from_secs)
}

impl ControllerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());

        let config = Self {
            namespace,
            concurrency: parse("RECONCILE_CONCURRENCY", lookup("RECONCILE_CONCURRENCY"), defaults.concurrency)?,
            debounce: parse_secs("RECONCILE_DEBOUNCE_SECS", lookup("RECONCILE_DEBOUNCE_SECS"), defaults.debounce)?,
            reconcile_timeout: parse_secs(
                "RECONCILE_TIMEOUT_SECS",
                lookup("RECONCILE_TIMEOUT_SECS"),
                defaults.reconcile_timeout,
            )?,
            resync_interval: parse_secs(
                "RESYNC_INTERVAL_SECS",
                lookup("RESYNC_INTERVAL_SECS"),
                defaults.resync_interval,
            )?,
            backoff_min: parse_secs("BACKOFF_MIN_SECS", lookup("BACKOFF_MIN_SECS"), defaults.backoff_min)?,
            backoff_max: parse_secs("BACKOFF_MAX_SECS", lookup("BACKOFF_MAX_SECS"), defaults.backoff_max)?,
            probe_addr: parse("PROBE_ADDR", lookup("PROBE_ADDR"), defaults.probe_addr)?,
        };

        if config.reconcile_timeout.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if config.backoff_max < config.backoff_min {
            return Err(ControllerError::InvalidConfig(format!(
                "BACKOFF_MAX_SECS ({}) is below BACKOFF_MIN_SECS ({})",
                config.backoff_max.as_secs(),
                config.backoff_min.as_secs()
            )));
        }
        Ok(config)
    }

    /// Log the effective configuration
    pub fn log(&self) {
        info!("Configuration:");
        info!("  Namespace: {}", self.namespace.as_deref().unwrap_or("all namespaces"));
        info!("  Concurrency: {}", self.concurrency);
        info!("  Debounce: {:?}", self.debounce);
        info!("  Reconcile timeout: {:?}", self.reconcile_timeout);
        info!("  Resync interval: {:?}", self.resync_interval);
        info!("  Backoff: {:?} to {:?}", self.backoff_min, self.backoff_max);
        info!("  Probe address: {}", self.probe_addr);
    }
}
