//! Dashboard Controller
//!
//! Publishes each DashboardConfig resource as a ConfigMap labelled for the
//! Grafana dashboard sidecar:
//! - `<name>-dashboard` in the same namespace
//! - label `grafana_dashboard: "true"`
//! - payload under the `dashboard.json` key
//!
//! The ConfigMap is owned by its DashboardConfig and garbage collected with it.

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod probes;
mod reconciler;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Dashboard Controller");

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    // Load configuration from environment variables
    let config = ControllerConfig::from_env()?;
    config.log();

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
