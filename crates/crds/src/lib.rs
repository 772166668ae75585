//! Dashboard CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the dashboard controller, plus
//! the explicit table of kinds this workspace registers with the API server.

pub mod dashboard_config;
pub mod registry;

pub use dashboard_config::*;
pub use registry::{RegisteredKind, registered_kinds};
