//! Controller-specific error types.
//!
//! This module defines error types specific to the dashboard controller that
//! are not covered by the cluster client, and the classification used to
//! pick a requeue delay and label metrics.

use cluster_client::ClusterError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the Dashboard Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Object store operation failed
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// Kubernetes client could not be built
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Resource is missing fields reconciliation depends on
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reconciliation did not finish before its deadline
    #[error("Reconciliation of {key} timed out after {timeout:?}")]
    Timeout { key: String, timeout: Duration },

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Probe server failed
    #[error("Probe server error: {0}")]
    Probe(#[from] std::io::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

/// Coarse error classes, as reported to the invocation substrate and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    /// Stale write or create race; a fresh read fixes it
    Conflict,
    /// Owner reference could not be attached
    Reference,
    /// API server unreachable or rejected the request
    Transport,
    Timeout,
    /// Malformed resource or configuration
    Invalid,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Reference => "reference",
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::Invalid => "invalid",
            Self::Unknown => "unknown",
        }
    }
}

impl ControllerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Cluster(ClusterError::NotFound(_)) => ErrorKind::NotFound,
            Self::Cluster(e) if e.is_conflict() => ErrorKind::Conflict,
            Self::Cluster(ClusterError::Reference(_)) => ErrorKind::Reference,
            Self::Cluster(_) | Self::Kube(_) => ErrorKind::Transport,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::InvalidResource(_) | Self::InvalidConfig(_) => ErrorKind::Invalid,
            Self::Metrics(_) | Self::Probe(_) | Self::Watch(_) => ErrorKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let conflict = ControllerError::from(ClusterError::Conflict("cm".to_string()));
        assert_eq!(conflict.kind(), ErrorKind::Conflict);

        let race = ControllerError::from(ClusterError::AlreadyExists("cm".to_string()));
        assert_eq!(race.kind(), ErrorKind::Conflict);

        let missing = ControllerError::from(ClusterError::NotFound("cm".to_string()));
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let reference = ControllerError::from(ClusterError::Reference("no uid".to_string()));
        assert_eq!(reference.kind(), ErrorKind::Reference);

        let unavailable = ControllerError::from(ClusterError::Api {
            code: 503,
            reason: "ServiceUnavailable".to_string(),
            message: "down".to_string(),
        });
        assert_eq!(unavailable.kind(), ErrorKind::Transport);

        let timeout = ControllerError::Timeout {
            key: "monitoring/alpha".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert_eq!(timeout.kind().as_str(), "timeout");
    }
}
