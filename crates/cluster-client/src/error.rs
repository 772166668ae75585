//! Cluster client errors

use thiserror::Error;

/// Errors returned by object-store operations
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Create raced with another writer that created the object first
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Object changed since it was read (stale resourceVersion)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Owner reference could not be resolved or attached
    #[error("Owner reference error: {0}")]
    Reference(String),

    /// API server rejected the request for another reason
    #[error("API error {code} ({reason}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Machine-readable reason, e.g. `Invalid`
        reason: String,
        /// Human-readable message from the API server
        message: String,
    },

    /// Transport, TLS, or decoding failure talking to the API server
    #[error("Kubernetes error: {0}")]
    Kube(#[source] kube::Error),
}

impl ClusterError {
    /// Classifies a kube error for the object described by `what`.
    pub fn from_kube(err: kube::Error, what: impl std::fmt::Display) -> Self {
        match err {
            kube::Error::Api(resp) if resp.code == 404 => Self::NotFound(what.to_string()),
            kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists" => {
                Self::AlreadyExists(what.to_string())
            }
            kube::Error::Api(resp) if resp.code == 409 => {
                Self::Conflict(format!("{}: {}", what, resp.message))
            }
            kube::Error::Api(resp) => Self::Api {
                code: resp.code,
                reason: resp.reason.clone(),
                message: resp.message.clone(),
            },
            other => Self::Kube(other),
        }
    }

    /// True if the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True for optimistic-concurrency failures, including create races.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::AlreadyExists(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(
            ErrorResponse {
                status: "Failure".to_string(),
                message: "the object has been modified".to_string(),
                reason: reason.to_string(),
                code,
            }
            .into(),
        )
    }

    #[test]
    fn test_missing_object_is_not_found() {
        let err = ClusterError::from_kube(api_error(404, "NotFound"), "DashboardConfig monitoring/alpha");
        assert!(matches!(&err, ClusterError::NotFound(what) if what == "DashboardConfig monitoring/alpha"));
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_create_race_is_already_exists() {
        let err = ClusterError::from_kube(api_error(409, "AlreadyExists"), "ConfigMap monitoring/alpha-dashboard");
        assert!(matches!(err, ClusterError::AlreadyExists(_)));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_stale_write_is_conflict() {
        let err = ClusterError::from_kube(api_error(409, "Conflict"), "ConfigMap monitoring/alpha-dashboard");
        assert!(
            matches!(&err, ClusterError::Conflict(msg) if msg.ends_with("the object has been modified"))
        );
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_other_status_is_kept_as_api_error() {
        let err = ClusterError::from_kube(api_error(503, "ServiceUnavailable"), "ConfigMap monitoring/alpha-dashboard");
        assert!(matches!(
            &err,
            ClusterError::Api { code: 503, reason, .. } if reason == "ServiceUnavailable"
        ));
        assert!(!err.is_conflict());
        assert!(!err.is_not_found());
    }
}
