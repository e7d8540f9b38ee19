//! # Error Classification
//!
//! Collaborators return `anyhow::Result`. The worker loop only needs to know
//! whether a failure is worth retrying, which is decided here by walking the
//! error chain.

use thiserror::Error;

/// Marker error for a collaborator that is temporarily unable to serve requests.
///
/// Wrap it into an `anyhow::Error` (optionally with added context) to have the
/// failed pass retried with backoff.
#[derive(Debug, Error)]
#[error("service unavailable: {0}")]
pub struct ServiceUnavailable(pub String);

impl ServiceUnavailable {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// True when any error in the chain is a [`ServiceUnavailable`] marker or a
/// Kubernetes API response with HTTP status 503
pub fn is_service_unavailable(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if cause.downcast_ref::<ServiceUnavailable>().is_some() {
            return true;
        }
        matches!(
            cause.downcast_ref::<kube::Error>(),
            Some(kube::Error::Api(api_err)) if api_err.code == 503
        )
    })
}

/// True when any error in the chain is a Kubernetes API 404
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<kube::Error>(),
            Some(kube::Error::Api(api_err)) if api_err.code == 404
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_is_service_unavailable() {
        let err = anyhow::Error::new(ServiceUnavailable::new("storage warming up"));
        assert!(is_service_unavailable(&err));
    }

    #[test]
    fn test_marker_found_through_context() {
        let err = anyhow::Error::new(ServiceUnavailable::new("down")).context("patching status");
        assert!(is_service_unavailable(&err));
    }

    #[test]
    fn test_plain_error_is_not_transient() {
        let err = anyhow::anyhow!("bad request");
        assert!(!is_service_unavailable(&err));
        assert!(!is_not_found(&err));
    }
}
