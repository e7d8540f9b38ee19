//! # Error Policy
//!
//! Decides what happens to a work item after a failed reconcile pass.
//!
//! A failed item is retried with the queue's per-key backoff only while it has
//! attempts left and the failure is transient (a collaborator reported service
//! unavailable). Everything else is dropped after logging.

use tracing::{error, info};

use crate::controller::queue::WorkItem;
use crate::controller::reconciler::ReconcilerError;
use crate::observability;

/// What to do with a failed item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-queue with backoff
    Requeue,
    /// Failure is not worth retrying
    Forget,
    /// Out of attempts
    GiveUp,
}

/// Classify a failure of an item that has now failed `attempts` times
#[must_use]
pub fn decide(error: &ReconcilerError, attempts: u32, max_attempts: u32) -> RetryDecision {
    if attempts >= max_attempts {
        RetryDecision::GiveUp
    } else if error.is_transient() {
        RetryDecision::Requeue
    } else {
        RetryDecision::Forget
    }
}

/// Record the failure on `item` and decide its fate
pub fn handle_reconciliation_error(
    item: &mut WorkItem,
    error: &ReconcilerError,
    max_attempts: u32,
) -> RetryDecision {
    item.attempts += 1;

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.reconcile_error",
        work_key = %item.key,
        attempts = item.attempts,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("RepositoryController failed to process key");
    observability::metrics::increment_reconciliation_errors();

    let decision = decide(error, item.attempts, max_attempts);
    match decision {
        RetryDecision::GiveUp => {
            error!("RepositoryController failed too many times");
            observability::metrics::increment_dropped();
        }
        RetryDecision::Forget => {
            info!("RepositoryController will not retry");
            observability::metrics::increment_dropped();
        }
        RetryDecision::Requeue => {
            info!("RepositoryController will retry as service is unavailable");
            observability::metrics::increment_retries();
        }
    }
    decision
}
