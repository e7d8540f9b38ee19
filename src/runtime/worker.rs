//! # Worker
//!
//! A worker pulls one key at a time off the queue and reconciles it. Panics in
//! a pass are caught here so that the worker survives them.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::error_policy::{handle_reconciliation_error, RetryDecision};
use crate::controller::queue::WorkQueue;
use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::observability;

/// Process one item; `false` once the queue has shut down
///
/// A pass still running when `cancel` fires is abandoned. The item is marked
/// done without counting as a failure.
pub async fn process_next_work_item(
    queue: &WorkQueue,
    reconciler: &Reconciler,
    max_attempts: u32,
    cancel: &CancellationToken,
) -> bool {
    let Some(mut item) = queue.get().await else {
        return false;
    };
    observability::metrics::set_queue_depth(queue.len());
    observability::metrics::increment_reconciliations();

    // Retries are bounded per key, whatever payload the queue handed out
    item.attempts = queue.num_requeues(&item.key);
    info!(work_key = %item.key, attempts = item.attempts, "RepositoryController processing key");

    let pass = AssertUnwindSafe(reconciler.reconcile(&item.key)).catch_unwind();
    let result = tokio::select! {
        result = pass => result.unwrap_or_else(|panic| {
            let message = panic_message(panic.as_ref());
            error!(work_key = %item.key, panic = %message, "reconcile pass panicked");
            Err(ReconcilerError::Panicked(message))
        }),
        () = cancel.cancelled() => Err(ReconcilerError::Cancelled),
    };

    let retry = match result {
        Ok(outcome) => {
            debug!(work_key = %item.key, outcome = ?outcome, "reconcile pass finished");
            queue.forget(&item);
            None
        }
        Err(ReconcilerError::Cancelled) => {
            info!(work_key = %item.key, "reconcile pass cancelled");
            None
        }
        Err(err) => match handle_reconciliation_error(&mut item, &err, max_attempts) {
            RetryDecision::Requeue => Some(item.clone()),
            RetryDecision::Forget | RetryDecision::GiveUp => {
                queue.forget(&item);
                queue.cancel_delayed(&item.key);
                None
            }
        },
    };

    queue.done(&item);
    if let Some(retry) = retry {
        queue.add_rate_limited(retry);
    }
    true
}

/// Run until the queue shuts down
pub async fn run_worker(
    id: usize,
    queue: &WorkQueue,
    reconciler: &Reconciler,
    max_attempts: u32,
    cancel: &CancellationToken,
) {
    debug!(worker = id, "worker started");
    while process_next_work_item(queue, reconciler, max_attempts, cancel).await {}
    debug!(worker = id, "worker stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
