//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `repository_controller_reconciliations_total` - Total number of reconcile passes
//! - `repository_controller_reconciliation_errors_total` - Total number of failed passes
//! - `repository_controller_reconciliation_duration_seconds` - Duration of reconcile passes
//! - `repository_controller_transitions_total` - Passes by transition (create, update, resync, ...)
//! - `repository_controller_retries_total` - Work items re-queued with backoff
//! - `repository_controller_dropped_total` - Work items dropped after failing
//! - `repository_controller_jobs_dispatched_total` - Sync jobs submitted
//! - `repository_controller_finalizer_item_errors_total` - Managed resources a finalizer failed to process
//! - `repository_controller_queue_depth` - Keys ready in the work queue

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "repository_controller_reconciliations_total",
        "Total number of reconcile passes",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "repository_controller_reconciliation_errors_total",
        "Total number of failed reconcile passes",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "repository_controller_reconciliation_duration_seconds",
            "Duration of reconcile passes in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static TRANSITIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "repository_controller_transitions_total",
            "Reconcile passes by transition",
        ),
        &["transition"],
    )
    .expect("Failed to create TRANSITIONS_TOTAL metric - this should never happen")
});

static RETRIES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "repository_controller_retries_total",
        "Total number of work items re-queued with backoff",
    )
    .expect("Failed to create RETRIES_TOTAL metric - this should never happen")
});

static DROPPED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "repository_controller_dropped_total",
        "Total number of work items dropped after a failed pass",
    )
    .expect("Failed to create DROPPED_TOTAL metric - this should never happen")
});

static JOBS_DISPATCHED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "repository_controller_jobs_dispatched_total",
        "Total number of sync jobs submitted",
    )
    .expect("Failed to create JOBS_DISPATCHED_TOTAL metric - this should never happen")
});

static FINALIZER_ITEM_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "repository_controller_finalizer_item_errors_total",
        "Total number of managed resources a finalizer failed to process",
    )
    .expect("Failed to create FINALIZER_ITEM_ERRORS_TOTAL metric - this should never happen")
});

static QUEUE_DEPTH: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "repository_controller_queue_depth",
        "Number of keys ready in the work queue",
    )
    .expect("Failed to create QUEUE_DEPTH metric - this should never happen")
});

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(TRANSITIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RETRIES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DROPPED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(JOBS_DISPATCHED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FINALIZER_ITEM_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUEUE_DEPTH.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_transitions(transition: &str) {
    TRANSITIONS_TOTAL.with_label_values(&[transition]).inc();
}

pub fn increment_retries() {
    RETRIES_TOTAL.inc();
}

pub fn increment_dropped() {
    DROPPED_TOTAL.inc();
}

pub fn increment_jobs_dispatched() {
    JOBS_DISPATCHED_TOTAL.inc();
}

pub fn increment_finalizer_item_errors(count: u64) {
    FINALIZER_ITEM_ERRORS_TOTAL.inc_by(count);
}

pub fn set_queue_depth(depth: usize) {
    QUEUE_DEPTH.set(i64::try_from(depth).unwrap_or(i64::MAX));
}
