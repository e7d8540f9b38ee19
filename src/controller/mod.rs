//! # Controller
//!
//! Reconciliation building blocks.
//!
//! - `backoff`: Per-key exponential backoff
//! - `queue`: Deduplicating, rate-limited work queue
//! - `reconciler`: Per-repository reconcile pass and finalizers

pub mod backoff;
pub mod queue;
pub mod reconciler;
