//! # Reconciler
//!
//! Drives a single repository toward its desired state.
//!
//! ## Module Structure
//!
//! - `types.rs` - Reconciler, errors, pass state and outcomes
//! - `reconcile.rs` - The reconcile pass
//! - `health.rs` - Health check sub-step
//! - `status.rs` - Status merge patch composition
//! - `finalize.rs` - Finalizer processing for deleted repositories

pub mod finalize;
pub mod health;
pub mod reconcile;
pub mod status;
pub mod types;

pub use finalize::{
    sort_for_deletion, FinalizeSummary, FinalizerProcessor, CLEAN_FINALIZER,
    RELEASE_ORPHAN_RESOURCES_FINALIZER, REMOVE_ORPHAN_RESOURCES_FINALIZER,
};
pub use reconcile::{object_key, split_meta_namespace_key};
pub use status::StatusPatch;
pub use types::{Outcome, PassState, ReconcileSettings, Reconciler, ReconcilerError, Transition};
