//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use repository_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (Repository, Job, statuses)
//! - Collaborator traits (RepositoryCache, RepositoryStore, JobDispatcher, ...)
//! - Reconciler and queue types
//! - Config types

// CRD types - most commonly used
pub use crate::crd::*;

// Collaborator traits - needed for wiring a reconciler
pub use crate::client::{
    JobDispatcher, RepositoryCache, RepositoryEventHandler, RepositoryStore, ResourceClient,
    ResourceListItem, ResourceLister,
};
pub use crate::repository::{
    RepoGetter, RepositoryAdapter, RepositoryHooks, RepositoryTester, TestResults,
};

// Reconciler types - core controller functionality
pub use crate::controller::queue::{WorkItem, WorkQueue};
pub use crate::controller::reconciler::{
    FinalizerProcessor, Outcome, ReconcileSettings, Reconciler, ReconcilerError, Transition,
};
pub use crate::runtime::{RepositoryController, WorkerSettings};

// Config types
pub use crate::config::ControllerConfig;
