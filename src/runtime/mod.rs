//! # Runtime
//!
//! Controller runtime: initialization, the worker pool and the retry policy.

pub mod controller;
pub mod error_policy;
pub mod initialization;
pub mod worker;

pub use controller::{EnqueueHandler, RepositoryController, WorkerSettings};
pub use error_policy::{decide, handle_reconciliation_error, RetryDecision};
pub use initialization::{init_process, initialize, InitializationResult};
pub use worker::{process_next_work_item, run_worker};
