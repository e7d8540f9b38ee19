//! # Custom Resource Definitions
//!
//! CRD types for the Repository Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `Repository` desired state and per-type configuration
//! - `status.rs` - Observed state written by the controller
//! - `job.rs` - `Job` resources handed to the job dispatcher

mod job;
mod spec;
mod status;

pub use job::{
    ExportJobOptions, Job, JobAction, JobSpec, JobStatus, PullRequestJobOptions, SyncJobOptions,
};
pub use spec::{
    GitHubRepositoryConfig, LocalRepositoryConfig, Repository, RepositorySpec, RepositoryType,
    S3RepositoryConfig, SyncOptions, SyncTarget,
};
pub use status::{HealthStatus, JobState, RepositoryStatus, SyncStatus, WebhookStatus};
