//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default field manager used for patches written by the controller
pub const DEFAULT_FIELD_MANAGER: &str = "repository-controller";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default number of workers pulling from the work queue
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Number of failed passes after which a work item is dropped
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Per-item exponential backoff starting value (milliseconds)
pub const DEFAULT_RATE_LIMIT_BASE_DELAY_MS: u64 = 5;

/// Per-item exponential backoff maximum value (seconds)
pub const DEFAULT_RATE_LIMIT_MAX_DELAY_SECS: u64 = 1000;

/// How long a health check result stays fresh (seconds)
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 4 * 60 * 60;

/// Minimum age of a health check before it is re-run within a reconcile burst (milliseconds)
pub const DEFAULT_HEALTH_CHECK_DEBOUNCE_MS: u64 = 350;

/// Slack applied when deciding whether a periodic resync is due (milliseconds)
pub const DEFAULT_RESYNC_TOLERANCE_MS: u64 = 1000;

/// Minimum sync interval accepted by repository validation (seconds)
pub const MIN_SYNC_INTERVAL_SECS: i64 = 10;

/// Annotation naming the repository that manages a resource
pub const ANNO_KEY_REPO_NAME: &str = "repoctl.dev/repoName";

/// Annotation holding the resource's path inside the repository
pub const ANNO_KEY_REPO_PATH: &str = "repoctl.dev/repoPath";

/// Annotation holding the content hash the resource was last written from
pub const ANNO_KEY_REPO_HASH: &str = "repoctl.dev/repoHash";

/// All annotations that tie a resource to its repository
pub const REPOSITORY_ANNOTATIONS: [&str; 3] =
    [ANNO_KEY_REPO_NAME, ANNO_KEY_REPO_PATH, ANNO_KEY_REPO_HASH];

/// Plural name of the folder resource; folders are containers for other resources
pub const FOLDER_RESOURCE: &str = "folders";
