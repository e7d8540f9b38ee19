//! # Types
//!
//! Core types for the reconciler.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::finalize::FinalizerProcessor;
use crate::client::{JobDispatcher, RepositoryCache, RepositoryStore};
use crate::config::ControllerConfig;
use crate::crd::Repository;
use crate::error::is_service_unavailable;
use crate::repository::{RepoGetter, RepositoryTester};

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("invalid work key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },
    #[error("repository {0} not found in cache")]
    NotFound(String),
    #[error("unable to create repository from configuration: {0:#}")]
    Adapter(#[source] anyhow::Error),
    #[error("error running {hook}: {source:#}")]
    Hook {
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("error running finalizers: {0:#}")]
    Finalizer(#[source] anyhow::Error),
    #[error("error removing finalizers: {0:#}")]
    RemoveFinalizers(#[source] anyhow::Error),
    #[error("error adding sync job: {0:#}")]
    Job(#[source] anyhow::Error),
    #[error("update status: {0:#}")]
    Status(#[source] anyhow::Error),
    #[error("reconcile pass panicked: {0}")]
    Panicked(String),
    /// The controller shut down while the pass was in flight
    #[error("reconcile pass cancelled")]
    Cancelled,
}

impl ReconcilerError {
    /// Whether the failed pass is worth retrying with backoff
    ///
    /// Only a collaborator reporting that it is temporarily unavailable is
    /// transient; everything else is dropped after logging.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ReconcilerError::Adapter(e)
            | ReconcilerError::Hook { source: e, .. }
            | ReconcilerError::Finalizer(e)
            | ReconcilerError::RemoveFinalizers(e)
            | ReconcilerError::Job(e)
            | ReconcilerError::Status(e) => is_service_unavailable(e),
            ReconcilerError::InvalidKey { .. }
            | ReconcilerError::NotFound(_)
            | ReconcilerError::Panicked(_)
            | ReconcilerError::Cancelled => false,
        }
    }
}

/// What a reconcile pass decided to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Deletion marker present; finalizers run
    Delete,
    /// Never reconciled before
    Create,
    /// Generation moved past the observed generation
    Update,
    /// Sync interval elapsed
    Resync,
    /// Nothing to schedule; health may still be refreshed
    Stable,
}

impl Transition {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Delete => "delete",
            Transition::Create => "create",
            Transition::Update => "update",
            Transition::Resync => "resync",
            Transition::Stable => "stable",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Gate closed; nothing read beyond the cache, nothing written
    Skipped,
    /// Finalizers ran (if any) for a repository being deleted
    Finalized,
    Reconciled {
        transition: Transition,
        /// Identifier of the sync job submitted during the pass
        job: Option<String>,
        status_written: bool,
    },
}

/// Timing knobs of the reconcile gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Health results older than this reopen the gate
    pub health_check_interval: Duration,
    /// Health results younger than this are not re-checked
    pub health_check_debounce: Duration,
    /// Slack subtracted from the sync interval
    pub resync_tolerance: Duration,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self::from(&ControllerConfig::default())
    }
}

impl From<&ControllerConfig> for ReconcileSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            health_check_interval: config.health_check_interval(),
            health_check_debounce: config.health_check_debounce(),
            resync_tolerance: config.resync_tolerance(),
        }
    }
}

/// Facts about a repository at the start of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassState {
    pub generation: i64,
    pub deleting: bool,
    /// `observedGeneration < 1`
    pub unseen: bool,
    /// `generation != observedGeneration`
    pub spec_changed: bool,
    pub resync_due: bool,
    /// Health result is older than the check interval
    pub health_stale: bool,
    /// Health result is older than the debounce window
    pub health_recheck: bool,
    /// Previous sync is pending or working
    pub sync_active: bool,
}

impl PassState {
    /// Derive the pass state of `obj` at unix millisecond `now_ms`
    #[must_use]
    pub fn observe(obj: &Repository, now_ms: i64, settings: &ReconcileSettings) -> Self {
        let status = obj.status.clone().unwrap_or_default();
        let generation = obj.metadata.generation.unwrap_or(0);

        let health_age = now_ms.saturating_sub(status.health.checked);
        let sync_age = now_ms.saturating_sub(status.sync.finished);
        let sync_interval = obj.spec.sync.interval_seconds.saturating_mul(1000);
        let sync_active = status.sync.is_active();

        Self {
            generation,
            deleting: obj.metadata.deletion_timestamp.is_some(),
            unseen: status.observed_generation < 1,
            spec_changed: generation != status.observed_generation,
            resync_due: sync_age >= sync_interval.saturating_sub(millis(settings.resync_tolerance))
                && !sync_active,
            health_stale: health_age >= millis(settings.health_check_interval),
            health_recheck: health_age > millis(settings.health_check_debounce),
            sync_active,
        }
    }

    /// Nothing changed, nothing is due: the pass must not write or dispatch
    #[must_use]
    pub fn should_skip(&self) -> bool {
        !self.spec_changed && !self.deleting && !self.health_stale && !self.resync_due
    }

    #[must_use]
    pub fn transition(&self) -> Transition {
        if self.deleting {
            Transition::Delete
        } else if self.unseen {
            Transition::Create
        } else if self.spec_changed {
            Transition::Update
        } else if self.resync_due {
            Transition::Resync
        } else {
            Transition::Stable
        }
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Reconciles one repository key per call
#[derive(Clone)]
pub struct Reconciler {
    pub cache: Arc<dyn RepositoryCache>,
    pub store: Arc<dyn RepositoryStore>,
    pub repo_getter: Arc<dyn RepoGetter>,
    pub tester: Arc<dyn RepositoryTester>,
    pub jobs: Arc<dyn JobDispatcher>,
    pub finalizer: FinalizerProcessor,
    pub settings: ReconcileSettings,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        cache: Arc<dyn RepositoryCache>,
        store: Arc<dyn RepositoryStore>,
        repo_getter: Arc<dyn RepoGetter>,
        tester: Arc<dyn RepositoryTester>,
        jobs: Arc<dyn JobDispatcher>,
        finalizer: FinalizerProcessor,
    ) -> Self {
        Self {
            cache,
            store,
            repo_getter,
            tester,
            jobs,
            finalizer,
            settings: ReconcileSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ReconcileSettings) -> Self {
        self.settings = settings;
        self
    }
}
