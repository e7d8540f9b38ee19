//! # Repository Adapters
//!
//! A repository adapter turns a `Repository` configuration into something that
//! can be tested and, optionally, hooked into its lifecycle.
//!
//! ## Module Structure
//!
//! - `validation.rs` - Configuration checks shared by every adapter
//! - `tester.rs` - Health tester that validates before calling the adapter
//! - `local.rs` - Local filesystem adapter and the fallback for unsupported types
//! - `getter.rs` - Resolves a configuration to its adapter

mod getter;
mod local;
mod tester;
mod validation;

use std::sync::Arc;

use async_trait::async_trait;

use crate::crd::{Repository, WebhookStatus};

pub use getter::DefaultRepoGetter;
pub use local::{LocalRepository, UnsupportedRepository};
pub use tester::ValidatingTester;
pub use validation::{validate_repository, FieldError, RESERVED_NAMES};

/// Outcome of a repository health test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResults {
    /// HTTP-style status code describing the result
    pub code: u16,
    pub success: bool,
    /// Human readable reasons for a failure
    pub errors: Vec<String>,
}

impl TestResults {
    #[must_use]
    pub fn success() -> Self {
        Self {
            code: 200,
            success: true,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn failure(code: u16, errors: Vec<String>) -> Self {
        Self {
            code,
            success: false,
            errors,
        }
    }
}

/// A configured repository
#[async_trait]
pub trait RepositoryAdapter: Send + Sync {
    /// The configuration this adapter was built from
    fn config(&self) -> &Repository;

    /// Adapter specific configuration problems
    fn validate(&self) -> Vec<FieldError>;

    /// Check that the remote side is reachable and usable
    async fn test(&self) -> anyhow::Result<TestResults>;

    /// Lifecycle hooks, for adapters that register something remotely
    fn hooks(&self) -> Option<&dyn RepositoryHooks> {
        None
    }
}

/// Optional lifecycle hooks of an adapter
#[async_trait]
pub trait RepositoryHooks: Send + Sync {
    /// First reconcile of the repository
    async fn on_create(&self) -> anyhow::Result<Option<WebhookStatus>>;
    /// Spec changed since the last reconcile
    async fn on_update(&self) -> anyhow::Result<Option<WebhookStatus>>;
    /// Repository is being deleted
    async fn on_delete(&self) -> anyhow::Result<()>;
}

/// Converts a configuration into an adapter
///
/// Only fails for unrecoverable system errors; the returned adapter may well be
/// invalid or unhealthy.
#[async_trait]
pub trait RepoGetter: Send + Sync {
    async fn as_repository(&self, config: &Repository) -> anyhow::Result<Arc<dyn RepositoryAdapter>>;
}

/// Runs the health test of an adapter
#[async_trait]
pub trait RepositoryTester: Send + Sync {
    async fn test(&self, repo: &dyn RepositoryAdapter) -> anyhow::Result<TestResults>;
}
