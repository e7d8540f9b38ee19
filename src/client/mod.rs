//! # Collaborators
//!
//! Traits for everything the reconciler talks to. The controller binary wires
//! the Kubernetes-backed implementations from [`k8s`]; tests wire in-memory fakes.

pub mod k8s;

use async_trait::async_trait;

use crate::crd::{JobSpec, Repository};

/// Eventually-consistent read cache of repositories
#[async_trait]
pub trait RepositoryCache: Send + Sync {
    /// Owned copy of the cached object, if present
    fn get(&self, namespace: &str, name: &str) -> Option<Repository>;

    /// Resolve once the initial listing has been delivered; `false` if the
    /// cache can never become ready (watch stopped first)
    async fn wait_for_sync(&self) -> bool;
}

/// Receives cache notifications
pub trait RepositoryEventHandler: Send + Sync {
    fn on_add(&self, obj: &Repository);
    fn on_update(&self, old: &Repository, new: &Repository);
    fn on_delete(&self, obj: &Repository);
}

/// Writes to repository objects
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// Apply `patch` (a JSON merge patch of the form `{"status": {...}}`) to the
    /// status subresource
    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> anyhow::Result<()>;

    /// Drop the whole finalizer list so that deletion can complete
    async fn remove_finalizers(&self, namespace: &str, name: &str) -> anyhow::Result<()>;
}

/// Accepts jobs for asynchronous execution
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Submit a job into `namespace`, returning its identifier
    async fn submit(&self, namespace: &str, job: JobSpec) -> anyhow::Result<String>;
}

/// A managed resource written by a repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceListItem {
    pub group: String,
    /// Plural resource name, e.g. `dashboards` or `folders`
    pub resource: String,
    pub name: String,
    /// Path of the source file inside the repository
    pub path: String,
    pub hash: String,
}

/// Lists the managed resources a repository owns
#[async_trait]
pub trait ResourceLister: Send + Sync {
    async fn list(&self, namespace: &str, repository: &str)
        -> anyhow::Result<Vec<ResourceListItem>>;
}

/// Mutates managed resources during finalization
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Strip the repository ownership annotations, leaving the resource in place
    async fn remove_repository_annotations(
        &self,
        namespace: &str,
        item: &ResourceListItem,
    ) -> anyhow::Result<()>;

    async fn delete(&self, namespace: &str, item: &ResourceListItem) -> anyhow::Result<()>;
}
