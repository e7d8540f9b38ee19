//! # Kubernetes Collaborators
//!
//! kube-rs implementations of the collaborator traits used by the binary.

mod cache;
mod jobs;
mod resources;
mod store;

pub use cache::{repository_cache, KubeRepositoryCache, RepositoryInformer};
pub use jobs::{job_object, KubeJobDispatcher, JOB_REPOSITORY_LABEL};
pub use resources::{managed_kinds, owned_item, KubeResources};
pub use store::KubeRepositoryStore;
