//! Repository writes through the Kubernetes API.

use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;
use tracing::debug;

use crate::client::RepositoryStore;
use crate::crd::Repository;

#[derive(Clone)]
pub struct KubeRepositoryStore {
    client: Client,
    field_manager: String,
}

impl std::fmt::Debug for KubeRepositoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeRepositoryStore")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeRepositoryStore {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn api(&self, namespace: &str) -> Api<Repository> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn params(&self) -> PatchParams {
        PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..PatchParams::default()
        }
    }
}

#[async_trait]
impl RepositoryStore for KubeRepositoryStore {
    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> anyhow::Result<()> {
        debug!(resource.name = %name, resource.namespace = %namespace, "patching repository status");
        self.api(namespace)
            .patch_status(name, &self.params(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn remove_finalizers(&self, namespace: &str, name: &str) -> anyhow::Result<()> {
        debug!(resource.name = %name, resource.namespace = %namespace, "removing finalizers");
        let patch = json!({ "metadata": { "finalizers": null } });
        self.api(namespace)
            .patch(name, &self.params(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}
