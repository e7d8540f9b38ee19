//! # Managed Resources
//!
//! Resources written by a repository carry ownership annotations. The lister
//! finds them by annotation across the managed kinds; the client strips the
//! annotations or deletes the resource.

use async_trait::async_trait;
use kube::api::{ApiResource, DeleteParams, DynamicObject, ListParams, Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::{Map, Value};

use crate::client::{ResourceClient, ResourceListItem, ResourceLister};
use crate::constants::{ANNO_KEY_REPO_HASH, ANNO_KEY_REPO_NAME, ANNO_KEY_REPO_PATH, REPOSITORY_ANNOTATIONS};
use crate::error::is_not_found;

/// Kinds a repository can write
pub fn managed_kinds() -> Vec<ApiResource> {
    vec![
        api_resource("folder.repoctl.dev", "v1", "Folder", "folders"),
        api_resource("dashboard.repoctl.dev", "v1", "Dashboard", "dashboards"),
    ]
}

fn api_resource(group: &str, version: &str, kind: &str, plural: &str) -> ApiResource {
    ApiResource {
        group: group.to_string(),
        version: version.to_string(),
        api_version: format!("{group}/{version}"),
        kind: kind.to_string(),
        plural: plural.to_string(),
    }
}

/// Lists and mutates managed resources through the dynamic API
#[derive(Clone)]
pub struct KubeResources {
    client: Client,
    kinds: Vec<ApiResource>,
    field_manager: String,
}

impl std::fmt::Debug for KubeResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResources")
            .field(
                "kinds",
                &self.kinds.iter().map(|k| k.plural.as_str()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl KubeResources {
    pub fn new(client: Client, kinds: Vec<ApiResource>, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            kinds,
            field_manager: field_manager.into(),
        }
    }

    fn api(&self, namespace: &str, item: &ResourceListItem) -> anyhow::Result<Api<DynamicObject>> {
        let kind = self
            .kinds
            .iter()
            .find(|k| k.group == item.group && k.plural == item.resource)
            .ok_or_else(|| {
                anyhow::anyhow!("unmanaged resource kind {}/{}", item.group, item.resource)
            })?;
        Ok(Api::namespaced_with(self.client.clone(), namespace, kind))
    }
}

/// List entry for `obj` if it is owned by `repository`
pub fn owned_item(kind: &ApiResource, obj: &DynamicObject, repository: &str) -> Option<ResourceListItem> {
    let annotations = obj.annotations();
    if annotations.get(ANNO_KEY_REPO_NAME).map(String::as_str) != Some(repository) {
        return None;
    }
    Some(ResourceListItem {
        group: kind.group.clone(),
        resource: kind.plural.clone(),
        name: obj.name_any(),
        path: annotations.get(ANNO_KEY_REPO_PATH).cloned().unwrap_or_default(),
        hash: annotations.get(ANNO_KEY_REPO_HASH).cloned().unwrap_or_default(),
    })
}

#[async_trait]
impl ResourceLister for KubeResources {
    async fn list(&self, namespace: &str, repository: &str) -> anyhow::Result<Vec<ResourceListItem>> {
        let mut items = Vec::new();
        for kind in &self.kinds {
            let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, kind);
            let list = api.list(&ListParams::default()).await?;
            items.extend(list.items.iter().filter_map(|obj| owned_item(kind, obj, repository)));
        }
        Ok(items)
    }
}

#[async_trait]
impl ResourceClient for KubeResources {
    async fn remove_repository_annotations(
        &self,
        namespace: &str,
        item: &ResourceListItem,
    ) -> anyhow::Result<()> {
        let annotations: Map<String, Value> = REPOSITORY_ANNOTATIONS
            .iter()
            .map(|key| ((*key).to_string(), Value::Null))
            .collect();
        let patch = serde_json::json!({ "metadata": { "annotations": annotations } });
        let params = PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..PatchParams::default()
        };
        self.api(namespace, item)?
            .patch(&item.name, &params, &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, item: &ResourceListItem) -> anyhow::Result<()> {
        match self
            .api(namespace, item)?
            .delete(&item.name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                let e = anyhow::Error::new(e);
                // Already gone
                if is_not_found(&e) {
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(name: &str, annotations: serde_json::Value) -> DynamicObject {
        serde_json::from_value(serde_json::json!({
            "apiVersion": "dashboard.repoctl.dev/v1",
            "kind": "Dashboard",
            "metadata": { "name": name, "namespace": "team", "annotations": annotations }
        }))
        .unwrap()
    }

    #[test]
    fn test_owned_item_reads_annotations() {
        let kinds = managed_kinds();
        let obj = object(
            "d1",
            serde_json::json!({
                ANNO_KEY_REPO_NAME: "dashboards",
                ANNO_KEY_REPO_PATH: "team/d1.json",
                ANNO_KEY_REPO_HASH: "abc123"
            }),
        );
        let item = owned_item(&kinds[1], &obj, "dashboards").unwrap();
        assert_eq!(item.resource, "dashboards");
        assert_eq!(item.group, "dashboard.repoctl.dev");
        assert_eq!(item.path, "team/d1.json");
        assert_eq!(item.hash, "abc123");
    }

    #[test]
    fn test_other_repository_is_ignored() {
        let kinds = managed_kinds();
        let obj = object("d1", serde_json::json!({ ANNO_KEY_REPO_NAME: "other" }));
        assert!(owned_item(&kinds[1], &obj, "dashboards").is_none());
        let unmanaged = object("d2", serde_json::json!({}));
        assert!(owned_item(&kinds[1], &unmanaged, "dashboards").is_none());
    }
}
