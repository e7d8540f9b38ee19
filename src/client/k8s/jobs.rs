//! Job submission as `Job` custom resources picked up by the job engine.

use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::PostParams;
use kube::{Api, Client};

use crate::client::JobDispatcher;
use crate::crd::{Job, JobSpec};

/// Label carrying the repository a job belongs to
pub const JOB_REPOSITORY_LABEL: &str = "repoctl.dev/repository";

#[derive(Clone)]
pub struct KubeJobDispatcher {
    client: Client,
    field_manager: String,
}

impl std::fmt::Debug for KubeJobDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeJobDispatcher")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeJobDispatcher {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }
}

/// Job object with a server-generated name of the form `<repository>-<action>-xxxxx`
pub fn job_object(namespace: &str, spec: JobSpec) -> Job {
    let labels = BTreeMap::from([(JOB_REPOSITORY_LABEL.to_string(), spec.repository.clone())]);
    Job {
        metadata: ObjectMeta {
            generate_name: Some(format!("{}-{}-", spec.repository, spec.action.as_str())),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..ObjectMeta::default()
        },
        spec,
        status: None,
    }
}

#[async_trait]
impl JobDispatcher for KubeJobDispatcher {
    async fn submit(&self, namespace: &str, spec: JobSpec) -> anyhow::Result<String> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        let params = PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..PostParams::default()
        };
        let created = api
            .create(&params, &job_object(namespace, spec))
            .await
            .context("creating job")?;
        created
            .metadata
            .name
            .context("created job has no name")
    }
}
