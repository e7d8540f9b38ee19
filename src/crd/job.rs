//! # Job
//!
//! Units of asynchronous work created by the reconciler and executed by the job
//! engine. The controller only creates jobs; it never watches them.

use serde::{Deserialize, Serialize};

use super::status::{JobState, SyncStatus};

/// Job Custom Resource Definition
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Job",
    group = "provisioning.repoctl.dev",
    version = "v0alpha1",
    namespaced,
    status = "crate::crd::JobStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}, {"name":"Repository", "type":"string", "jsonPath":".spec.repository"}, {"name":"State", "type":"string", "jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub action: JobAction,
    /// Name of the repository the job operates on
    pub repository: String,
    #[serde(default, rename = "pr", skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequestJobOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportJobOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncJobOptions>,
}

impl JobSpec {
    /// Sync job for `repository`
    #[must_use]
    pub fn sync(repository: impl Into<String>, incremental: bool) -> Self {
        Self {
            action: JobAction::Sync,
            repository: repository.into(),
            sync: Some(SyncJobOptions { incremental }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobAction {
    /// Pull repository content into the instance
    #[default]
    Sync,
    /// Write instance content into the repository
    Export,
    /// Comment on a pull request
    #[serde(rename = "pr")]
    PullRequest,
}

impl JobAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            JobAction::Sync => "sync",
            JobAction::Export => "export",
            JobAction::PullRequest => "pr",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncJobOptions {
    /// Only apply changes since the last successful sync
    #[serde(default)]
    pub incremental: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportJobOptions {
    /// Folder to export; the whole instance when unset
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    /// Prefix inside the repository
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestJobOptions {
    /// Git ref of the pull request head
    #[serde(default, rename = "ref")]
    pub git_ref: String,
    /// Pull request number
    #[serde(default)]
    pub pr: i64,
    /// Head commit hash
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub url: String,
}

/// Progress reported by the job engine
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(default)]
    pub state: Option<JobState>,
    #[serde(default)]
    pub started: i64,
    #[serde(default)]
    pub finished: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    /// Percentage complete, 0 to 100
    #[serde(default)]
    pub progress: f64,
}

impl JobStatus {
    /// Status of a job the engine has not picked up yet
    #[must_use]
    pub fn pending() -> Self {
        Self {
            state: Some(JobState::Pending),
            ..Self::default()
        }
    }

    /// Sync status of a repository whose sync is carried by job `job_id`
    ///
    /// The job message comes first, followed by any errors the job collected.
    #[must_use]
    pub fn to_sync_status(&self, job_id: &str) -> SyncStatus {
        let message = self
            .message
            .iter()
            .filter(|m| !m.is_empty())
            .cloned()
            .chain(self.errors.iter().cloned())
            .collect();
        SyncStatus {
            state: self.state,
            job: Some(job_id.to_string()),
            started: self.started,
            finished: self.finished,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_job_spec() {
        let spec = JobSpec::sync("team-dashboards", true);
        assert_eq!(spec.action, JobAction::Sync);
        assert_eq!(spec.repository, "team-dashboards");
        assert_eq!(spec.sync, Some(SyncJobOptions { incremental: true }));
        assert!(spec.export.is_none());
        assert!(spec.pull_request.is_none());
    }

    #[test]
    fn test_action_wire_names() {
        assert_eq!(serde_json::to_value(JobAction::PullRequest).unwrap(), "pr");
        assert_eq!(serde_json::to_value(JobAction::Export).unwrap(), "export");
        let spec: JobSpec = serde_json::from_value(serde_json::json!({
            "action": "pr",
            "repository": "r",
            "pr": { "ref": "refs/pull/7/head", "pr": 7 }
        }))
        .unwrap();
        assert_eq!(spec.action, JobAction::PullRequest);
        assert_eq!(spec.pull_request.map(|pr| pr.pr), Some(7));
    }

    #[test]
    fn test_pending_job_sync_status() {
        let sync = JobStatus::pending().to_sync_status("repo-sync-1");
        assert_eq!(sync.state, Some(JobState::Pending));
        assert_eq!(sync.job.as_deref(), Some("repo-sync-1"));
        assert_eq!((sync.started, sync.finished), (0, 0));
        assert!(sync.message.is_empty());
    }

    #[test]
    fn test_to_sync_status() {
        let status = JobStatus {
            state: Some(JobState::Error),
            started: 10,
            finished: 20,
            message: Some("sync failed".to_string()),
            errors: vec!["dashboards/a.json: invalid".to_string()],
            progress: 100.0,
        };
        let sync = status.to_sync_status("repo-sync-x1");
        assert_eq!(sync.state, Some(JobState::Error));
        assert_eq!(sync.job.as_deref(), Some("repo-sync-x1"));
        assert_eq!(sync.started, 10);
        assert_eq!(sync.finished, 20);
        assert_eq!(
            sync.message,
            vec!["sync failed".to_string(), "dashboards/a.json: invalid".to_string()]
        );
    }
}
