//! # Repository Status
//!
//! Observed state of a repository, written by the controller with merge patches.
//!
//! Every field is serialized (no `skip_serializing_if`) so that a merge patch
//! built from these types fully replaces the nested object it targets.

use serde::{Deserialize, Serialize};

/// Status of a `Repository`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStatus {
    /// Last `metadata.generation` the controller fully reconciled
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default)]
    pub health: HealthStatus,
    #[serde(default)]
    pub sync: SyncStatus,
    /// Output of the adapter's create/update hook
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookStatus>,
}

/// Result of the most recent health check
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub healthy: bool,
    /// Unix milliseconds of the check; zero when never checked
    #[serde(default)]
    pub checked: i64,
    /// Diagnostic messages from a failed check
    #[serde(default)]
    pub message: Vec<String>,
}

/// Status of the most recent sync job
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// `None` until the first sync has been requested
    #[serde(default)]
    pub state: Option<JobState>,
    /// Name of the job carrying the sync
    #[serde(default)]
    pub job: Option<String>,
    /// Unix milliseconds the job started
    #[serde(default)]
    pub started: i64,
    /// Unix milliseconds the job finished
    #[serde(default)]
    pub finished: i64,
    #[serde(default)]
    pub message: Vec<String>,
}

impl SyncStatus {
    /// A sync is pending or running, so another one must not be scheduled
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_some_and(|s| s.is_active())
    }
}

/// Webhook registered by an adapter hook
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookStatus {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub subscribed_events: Vec<String>,
    /// Unix milliseconds of the last delivery received
    #[serde(default)]
    pub last_event: i64,
}

/// Lifecycle of a job, shared by sync status and job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Submitted but not yet picked up
    Pending,
    Working,
    Success,
    Error,
}

impl JobState {
    /// Job is queued or running
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Pending | JobState::Working)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Success | JobState::Error)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Working => "working",
            JobState::Success => "success",
            JobState::Error => "error",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_classes() {
        assert!(JobState::Pending.is_active());
        assert!(JobState::Working.is_active());
        assert!(!JobState::Success.is_active());
        assert!(JobState::Error.is_finished());
        assert!(!JobState::Working.is_finished());
    }

    #[test]
    fn test_unset_sync_state_serializes_as_null() {
        let value = serde_json::to_value(SyncStatus::default()).unwrap();
        assert!(value["state"].is_null());
        assert_eq!(value["message"], serde_json::json!([]));
    }

    #[test]
    fn test_status_deserializes_with_missing_fields() {
        let status: RepositoryStatus = serde_json::from_value(serde_json::json!({
            "observedGeneration": 2,
            "sync": { "state": "working", "job": "repo-sync-abc" }
        }))
        .unwrap();
        assert_eq!(status.observed_generation, 2);
        assert!(status.sync.is_active());
        assert_eq!(status.health, HealthStatus::default());
        assert!(status.webhook.is_none());
    }
}
