//! # Status Patch
//!
//! A pass composes its status changes locally and writes them with a single
//! JSON merge patch under `status`. Fields the pass did not touch are left out
//! of the patch so the stored values survive.

use serde::Serialize;
use serde_json::Value;

use crate::crd::{HealthStatus, JobState, RepositoryStatus, SyncStatus, WebhookStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPatch {
    pub observed_generation: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookStatus>,
    /// Something in this pass warrants a write
    #[serde(skip)]
    pub changed: bool,
}

impl StatusPatch {
    /// Patch stamping `generation` as observed
    pub fn new(generation: i64) -> Self {
        Self {
            observed_generation: generation,
            ..Self::default()
        }
    }

    pub fn set_health(&mut self, health: HealthStatus) {
        self.health = Some(health);
        self.changed = true;
    }

    pub fn set_sync(&mut self, sync: SyncStatus) {
        self.sync = Some(sync);
        self.changed = true;
    }

    /// Record hook output; a hook that ran counts as a change even without output
    pub fn set_webhook(&mut self, webhook: Option<WebhookStatus>) {
        if webhook.is_some() {
            self.webhook = webhook;
        }
        self.changed = true;
    }

    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Carry a previous error sync state into a patch that sets no sync state
    pub fn preserve_sync_error(&mut self, previous: &RepositoryStatus) {
        let unset = self.sync.as_ref().is_none_or(|sync| sync.state.is_none());
        if unset && previous.sync.state == Some(JobState::Error) {
            self.sync = Some(previous.sync.clone());
        }
    }

    /// `{"status": {...}}` merge patch body
    pub fn to_merge_patch(&self) -> serde_json::Result<Value> {
        Ok(serde_json::json!({ "status": serde_json::to_value(self)? }))
    }
}
