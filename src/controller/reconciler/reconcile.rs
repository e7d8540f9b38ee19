//! # Reconcile
//!
//! One pass over one repository key.
//!
//! The pass reads an owned copy from the cache and decides what to do from the
//! object alone. Deletion runs the finalizers. Otherwise the health is refreshed
//! when it is old enough, hooks run for create and update, a sync job is
//! submitted when allowed, and every status change is written in one patch.

use std::time::Instant;

use tracing::{debug, info, Instrument};

use super::health::check_health;
use super::status::StatusPatch;
use super::types::{Outcome, PassState, Reconciler, ReconcilerError, Transition};
use crate::crd::{JobSpec, JobState, JobStatus, Repository, SyncStatus};
use crate::observability;
use crate::repository::RepositoryAdapter;

/// Split a `namespace/name` key
///
/// A key without a slash is a cluster-scoped name and yields an empty
/// namespace. More than one slash, or an empty name, is rejected.
pub fn split_meta_namespace_key(key: &str) -> Result<(String, String), ReconcilerError> {
    let invalid = |reason| ReconcilerError::InvalidKey {
        key: key.to_string(),
        reason,
    };
    let mut parts = key.split('/');
    let (namespace, name) = match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, None) => ("", name),
        (Some(namespace), Some(name), None) => (namespace, name),
        _ => return Err(invalid("unexpected key format")),
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    Ok((namespace.to_string(), name.to_string()))
}

/// Work key of an object
pub fn object_key(obj: &Repository) -> String {
    let name = obj.metadata.name.as_deref().unwrap_or_default();
    match obj.metadata.namespace.as_deref() {
        Some(namespace) if !namespace.is_empty() => format!("{namespace}/{name}"),
        _ => name.to_string(),
    }
}

impl Reconciler {
    /// Reconcile the repository identified by `key`
    pub async fn reconcile(&self, key: &str) -> Result<Outcome, ReconcilerError> {
        let (namespace, name) = split_meta_namespace_key(key)?;
        let span = tracing::info_span!(
            "controller.reconcile",
            work_key = %key,
            resource.name = %name,
            resource.namespace = %namespace,
        );

        async {
            let start = Instant::now();
            let outcome = self.reconcile_object(key, &namespace, &name).await;
            observability::metrics::observe_reconciliation_duration(
                start.elapsed().as_secs_f64(),
            );
            outcome
        }
        .instrument(span)
        .await
    }

    async fn reconcile_object(
        &self,
        key: &str,
        namespace: &str,
        name: &str,
    ) -> Result<Outcome, ReconcilerError> {
        let obj = self
            .cache
            .get(namespace, name)
            .ok_or_else(|| ReconcilerError::NotFound(key.to_string()))?;

        let now_ms = chrono::Utc::now().timestamp_millis();
        let state = PassState::observe(&obj, now_ms, &self.settings);
        let previous = obj.status.clone().unwrap_or_default();

        if state.should_skip() {
            debug!(
                generation = state.generation,
                observed_generation = previous.observed_generation,
                "skipping as conditions are not met"
            );
            return Ok(Outcome::Skipped);
        }

        let transition = state.transition();
        info!(
            generation = state.generation,
            observed_generation = previous.observed_generation,
            transition = %transition,
            "conditions met"
        );
        observability::metrics::increment_transitions(transition.as_str());

        let repo = self
            .repo_getter
            .as_repository(&obj)
            .await
            .map_err(ReconcilerError::Adapter)?;

        if state.deleting {
            return self.finalize(&obj, repo.as_ref()).await;
        }

        let mut patch = StatusPatch::new(state.generation);
        if state.spec_changed {
            patch.mark_changed();
        }

        let mut healthy = previous.health.healthy;
        if state.health_recheck {
            let health = check_health(self.tester.as_ref(), repo.as_ref(), now_ms).await;
            healthy = health.healthy;
            if !health.healthy {
                patch.set_sync(SyncStatus {
                    state: Some(JobState::Error),
                    message: health.message.clone(),
                    ..SyncStatus::default()
                });
            }
            patch.set_health(health);
        }

        let sync = match transition {
            Transition::Create => {
                info!("handle repository create");
                if let Some(hooks) = repo.hooks() {
                    let webhook = hooks.on_create().await.map_err(|source| {
                        ReconcilerError::Hook {
                            hook: "on_create",
                            source,
                        }
                    })?;
                    patch.set_webhook(webhook);
                }
                Some(JobSpec::sync(name, false))
            }
            Transition::Update => {
                info!("handle repository spec update");
                if let Some(hooks) = repo.hooks() {
                    let webhook = hooks.on_update().await.map_err(|source| {
                        ReconcilerError::Hook {
                            hook: "on_update",
                            source,
                        }
                    })?;
                    patch.set_webhook(webhook);
                }
                Some(JobSpec::sync(name, false))
            }
            Transition::Resync => {
                info!("handle repository resync");
                Some(JobSpec::sync(name, true))
            }
            Transition::Stable | Transition::Delete => None,
        };

        let mut job = None;
        if let Some(spec) = sync {
            if obj.spec.sync.enabled && state.generation > 0 && !state.sync_active && healthy {
                let id = self
                    .jobs
                    .submit(namespace, spec)
                    .await
                    .map_err(ReconcilerError::Job)?;
                info!(job = %id, "sync job triggered");
                observability::metrics::increment_jobs_dispatched();
                patch.set_sync(JobStatus::pending().to_sync_status(&id));
                job = Some(id);
            } else {
                debug!(
                    enabled = obj.spec.sync.enabled,
                    sync_active = state.sync_active,
                    healthy,
                    "sync not scheduled"
                );
            }
        }

        let status_written = patch.changed;
        if patch.changed {
            patch.preserve_sync_error(&previous);
            let body = patch
                .to_merge_patch()
                .map_err(|e| ReconcilerError::Status(e.into()))?;
            self.store
                .patch_status(namespace, name, &body)
                .await
                .map_err(ReconcilerError::Status)?;
        }

        Ok(Outcome::Reconciled {
            transition,
            job,
            status_written,
        })
    }

    async fn finalize(
        &self,
        obj: &Repository,
        repo: &dyn RepositoryAdapter,
    ) -> Result<Outcome, ReconcilerError> {
        info!("handle repository delete");
        let finalizers = obj.metadata.finalizers.clone().unwrap_or_default();
        if finalizers.is_empty() {
            return Ok(Outcome::Finalized);
        }

        self.finalizer
            .process(repo, &finalizers)
            .await
            .map_err(ReconcilerError::Finalizer)?;

        let namespace = obj.metadata.namespace.as_deref().unwrap_or_default();
        let name = obj.metadata.name.as_deref().unwrap_or_default();
        self.store
            .remove_finalizers(namespace, name)
            .await
            .map_err(ReconcilerError::RemoveFinalizers)?;

        Ok(Outcome::Finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_namespaced_key() {
        let (ns, name) = split_meta_namespace_key("default/team").unwrap();
        assert_eq!((ns.as_str(), name.as_str()), ("default", "team"));
    }

    #[test]
    fn test_split_cluster_scoped_key() {
        let (ns, name) = split_meta_namespace_key("team").unwrap();
        assert_eq!((ns.as_str(), name.as_str()), ("", "team"));
    }

    #[test]
    fn test_split_rejects_malformed_keys() {
        for key in ["a/b/c", "default/", ""] {
            assert!(
                matches!(
                    split_meta_namespace_key(key),
                    Err(ReconcilerError::InvalidKey { .. })
                ),
                "{key}"
            );
        }
    }

    #[test]
    fn test_object_key() {
        let mut obj = Repository::new("team", Default::default());
        assert_eq!(object_key(&obj), "team");
        obj.metadata.namespace = Some("default".to_string());
        assert_eq!(object_key(&obj), "default/team");
    }
}
