//! # Finalizers
//!
//! Ordered cleanup of a repository that is being deleted.
//!
//! Finalizers run in the order they appear on the object:
//!
//! - `cleanup` calls the adapter's deletion hook, if it has hooks
//! - `release-orphan-resources` strips the repository annotations from every
//!   managed resource so the resources outlive the repository
//! - `remove-orphan-resources` deletes every managed resource
//!
//! A failure on a single resource is logged and counted but never stops the
//! pass. Failing to list the resources does, leaving the finalizers in place for
//! the next attempt.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::client::{ResourceClient, ResourceLister, ResourceListItem};
use crate::constants::FOLDER_RESOURCE;
use crate::observability;
use crate::repository::RepositoryAdapter;

/// Calls the adapter deletion hook
pub const CLEAN_FINALIZER: &str = "cleanup";

/// Removes the repository metadata from everything the repository created
pub const RELEASE_ORPHAN_RESOURCES_FINALIZER: &str = "release-orphan-resources";

/// Removes everything the repository created
pub const REMOVE_ORPHAN_RESOURCES_FINALIZER: &str = "remove-orphan-resources";

/// Processed and failed resource counts of a finalizer pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalizeSummary {
    pub processed: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for FinalizeSummary {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrphanAction {
    Release,
    Remove,
}

#[derive(Clone)]
pub struct FinalizerProcessor {
    lister: Arc<dyn ResourceLister>,
    client: Arc<dyn ResourceClient>,
}

impl std::fmt::Debug for FinalizerProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalizerProcessor").finish_non_exhaustive()
    }
}

impl FinalizerProcessor {
    pub fn new(lister: Arc<dyn ResourceLister>, client: Arc<dyn ResourceClient>) -> Self {
        Self { lister, client }
    }

    /// Run `finalizers` in order against the resources of `repo`
    pub async fn process(
        &self,
        repo: &dyn RepositoryAdapter,
        finalizers: &[String],
    ) -> anyhow::Result<FinalizeSummary> {
        let mut summary = FinalizeSummary::default();

        for finalizer in finalizers {
            match finalizer.as_str() {
                CLEAN_FINALIZER => {
                    if let Some(hooks) = repo.hooks() {
                        if let Err(e) = hooks.on_delete().await {
                            warn!(error = %format!("{e:#}"), "error running deletion hooks");
                        }
                    }
                }
                RELEASE_ORPHAN_RESOURCES_FINALIZER => {
                    summary += self.process_existing_items(repo, OrphanAction::Release).await?;
                }
                REMOVE_ORPHAN_RESOURCES_FINALIZER => {
                    summary += self.process_existing_items(repo, OrphanAction::Remove).await?;
                }
                unknown => {
                    warn!(finalizer = %unknown, "skipping unknown finalizer");
                }
            }
        }

        Ok(summary)
    }

    async fn process_existing_items(
        &self,
        repo: &dyn RepositoryAdapter,
        action: OrphanAction,
    ) -> anyhow::Result<FinalizeSummary> {
        let cfg = repo.config();
        let namespace = cfg.metadata.namespace.as_deref().unwrap_or_default();
        let name = cfg.metadata.name.as_deref().unwrap_or_default();

        let mut items = self
            .lister
            .list(namespace, name)
            .await
            .inspect_err(|e| warn!(error = %format!("{e:#}"), "error listing resources"))
            .with_context(|| format!("listing resources of repository {namespace}/{name}"))?;

        sort_for_deletion(&mut items);

        let mut summary = FinalizeSummary::default();
        for item in &items {
            let result = match action {
                OrphanAction::Release => {
                    self.client
                        .remove_repository_annotations(namespace, item)
                        .await
                }
                OrphanAction::Remove => self.client.delete(namespace, item).await,
            };
            match result {
                Ok(()) => summary.processed += 1,
                Err(e) => {
                    warn!(
                        name = %item.name,
                        resource = %item.resource,
                        error = %format!("{e:#}"),
                        "error processing item"
                    );
                    summary.failed += 1;
                }
            }
        }

        if summary.failed > 0 {
            observability::metrics::increment_finalizer_item_errors(summary.failed as u64);
        }
        info!(
            items = summary.processed,
            errors = summary.failed,
            "processed orphan items"
        );
        Ok(summary)
    }
}

/// Order managed resources so that containers are emptied before removal
///
/// Non-folder resources come first. Folders follow, deeper paths before
/// shallower ones. The sort is stable, so ties keep listing order.
pub fn sort_for_deletion(items: &mut [ResourceListItem]) {
    items.sort_by_key(|item| {
        let is_folder = item.resource == FOLDER_RESOURCE;
        let depth = if is_folder {
            item.path.split('/').count()
        } else {
            0
        };
        (is_folder, std::cmp::Reverse(depth))
    });
}
