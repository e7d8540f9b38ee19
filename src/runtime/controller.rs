//! # Repository Controller
//!
//! Ties the cache notifications, the work queue and a fixed pool of workers
//! together.
//!
//! Notifications only enqueue keys; workers load the latest object from the
//! cache when they get to it, so a burst of notifications for one key costs a
//! single pass.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::worker::run_worker;
use crate::client::RepositoryEventHandler;
use crate::config::ControllerConfig;
use crate::controller::queue::{WorkItem, WorkQueue};
use crate::controller::reconciler::{object_key, Reconciler};
use crate::crd::Repository;

/// Turns cache notifications into queue operations
#[derive(Debug, Clone)]
pub struct EnqueueHandler {
    queue: Arc<WorkQueue>,
}

impl EnqueueHandler {
    pub fn new(queue: Arc<WorkQueue>) -> Self {
        Self { queue }
    }

    fn enqueue(&self, obj: &Repository) {
        let key = object_key(obj);
        if key.is_empty() {
            warn!("couldn't get key for object without a name");
            return;
        }
        self.queue.add(WorkItem::new(key));
    }
}

impl RepositoryEventHandler for EnqueueHandler {
    fn on_add(&self, obj: &Repository) {
        self.enqueue(obj);
    }

    fn on_update(&self, _old: &Repository, new: &Repository) {
        self.enqueue(new);
    }

    /// The object is gone, so there is nothing left to reconcile; only its
    /// retry history is dropped
    fn on_delete(&self, obj: &Repository) {
        self.queue.forget(&WorkItem::new(object_key(obj)));
    }
}

/// Worker pool settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    pub worker_count: usize,
    pub max_attempts: u32,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::from(&ControllerConfig::default())
    }
}

impl From<&ControllerConfig> for WorkerSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            worker_count: config.worker_count.max(1),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

#[derive(Debug)]
pub struct RepositoryController {
    queue: Arc<WorkQueue>,
    reconciler: Arc<Reconciler>,
    settings: WorkerSettings,
}

impl RepositoryController {
    pub fn new(queue: Arc<WorkQueue>, reconciler: Arc<Reconciler>, settings: WorkerSettings) -> Self {
        Self {
            queue,
            reconciler,
            settings,
        }
    }

    /// Handler to register with the cache
    pub fn handler(&self) -> EnqueueHandler {
        EnqueueHandler::new(self.queue.clone())
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Run until `cancel` fires
    ///
    /// Waits for the cache to sync and starts the workers. On cancellation the
    /// queue shuts down and in-flight passes are abandoned at their next await.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Starting RepositoryController");

        let synced = tokio::select! {
            synced = self.reconciler.cache.wait_for_sync() => synced,
            () = cancel.cancelled() => false,
        };
        if !synced {
            warn!("cache did not sync, shutting down RepositoryController");
            self.queue.shut_down();
            return;
        }

        info!(count = self.settings.worker_count, "Starting workers");
        let workers: Vec<_> = (0..self.settings.worker_count)
            .map(|id| {
                let queue = self.queue.clone();
                let reconciler = self.reconciler.clone();
                let max_attempts = self.settings.max_attempts;
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    run_worker(id, &queue, &reconciler, max_attempts, &cancel).await;
                })
            })
            .collect();
        info!("Started workers");

        cancel.cancelled().await;
        info!("Shutting down workers");
        self.queue.shut_down();

        for result in futures::future::join_all(workers).await {
            if let Err(e) = result {
                error!(error = %e, "worker task failed");
            }
        }
        info!("Shutting down RepositoryController");
    }
}
