//! # Initialization
//!
//! Controller initialization: rustls setup, tracing, metrics, Kubernetes
//! client, and wiring of the cache, queue, reconciler and worker pool.

use std::sync::Arc;

use anyhow::{Context, Result};
use kube::{Api, Client};
use tracing::{info, warn};

use super::controller::{RepositoryController, WorkerSettings};
use crate::client::k8s::{
    managed_kinds, repository_cache, KubeJobDispatcher, KubeRepositoryCache, KubeRepositoryStore,
    KubeResources, RepositoryInformer,
};
use crate::config::ControllerConfig;
use crate::controller::backoff::ExponentialBackoff;
use crate::controller::queue::WorkQueue;
use crate::controller::reconciler::{FinalizerProcessor, ReconcileSettings, Reconciler};
use crate::crd::Repository;
use crate::observability;
use crate::repository::{DefaultRepoGetter, ValidatingTester};
use crate::server::ServerState;

/// Everything `main` needs to run the controller
pub struct InitializationResult {
    /// Read side of the repository cache
    pub cache: Arc<KubeRepositoryCache>,
    /// Watch driver feeding the cache; run it alongside the controller
    pub informer: RepositoryInformer,
    pub controller: RepositoryController,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    pub config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field(
                "server_ready",
                &self
                    .server_state
                    .is_ready
                    .load(std::sync::atomic::Ordering::Relaxed),
            )
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Install the process-wide crypto provider and tracing subscriber
///
/// Must run before any TLS connection is attempted.
pub fn init_process(config: &ControllerConfig) -> Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        // Another component already installed one
        warn!("rustls crypto provider was already installed");
    }

    observability::logging::init_tracing(config.json_logs())
        .context("Failed to initialize tracing")?;

    info!("Starting Repository Controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;
    Ok(())
}

/// Build the collaborators and the controller
pub async fn initialize(config: ControllerConfig) -> Result<InitializationResult> {
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let repositories: Api<Repository> = match config.watch_namespace.as_deref() {
        Some(namespace) => {
            info!(namespace = %namespace, "watching repositories in a single namespace");
            Api::namespaced(client.clone(), namespace)
        }
        None => {
            info!("watching repositories in all namespaces");
            Api::all(client.clone())
        }
    };

    let queue = Arc::new(WorkQueue::new(ExponentialBackoff::new(
        config.rate_limit_base_delay(),
        config.rate_limit_max_delay(),
    )));

    let resources = Arc::new(KubeResources::new(
        client.clone(),
        managed_kinds(),
        config.field_manager.clone(),
    ));
    let finalizer = FinalizerProcessor::new(resources.clone(), resources);

    // The reconciler reads from the cache, so the handler is built from the queue directly
    let handler = Arc::new(super::controller::EnqueueHandler::new(queue.clone()));
    let (cache, informer) = repository_cache(repositories, handler);
    let cache = Arc::new(cache);

    let reconciler = Reconciler::new(
        cache.clone(),
        Arc::new(KubeRepositoryStore::new(
            client.clone(),
            config.field_manager.clone(),
        )),
        Arc::new(DefaultRepoGetter),
        Arc::new(ValidatingTester),
        Arc::new(KubeJobDispatcher::new(
            client.clone(),
            config.field_manager.clone(),
        )),
        finalizer,
    )
    .with_settings(ReconcileSettings::from(&config));

    let controller =
        RepositoryController::new(queue, Arc::new(reconciler), WorkerSettings::from(&config));

    info!("Controller initialized");

    Ok(InitializationResult {
        cache,
        informer,
        controller,
        server_state: Arc::new(ServerState::default()),
        config,
    })
}
