//! # Repository Controller
//!
//! Keeps provisioning `Repository` resources healthy and synchronized.
//!
//! For every repository the controller:
//!
//! 1. **Tests connectivity** - records a health result in status and re-checks it periodically
//! 2. **Runs lifecycle hooks** - create/update hooks may register a webhook with the remote
//! 3. **Schedules sync jobs** - full sync on spec changes, incremental sync on the configured interval
//! 4. **Cleans up on deletion** - releases or removes the resources a repository wrote, then drops its finalizers
//!
//! ## Endpoints
//!
//! - `/metrics` - Prometheus metrics
//! - `/healthz` - liveness
//! - `/readyz` - readiness, once the repository cache has synced

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use repository_controller::client::RepositoryCache;
use repository_controller::config::ControllerConfig;
use repository_controller::runtime::{init_process, initialize};
use repository_controller::server::start_server;

#[derive(Debug, Parser)]
#[command(name = "repository-controller", version, about)]
struct Args {
    /// Number of concurrent reconcile workers
    #[arg(long, env = "WORKER_COUNT")]
    workers: Option<usize>,

    /// Watch a single namespace instead of the whole cluster
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Port for the metrics and probe server
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Log format (json, text)
    #[arg(long, env = "LOG_FORMAT")]
    log_format: Option<String>,
}

impl Args {
    fn apply(self, mut config: ControllerConfig) -> ControllerConfig {
        if let Some(workers) = self.workers {
            config.worker_count = workers.max(1);
        }
        if let Some(namespace) = self.namespace.filter(|ns| !ns.is_empty()) {
            config.watch_namespace = Some(namespace);
        }
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().apply(ControllerConfig::from_env());
    init_process(&config)?;

    let init = initialize(config).await?;
    let cancel = CancellationToken::new();

    let server = {
        let state = init.server_state.clone();
        let port = init.config.metrics_port;
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state, cancel).await {
                error!("HTTP server error: {}", e);
            }
        })
    };

    let informer = tokio::spawn(init.informer.run(cancel.clone()));

    let readiness = {
        let cache = init.cache.clone();
        let state = init.server_state.clone();
        tokio::spawn(async move {
            if cache.wait_for_sync().await {
                info!("repository cache synced");
                state.set_ready(true);
            }
        })
    };

    {
        let cancel = cancel.clone();
        let state = init.server_state.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("received shutdown signal"),
                Err(e) => error!("failed to listen for shutdown signal: {}", e),
            }
            state.set_ready(false);
            cancel.cancel();
        });
    }

    init.controller.run(cancel.clone()).await;

    // The controller also returns when the cache never syncs
    cancel.cancel();
    readiness.abort();
    if let Err(e) = informer.await {
        error!("repository watch task failed: {}", e);
    }
    if let Err(e) = server.await {
        error!("HTTP server task failed: {}", e);
    }

    info!("Repository Controller stopped");
    Ok(())
}
