//! # Logging
//!
//! `tracing` subscriber setup. The filter comes from `RUST_LOG` and defaults to
//! `repository_controller=info`; the format is JSON unless text is requested.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "repository_controller=info";

/// Install the global subscriber
///
/// Fails if a subscriber has already been installed.
pub fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
