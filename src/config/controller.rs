//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Number of worker tasks pulling from the work queue
    pub worker_count: usize,
    /// Failed passes after which a work item is dropped
    pub max_attempts: u32,
    /// Per-item backoff starting value (milliseconds)
    /// Doubles with every consecutive failure of the same key
    pub rate_limit_base_delay_ms: u64,
    /// Per-item backoff maximum value (seconds)
    pub rate_limit_max_delay_secs: u64,
    /// Health results older than this force a reconcile pass (seconds)
    pub health_check_interval_secs: u64,
    /// Minimum age of a health result before it is re-run (milliseconds)
    /// Stops a burst of passes from hammering the remote repository
    pub health_check_debounce_ms: u64,
    /// Slack subtracted from the sync interval when deciding a resync is due (milliseconds)
    pub resync_tolerance_ms: u64,
    /// Namespace to watch; all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Port of the metrics and probe server
    pub metrics_port: u16,
    /// Field manager recorded on patches
    pub field_manager: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_base_delay_ms: DEFAULT_RATE_LIMIT_BASE_DELAY_MS,
            rate_limit_max_delay_secs: DEFAULT_RATE_LIMIT_MAX_DELAY_SECS,
            health_check_interval_secs: DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            health_check_debounce_ms: DEFAULT_HEALTH_CHECK_DEBOUNCE_MS,
            resync_tolerance_ms: DEFAULT_RESYNC_TOLERANCE_MS,
            watch_namespace: None,
            metrics_port: DEFAULT_METRICS_PORT,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            worker_count: env_var_or_default("WORKER_COUNT", DEFAULT_WORKER_COUNT).max(1),
            max_attempts: env_var_or_default("MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS).max(1),
            rate_limit_base_delay_ms: env_var_or_default(
                "RATE_LIMIT_BASE_DELAY_MS",
                DEFAULT_RATE_LIMIT_BASE_DELAY_MS,
            ),
            rate_limit_max_delay_secs: env_var_or_default(
                "RATE_LIMIT_MAX_DELAY_SECS",
                DEFAULT_RATE_LIMIT_MAX_DELAY_SECS,
            ),
            health_check_interval_secs: env_var_or_default(
                "HEALTH_CHECK_INTERVAL_SECS",
                DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            ),
            health_check_debounce_ms: env_var_or_default(
                "HEALTH_CHECK_DEBOUNCE_MS",
                DEFAULT_HEALTH_CHECK_DEBOUNCE_MS,
            ),
            resync_tolerance_ms: env_var_or_default(
                "RESYNC_TOLERANCE_MS",
                DEFAULT_RESYNC_TOLERANCE_MS,
            ),
            watch_namespace: std::env::var("WATCH_NAMESPACE")
                .ok()
                .filter(|ns| !ns.trim().is_empty()),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            field_manager: env_var_or_default_str("FIELD_MANAGER", DEFAULT_FIELD_MANAGER),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
        }
    }

    /// Get the backoff starting delay
    pub fn rate_limit_base_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_base_delay_ms)
    }

    /// Get the backoff ceiling
    pub fn rate_limit_max_delay(&self) -> Duration {
        Duration::from_secs(self.rate_limit_max_delay_secs)
    }

    /// Get the health freshness window
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }

    /// Get the health re-check debounce
    pub fn health_check_debounce(&self) -> Duration {
        Duration::from_millis(self.health_check_debounce_ms)
    }

    /// Get the resync tolerance
    pub fn resync_tolerance(&self) -> Duration {
        Duration::from_millis(self.resync_tolerance_ms)
    }

    /// Whether logs should be emitted as JSON
    pub fn json_logs(&self) -> bool {
        !self.log_format.eq_ignore_ascii_case("text")
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
