//! # Health Check
//!
//! Runs the repository tester and turns the outcome into a `HealthStatus`.
//! A tester that fails to run yields an unhealthy result rather than an error.

use tracing::{info, warn};

use crate::crd::HealthStatus;
use crate::repository::{RepositoryAdapter, RepositoryTester, TestResults};

/// First message of the health status when the tester itself failed
pub const TEST_ERROR_MESSAGE: &str = "error running test repository";

/// Test `repo` and stamp the result with `now_ms`
pub async fn check_health(
    tester: &dyn RepositoryTester,
    repo: &dyn RepositoryAdapter,
    now_ms: i64,
) -> HealthStatus {
    info!("running health check");
    let results = match tester.test(repo).await {
        Ok(results) => results,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "health test could not run");
            TestResults::failure(500, vec![TEST_ERROR_MESSAGE.to_string(), format!("{e:#}")])
        }
    };

    HealthStatus {
        healthy: results.success,
        checked: now_ms,
        message: results.errors,
    }
}
