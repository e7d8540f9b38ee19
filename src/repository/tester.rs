//! Health tester used by the reconciler.

use async_trait::async_trait;
use tracing::debug;

use super::{validate_repository, RepositoryAdapter, RepositoryTester, TestResults};

/// Rejects invalid configuration with a 422 before asking the adapter to test
/// the remote side
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatingTester;

#[async_trait]
impl RepositoryTester for ValidatingTester {
    async fn test(&self, repo: &dyn RepositoryAdapter) -> anyhow::Result<TestResults> {
        let errors = validate_repository(repo);
        if !errors.is_empty() {
            debug!(
                resource.name = repo.config().metadata.name.as_deref().unwrap_or("unknown"),
                errors = errors.len(),
                "repository configuration is invalid"
            );
            return Ok(TestResults::failure(
                422,
                errors.iter().map(ToString::to_string).collect(),
            ));
        }
        repo.test().await
    }
}
