//! Resolves a repository configuration to the adapter that serves it.

use std::sync::Arc;

use async_trait::async_trait;

use super::{LocalRepository, RepoGetter, RepositoryAdapter, UnsupportedRepository};
use crate::crd::{Repository, RepositoryType};

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRepoGetter;

#[async_trait]
impl RepoGetter for DefaultRepoGetter {
    async fn as_repository(&self, config: &Repository) -> anyhow::Result<Arc<dyn RepositoryAdapter>> {
        let adapter: Arc<dyn RepositoryAdapter> = match config.spec.r#type {
            RepositoryType::Local => Arc::new(LocalRepository::new(config.clone())),
            RepositoryType::GitHub | RepositoryType::S3 => {
                Arc::new(UnsupportedRepository::new(config.clone()))
            }
        };
        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::RepositorySpec;

    #[tokio::test]
    async fn test_adapter_keeps_configuration() {
        let config = Repository::new(
            "s3-repo",
            RepositorySpec {
                r#type: RepositoryType::S3,
                ..RepositorySpec::default()
            },
        );
        let adapter = DefaultRepoGetter.as_repository(&config).await.unwrap();
        assert_eq!(adapter.config().metadata.name.as_deref(), Some("s3-repo"));
        assert!(!adapter.test().await.unwrap().success);
    }
}
