//! Local filesystem repositories, plus the adapter used for types this build
//! cannot talk to.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use super::{FieldError, RepositoryAdapter, TestResults};
use crate::crd::Repository;

/// Repository backed by a directory on the controller's filesystem
#[derive(Debug, Clone)]
pub struct LocalRepository {
    config: Repository,
}

impl LocalRepository {
    pub fn new(config: Repository) -> Self {
        Self { config }
    }

    fn path(&self) -> Option<&str> {
        self.config
            .spec
            .local
            .as_ref()
            .map(|local| local.path.as_str())
            .filter(|path| !path.is_empty())
    }
}

#[async_trait]
impl RepositoryAdapter for LocalRepository {
    fn config(&self) -> &Repository {
        &self.config
    }

    fn validate(&self) -> Vec<FieldError> {
        match self.path() {
            None => vec![FieldError::new("spec.local.path", "a local path is required")],
            Some(path) if !Path::new(path).is_absolute() => vec![FieldError::new(
                "spec.local.path",
                format!("path {path:?} must be absolute"),
            )],
            Some(_) => Vec::new(),
        }
    }

    async fn test(&self) -> anyhow::Result<TestResults> {
        let Some(path) = self.path() else {
            return Ok(TestResults::failure(
                400,
                vec!["a local path is required".to_string()],
            ));
        };

        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => {
                debug!(path = %path, "local repository path is a directory");
                Ok(TestResults::success())
            }
            Ok(_) => Ok(TestResults::failure(
                400,
                vec![format!("path {path:?} is not a directory")],
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TestResults::failure(
                404,
                vec![format!("path {path:?} does not exist")],
            )),
            Err(e) => Err(anyhow::Error::new(e).context(format!("reading {path:?}"))),
        }
    }
}

/// Stand-in for repository types whose adapter is not compiled into this build
///
/// Passes validation so that configuration problems are still reported, but
/// never reports healthy, which keeps the controller from scheduling syncs.
#[derive(Debug, Clone)]
pub struct UnsupportedRepository {
    config: Repository,
}

impl UnsupportedRepository {
    pub fn new(config: Repository) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RepositoryAdapter for UnsupportedRepository {
    fn config(&self) -> &Repository {
        &self.config
    }

    fn validate(&self) -> Vec<FieldError> {
        Vec::new()
    }

    async fn test(&self) -> anyhow::Result<TestResults> {
        Ok(TestResults::failure(
            501,
            vec![format!(
                "repository type {} is not supported by this controller",
                self.config.spec.r#type
            )],
        ))
    }
}
