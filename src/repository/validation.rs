//! Configuration checks applied before any adapter is tested.

use thiserror::Error;

use super::RepositoryAdapter;
use crate::constants::MIN_SYNC_INTERVAL_SECS;
use crate::crd::RepositoryType;

/// Repository names that collide with built-in routes
pub const RESERVED_NAMES: [&str; 14] = [
    "classic", "sql", "SQL", "plugins", "legacy", "new", "job", "github", "s3", "gcs", "file",
    "create", "update", "delete",
];

/// A single invalid field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {detail}")]
pub struct FieldError {
    /// Dotted path of the offending field, e.g. `spec.sync.target`
    pub field: String,
    pub detail: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            detail: detail.into(),
        }
    }
}

/// Adapter checks followed by the checks every repository must pass
pub fn validate_repository(repo: &dyn RepositoryAdapter) -> Vec<FieldError> {
    let mut errors = repo.validate();
    let cfg = repo.config();
    let spec = &cfg.spec;

    if spec.title.is_empty() {
        errors.push(FieldError::new("spec.title", "a repository title must be given"));
    }

    if spec.sync.enabled && spec.sync.target.is_none() {
        errors.push(FieldError::new(
            "spec.sync.target",
            "the target type is required when sync is enabled",
        ));
    }

    if spec.sync.enabled && spec.sync.interval_seconds < MIN_SYNC_INTERVAL_SECS {
        errors.push(FieldError::new(
            "spec.sync.intervalSeconds",
            format!(
                "interval must be at least {MIN_SYNC_INTERVAL_SECS} seconds, got {}",
                spec.sync.interval_seconds
            ),
        ));
    }

    let name = cfg.metadata.name.as_deref().unwrap_or_default();
    if RESERVED_NAMES.contains(&name) {
        errors.push(FieldError::new(
            "metadata.name",
            format!("name {name:?} is reserved, choose a different identifier"),
        ));
    }

    if spec.r#type != RepositoryType::Local && spec.local.is_some() {
        errors.push(FieldError::new(
            "spec.local",
            "local config only valid when type is local",
        ));
    }
    if spec.r#type != RepositoryType::GitHub && spec.github.is_some() {
        errors.push(FieldError::new(
            "spec.github",
            "github config only valid when type is github",
        ));
    }
    if spec.r#type != RepositoryType::S3 && spec.s3.is_some() {
        errors.push(FieldError::new(
            "spec.s3",
            "s3 config only valid when type is s3",
        ));
    }

    errors
}
