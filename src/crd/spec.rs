//! # Repository Spec
//!
//! Desired configuration of a provisioning repository.

use serde::{Deserialize, Serialize};

/// Repository Custom Resource Definition
///
/// A repository is an external content source (local path, GitHub repository,
/// S3 bucket) mirrored into the managed instance.
///
/// # Example
///
/// ```yaml
/// apiVersion: provisioning.repoctl.dev/v0alpha1
/// kind: Repository
/// metadata:
///   name: team-dashboards
///   namespace: default
///   finalizers:
///     - cleanup
///     - remove-orphan-resources
/// spec:
///   title: Team dashboards
///   type: local
///   local:
///     path: /var/lib/dashboards
///   sync:
///     enabled: true
///     target: folder
///     intervalSeconds: 60
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Repository",
    group = "provisioning.repoctl.dev",
    version = "v0alpha1",
    namespaced,
    status = "crate::crd::RepositoryStatus",
    shortname = "repo",
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}, {"name":"Healthy", "type":"boolean", "jsonPath":".status.health.healthy"}, {"name":"Sync", "type":"string", "jsonPath":".status.sync.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySpec {
    /// Display name shown to users
    #[serde(default)]
    pub title: String,
    /// Optional longer description
    #[serde(default)]
    pub description: Option<String>,
    /// Which adapter backs this repository
    pub r#type: RepositoryType,
    /// Configuration used when `type` is `local`
    #[serde(default)]
    pub local: Option<LocalRepositoryConfig>,
    /// Configuration used when `type` is `github`
    #[serde(default)]
    pub github: Option<GitHubRepositoryConfig>,
    /// Configuration used when `type` is `s3`
    #[serde(default)]
    pub s3: Option<S3RepositoryConfig>,
    /// Sync cadence
    #[serde(default)]
    pub sync: SyncOptions,
}

/// Repository backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryType {
    #[default]
    Local,
    GitHub,
    S3,
}

impl RepositoryType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryType::Local => "local",
            RepositoryType::GitHub => "github",
            RepositoryType::S3 => "s3",
        }
    }
}

impl std::fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalRepositoryConfig {
    /// Directory on the controller's filesystem
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitHubRepositoryConfig {
    /// Repository URL, e.g. `https://github.com/org/repo`
    pub url: String,
    /// Branch to sync from
    #[serde(default)]
    pub branch: Option<String>,
    /// Render preview images for pull requests
    #[serde(default)]
    pub generate_dashboard_previews: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct S3RepositoryConfig {
    pub region: String,
    pub bucket: String,
}

/// Desired sync cadence
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncOptions {
    /// Whether the controller should schedule sync jobs at all
    #[serde(default)]
    pub enabled: bool,
    /// Where synced content lands; required when `enabled`
    #[serde(default)]
    pub target: Option<SyncTarget>,
    /// Seconds between incremental resyncs
    #[serde(default)]
    pub interval_seconds: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SyncTarget {
    /// Content is written to the root of the instance
    Instance,
    /// Content is written into a folder owned by the repository
    Folder,
}
