//! Artifact registry backends.

mod docker;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::runtime::{ContainerRuntime, RuntimeError};

pub use docker::DockerRegistry;

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("manifest not found: {name}:{tag}")]
  ManifestNotFound { name: String, tag: String },

  #[error("registry request to {url} failed: {source}")]
  Http {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("registry returned HTTP {status} for {url}")]
  Status { url: String, status: u16 },

  #[error("push failed: {0}")]
  Push(#[from] RuntimeError),
}

/// What the registry knows about one tagged manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestInfo {
  pub digest: Option<String>,
  pub media_type: Option<String>,
}

#[async_trait]
pub trait Registry: Send + Sync {
  fn id(&self) -> &str;

  /// Canonical, fully qualified image name for a logical artifact name.
  fn image_name(&self, name: &str) -> String;

  /// Look up the manifest of `name:tag`. `name` is the logical artifact name.
  async fn get_manifest(&self, name: &str, tag: &str) -> Result<ManifestInfo, RegistryError>;

  /// Push a locally built image reference.
  async fn push(&self, runtime: &dyn ContainerRuntime, reference: &str) -> Result<(), RegistryError>;
}
