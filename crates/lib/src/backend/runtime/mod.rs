//! Container runtime backends.
//!
//! A runtime builds images, pushes them, streams container logs, lists images
//! by label and stops running containers.

mod docker;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWrite;

use crate::util::process::ProcessError;

pub use docker::DockerRuntime;

#[derive(Debug, Error)]
pub enum RuntimeError {
  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to decode runtime output: {0}")]
  Decode(#[from] serde_json::Error),
}

/// Everything needed to build one component image.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
  /// Full image reference to tag the result with (`name:version`).
  pub reference: String,
  pub context: PathBuf,
  pub dockerfile: PathBuf,
  pub labels: BTreeMap<String, String>,
  /// Evaluated component environment, passed as build arguments.
  pub build_args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOutput {
  pub image_id: Option<String>,
  pub log: String,
}

/// A previously built image, as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
  pub id: String,
  pub tags: Vec<String>,
  #[serde(default)]
  pub labels: BTreeMap<String, String>,
  /// Creation timestamp, RFC 3339.
  pub created: String,
  /// Size in bytes.
  pub size: u64,
}

pub type LogSink<'a> = &'a mut (dyn AsyncWrite + Unpin + Send);

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
  fn id(&self) -> &str;

  async fn build_image(&self, request: &BuildRequest) -> Result<BuildOutput, RuntimeError>;

  async fn push_image(&self, reference: &str) -> Result<(), RuntimeError>;

  /// Copy the logs of `container` into the given writers.
  async fn logs(&self, container: &str, stdout: LogSink<'_>, stderr: LogSink<'_>) -> Result<(), RuntimeError>;

  /// List images carrying `label` (`key=value`).
  async fn list_images(&self, label: &str) -> Result<Vec<Artifact>, RuntimeError>;

  async fn stop(&self, container: &str) -> Result<(), RuntimeError>;
}
