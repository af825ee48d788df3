//! Orchestrator backends.
//!
//! An orchestrator places and runs a stack's components. Deploys are
//! declarative: re-deploying the same stack converges on the same state.

mod docker;
mod nomad;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action::ActionResult;
use crate::stack::Stack;
use crate::util::process::ProcessError;

pub use docker::{DockerOrchestrator, DockerPlan, RunSpec};
pub use nomad::NomadOrchestrator;

#[derive(Debug, Error)]
pub enum OrchestratorError {
  #[error("request to {url} failed: {source}")]
  Http {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("orchestrator returned HTTP {status} for {url}: {body}")]
  Status { url: String, status: u16, body: String },

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error("failed to encode or decode orchestrator payload: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployOptions {
  /// Compute the deployment plan without changing live state.
  pub dryrun: bool,
}

/// Result of a deploy request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
  /// Raw backend response (plan diff for dry runs).
  pub response: serde_json::Value,
  /// The job descriptor that was submitted or planned.
  pub job: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatus {
  pub id: String,
  pub status: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

#[async_trait]
pub trait Orchestrator: Send + Sync {
  fn id(&self) -> &str;

  async fn deploy(&self, stack: &Stack, options: &DeployOptions) -> Result<Deployment, OrchestratorError>;

  /// Tear down every resource of the stack. Failures are reported per
  /// resource.
  async fn destroy(&self, stack: &Stack) -> Vec<ActionResult>;

  async fn status(&self, stack: &Stack) -> Result<Vec<ComponentStatus>, OrchestratorError>;
}
