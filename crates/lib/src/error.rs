//! Engine-level error taxonomy.

use thiserror::Error;

use crate::action::ActionResult;
use crate::artifacts::ArtifactReport;
use crate::backend::orchestrator::OrchestratorError;
use crate::backend::runtime::RuntimeError;
use crate::backend::store::StoreError;
use crate::backend::vcs::VcsError;
use crate::build::{BuildReport, NotBuildable};
use crate::config::ConfigError;
use crate::deploy::{DeployFailure, DeployPhase};
use crate::expr::EvalError;
use crate::publish::PublishReport;
use crate::stack::ValidationErrors;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Validation(#[from] ValidationErrors),

  #[error("stack '{id}' is already registered")]
  Conflict { id: String },

  #[error("failed to evaluate env {key} of component '{component}' ({expression}): {source}")]
  Evaluation {
    component: String,
    key: String,
    expression: String,
    #[source]
    source: EvalError,
  },

  #[error("build failed: {}", failed_list(.0.failed().map(|(id, _)| id.as_str())))]
  BuildFailed(BuildReport),

  #[error("publish failed: {}", failed_list(.0.failed().map(|(id, _)| id.as_str())))]
  PublishFailed(PublishReport),

  #[error("one or more artifacts missing: {}", failed_list(.0.missing().map(|e| e.artifact.as_str())))]
  ArtifactsMissing(ArtifactReport),

  #[error("deploy failed ({phase}): {source}")]
  DeployFailed {
    #[source]
    source: OrchestratorError,
    rollback: Vec<ActionResult>,
    phase: DeployPhase,
  },

  #[error(transparent)]
  NotBuildable(#[from] NotBuildable),

  #[error(transparent)]
  Runtime(#[from] RuntimeError),

  #[error(transparent)]
  Orchestrator(#[from] OrchestratorError),

  #[error(transparent)]
  Vcs(#[from] VcsError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

impl From<DeployFailure> for EngineError {
  fn from(failure: DeployFailure) -> Self {
    EngineError::DeployFailed {
      source: failure.source,
      rollback: failure.rollback,
      phase: failure.phase,
    }
  }
}

fn failed_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
  items.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::build::ComponentBuild;
  use std::time::Duration;

  #[test]
  fn build_failure_names_failed_components() {
    let mut report = BuildReport::default();
    for (id, error) in [("api", None), ("db", Some("exit 1")), ("web", Some("exit 2"))] {
      report.components.insert(
        id.to_string(),
        ComponentBuild {
          image: format!("{}:1", id),
          error: error.map(String::from),
          duration: Duration::ZERO,
        },
      );
    }
    assert_eq!(EngineError::BuildFailed(report).to_string(), "build failed: db, web");
  }

  #[test]
  fn evaluation_error_identifies_key() {
    let err = EngineError::Evaluation {
      component: "api".to_string(),
      key: "DB".to_string(),
      expression: "${5}".to_string(),
      source: EvalError::TypeMismatch {
        expected: crate::expr::ValueKind::String,
        got: crate::expr::ValueKind::Int,
      },
    };
    let text = err.to_string();
    assert!(text.contains("DB"));
    assert!(text.contains("'api'"));
    assert!(text.contains("${5}"));
  }
}
