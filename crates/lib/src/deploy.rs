//! Deploy coordination and rollback.
//!
//! ```text
//! Validated -> ScopeResolved -> ArtifactsVerified -> Deployed
//!                                                 \-> DeployFailed -> RolledBack
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::action::ActionResult;
use crate::backend::orchestrator::{DeployOptions, Deployment, Orchestrator, OrchestratorError};
use crate::stack::Stack;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployPhase {
  Validated,
  ScopeResolved,
  ArtifactsVerified,
  Deployed,
  DeployFailed,
  RolledBack,
}

impl DeployPhase {
  pub fn is_terminal(&self) -> bool {
    matches!(self, DeployPhase::Deployed | DeployPhase::RolledBack)
  }

  fn can_enter(&self, next: DeployPhase) -> bool {
    use DeployPhase::*;
    matches!(
      (self, next),
      (Validated, ScopeResolved)
        | (ScopeResolved, ArtifactsVerified)
        | (ArtifactsVerified, Deployed)
        | (ArtifactsVerified, DeployFailed)
        | (DeployFailed, RolledBack)
    )
  }
}

impl fmt::Display for DeployPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      DeployPhase::Validated => "validated",
      DeployPhase::ScopeResolved => "scope-resolved",
      DeployPhase::ArtifactsVerified => "artifacts-verified",
      DeployPhase::Deployed => "deployed",
      DeployPhase::DeployFailed => "deploy-failed",
      DeployPhase::RolledBack => "rolled-back",
    };
    f.write_str(s)
  }
}

/// Tracks and logs the phase of one deploy.
#[derive(Debug)]
pub struct PhaseTracker {
  stack: String,
  phase: DeployPhase,
}

impl PhaseTracker {
  pub fn new(stack: &str) -> Self {
    info!(stack = %stack, phase = %DeployPhase::Validated, "deploy phase");
    Self {
      stack: stack.to_string(),
      phase: DeployPhase::Validated,
    }
  }

  pub fn phase(&self) -> DeployPhase {
    self.phase
  }

  pub fn advance(&mut self, next: DeployPhase) {
    if !self.phase.can_enter(next) {
      warn!(stack = %self.stack, from = %self.phase, to = %next, "unexpected deploy phase transition");
    }
    info!(stack = %self.stack, phase = %next, "deploy phase");
    self.phase = next;
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployOutcome {
  pub deployment: Deployment,
  pub dryrun: bool,
  pub phase: DeployPhase,
}

/// A failed deploy: the orchestrator error plus the rollback results.
#[derive(Debug)]
pub struct DeployFailure {
  pub source: OrchestratorError,
  pub rollback: Vec<ActionResult>,
  pub phase: DeployPhase,
}

pub struct DeployCoordinator {
  orchestrator: Arc<dyn Orchestrator>,
}

impl DeployCoordinator {
  pub fn new(orchestrator: Arc<dyn Orchestrator>) -> Self {
    Self { orchestrator }
  }

  /// Submit the stack. On failure, destroy it once and return the original
  /// error with the rollback results attached. A failed dry run changed
  /// nothing and is not rolled back.
  ///
  /// The tracker must be in [`DeployPhase::ArtifactsVerified`].
  pub async fn deploy(
    &self,
    stack: &Stack,
    options: &DeployOptions,
    tracker: &mut PhaseTracker,
  ) -> Result<DeployOutcome, DeployFailure> {
    info!(
      stack = %stack.id,
      orchestrator = self.orchestrator.id(),
      dryrun = options.dryrun,
      "deploying stack"
    );

    match self.orchestrator.deploy(stack, options).await {
      Ok(deployment) => {
        tracker.advance(DeployPhase::Deployed);
        Ok(DeployOutcome {
          deployment,
          dryrun: options.dryrun,
          phase: tracker.phase(),
        })
      }
      Err(source) if options.dryrun => {
        error!(stack = %stack.id, error = %source, "dry run failed");
        tracker.advance(DeployPhase::DeployFailed);
        Err(DeployFailure {
          source,
          rollback: Vec::new(),
          phase: tracker.phase(),
        })
      }
      Err(source) => {
        error!(stack = %stack.id, error = %source, "deploy failed, rolling back");
        tracker.advance(DeployPhase::DeployFailed);

        let rollback = self.orchestrator.destroy(stack).await;
        for result in rollback.iter().filter(|r| !r.succeeded()) {
          warn!(
            resource = %result.resource,
            error = result.error.as_deref().unwrap_or_default(),
            "rollback step failed"
          );
        }
        tracker.advance(DeployPhase::RolledBack);

        Err(DeployFailure {
          source,
          rollback,
          phase: tracker.phase(),
        })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn transitions() {
    assert!(DeployPhase::Validated.can_enter(DeployPhase::ScopeResolved));
    assert!(DeployPhase::ArtifactsVerified.can_enter(DeployPhase::DeployFailed));
    assert!(!DeployPhase::Validated.can_enter(DeployPhase::Deployed));
    assert!(!DeployPhase::Deployed.can_enter(DeployPhase::RolledBack));
    assert!(DeployPhase::RolledBack.is_terminal());
    assert!(!DeployPhase::DeployFailed.is_terminal());
  }

  #[test]
  fn tracker_follows_happy_path() {
    let mut tracker = PhaseTracker::new("shop");
    tracker.advance(DeployPhase::ScopeResolved);
    tracker.advance(DeployPhase::ArtifactsVerified);
    tracker.advance(DeployPhase::Deployed);
    assert_eq!(tracker.phase(), DeployPhase::Deployed);
    assert_eq!(tracker.phase().to_string(), "deployed");
  }
}
