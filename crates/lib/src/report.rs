//! Reporting surface for engine operations.
//!
//! The engine hands every intermediate result to a [`Reporter`] as it is
//! produced, so partial progress is visible even when an operation fails.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::action::ActionResult;
use crate::artifacts::ArtifactReport;
use crate::backend::orchestrator::Deployment;
use crate::build::{BuildReport, duration_text};
use crate::publish::{GateDecision, PublishReport};
use crate::scope::ScopeVariables;
use crate::stack::Stack;

/// Everything known about one `build` call when it ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildSummary {
  pub stack: String,
  pub build: Option<BuildReport>,
  pub gate: Option<GateDecision>,
  pub publish: Option<PublishReport>,
  #[serde(with = "duration_text")]
  pub total: Duration,
}

impl BuildSummary {
  pub fn succeeded(&self) -> bool {
    self.build.as_ref().is_some_and(BuildReport::succeeded)
      && self.publish.as_ref().is_none_or(PublishReport::succeeded)
  }
}

pub trait Reporter: Send + Sync {
  fn scope(&self, _stack: &Stack, _vars: &ScopeVariables) {}

  fn build_summary(&self, _summary: &BuildSummary) {}

  fn gate(&self, _decision: &GateDecision) {}

  fn artifacts(&self, _report: &ArtifactReport) {}

  /// Job descriptor of a dry-run deploy.
  fn deploy_plan(&self, _stack: &Stack, _deployment: &Deployment) {}

  fn rollback(&self, _stack: &Stack, _results: &[ActionResult]) {}
}

/// Reporter that logs through `tracing`.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
  fn scope(&self, stack: &Stack, vars: &ScopeVariables) {
    for (key, value) in vars.iter() {
      info!(stack = %stack.id, key = %key, value = %value, "scope variable");
    }
  }

  fn build_summary(&self, summary: &BuildSummary) {
    if let Some(build) = &summary.build {
      for (component, result) in &build.components {
        match &result.error {
          None => info!(component = %component, duration = ?result.duration, "build ok"),
          Some(e) => warn!(component = %component, error = %e, "build failed"),
        }
      }
    }
    if let Some(publish) = &summary.publish {
      for (component, result) in &publish.components {
        match &result.error {
          None => info!(component = %component, image = %result.reference, "published"),
          Some(e) => warn!(component = %component, error = %e, "publish failed"),
        }
      }
    }
    info!(
      stack = %summary.stack,
      succeeded = summary.succeeded(),
      total = ?summary.total,
      "build summary"
    );
  }

  fn gate(&self, decision: &GateDecision) {
    if !decision.can_publish() {
      info!("artifacts will not be published");
    }
  }

  fn artifacts(&self, report: &ArtifactReport) {
    for entry in &report.entries {
      info!(
        artifact = %entry.artifact,
        status = entry.error.as_deref().unwrap_or("ok"),
        "artifact"
      );
    }
  }

  fn deploy_plan(&self, stack: &Stack, deployment: &Deployment) {
    info!(stack = %stack.id, job = %deployment.job, "deploy plan");
  }

  fn rollback(&self, stack: &Stack, results: &[ActionResult]) {
    for result in results {
      info!(
        stack = %stack.id,
        resource = %result.resource,
        ok = result.succeeded(),
        "rollback"
      );
    }
  }
}

/// Emits the build summary exactly once when dropped.
///
/// Drop runs on every exit path of a build, including early returns and a
/// cancelled future.
pub struct SummaryGuard {
  reporter: Arc<dyn Reporter>,
  summary: BuildSummary,
  start: Instant,
}

impl SummaryGuard {
  pub fn new(reporter: Arc<dyn Reporter>, stack: &str) -> Self {
    Self {
      reporter,
      summary: BuildSummary {
        stack: stack.to_string(),
        ..Default::default()
      },
      start: Instant::now(),
    }
  }

  pub fn set_build(&mut self, report: BuildReport) {
    self.summary.build = Some(report);
  }

  pub fn set_gate(&mut self, decision: GateDecision) {
    self.summary.gate = Some(decision);
  }

  pub fn set_publish(&mut self, report: PublishReport) {
    self.summary.publish = Some(report);
  }

  pub fn summary(&self) -> &BuildSummary {
    &self.summary
  }
}

impl Drop for SummaryGuard {
  fn drop(&mut self) {
    self.summary.total = self.start.elapsed();
    self.reporter.build_summary(&self.summary);
  }
}
