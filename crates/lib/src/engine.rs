//! The stack engine facade.
//!
//! [`StackEngine`] owns the backend handles and composes the pipeline:
//!
//! - Build: validate, resolve scope, evaluate, build (concurrently), gate,
//!   publish when allowed.
//! - Deploy: validate, resolve scope, evaluate, verify artifacts, deploy,
//!   roll back on failure.
//!
//! Phases of one call run strictly in order. Scope is resolved afresh on
//! every call.

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::action::ActionResult;
use crate::artifacts::{Artifact, ArtifactChecker};
use crate::backend::Backends;
use crate::backend::orchestrator::{ComponentStatus, DeployOptions};
use crate::backend::runtime::LogSink;
use crate::backend::store::StoreError;
use crate::build::{BuildReport, ComponentBuilder, build_request};
use crate::config::EngineConfig;
use crate::consts::STACK_LABEL;
use crate::deploy::{DeployCoordinator, DeployOutcome, DeployPhase, PhaseTracker};
use crate::error::EngineError;
use crate::expr;
use crate::publish::{GateDecision, PublishReport, Publisher, WorktreeGate, image_reference};
use crate::report::{Reporter, SummaryGuard, TracingReporter};
use crate::scope::{ScopeResolver, ScopeVariables};
use crate::stack::{Component, Stack};

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
  /// Publish even when the worktree has uncommitted changes.
  pub publish: bool,
  /// Source root; build contexts and VCS status are relative to it.
  pub workdir: PathBuf,
  /// Cap on concurrent component builds.
  pub parallelism: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
  pub report: BuildReport,
  pub gate: GateDecision,
  /// `None` when the gate skipped publishing.
  pub publish: Option<PublishReport>,
}

impl BuildOutcome {
  pub fn published(&self) -> bool {
    self.publish.is_some()
  }
}

pub struct StackEngine {
  backends: Backends,
  scope: ScopeResolver,
  reporter: Arc<dyn Reporter>,
}

impl StackEngine {
  /// Construct every configured backend.
  pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
    let backends = Backends::from_config(config)?;
    Ok(Self::with_backends(backends, config.vcs.scope_vars()))
  }

  /// Use pre-built backends. `base_scope` is merged into every resolution.
  pub fn with_backends(backends: Backends, base_scope: ScopeVariables) -> Self {
    Self {
      backends,
      scope: ScopeResolver::new(base_scope),
      reporter: Arc::new(TracingReporter),
    }
  }

  pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
    self.reporter = reporter;
    self
  }

  pub fn backends(&self) -> &Backends {
    &self.backends
  }

  pub fn validate(&self, stack: &Stack) -> Result<(), EngineError> {
    Ok(stack.check()?)
  }

  pub fn scope(&self, stack: &Stack) -> ScopeVariables {
    self.scope.resolve(stack)
  }

  /// Replace every component's raw env expressions with evaluated strings.
  ///
  /// A component is updated only if all of its variables evaluate.
  pub fn evaluate(&self, stack: &mut Stack, vars: &ScopeVariables) -> Result<(), EngineError> {
    for component in stack.components.values_mut() {
      if component.has_env_vars() {
        evaluate_component(component, vars)?;
      }
    }
    Ok(())
  }

  fn prepare(&self, stack: &mut Stack) -> Result<ScopeVariables, EngineError> {
    self.validate(stack)?;
    let vars = self.scope(stack);
    self.reporter.scope(stack, &vars);
    self.evaluate(stack, &vars)?;
    Ok(vars)
  }

  /// Build every buildable component and publish when the gate allows.
  pub async fn build(&self, stack: &mut Stack, options: &BuildOptions) -> Result<BuildOutcome, EngineError> {
    self.prepare(stack)?;

    let mut guard = SummaryGuard::new(self.reporter.clone(), &stack.id);

    let mut requests = BTreeMap::new();
    for component in stack.buildable() {
      let reference = image_reference(self.backends.registry.as_ref(), stack, &component.id, &component.version);
      requests.insert(
        component.id.clone(),
        build_request(stack, component, reference, &options.workdir)?,
      );
    }

    let builder = ComponentBuilder::new(self.backends.runtime.clone()).with_parallelism(options.parallelism);
    let report = builder.build(requests).await;
    guard.set_build(report.clone());

    if !report.succeeded() {
      return Err(EngineError::BuildFailed(report));
    }

    let gate = WorktreeGate::new(self.backends.vcs.clone())
      .check(&options.workdir, options.publish)
      .await?;
    self.reporter.gate(&gate);
    guard.set_gate(gate.clone());

    if !gate.can_publish() {
      return Ok(BuildOutcome {
        report,
        gate,
        publish: None,
      });
    }

    let publish = Publisher::new(self.backends.runtime.clone(), self.backends.registry.clone())
      .publish(stack)
      .await;
    guard.set_publish(publish.clone());

    if !publish.succeeded() {
      return Err(EngineError::PublishFailed(publish));
    }

    Ok(BuildOutcome {
      report,
      gate,
      publish: Some(publish),
    })
  }

  /// Deploy the stack. Artifacts are verified first; a failed deploy is
  /// rolled back with a single destroy.
  pub async fn deploy(&self, stack: &mut Stack, options: &DeployOptions) -> Result<DeployOutcome, EngineError> {
    self.validate(stack)?;
    let mut tracker = PhaseTracker::new(&stack.id);

    let vars = self.scope(stack);
    self.reporter.scope(stack, &vars);
    self.evaluate(stack, &vars)?;
    tracker.advance(DeployPhase::ScopeResolved);

    let report = ArtifactChecker::new(self.backends.registry.clone()).check(stack).await;
    self.reporter.artifacts(&report);
    if !report.is_complete() {
      return Err(EngineError::ArtifactsMissing(report));
    }
    tracker.advance(DeployPhase::ArtifactsVerified);

    let coordinator = DeployCoordinator::new(self.backends.orchestrator.clone());
    match coordinator.deploy(stack, options, &mut tracker).await {
      Ok(outcome) => {
        if outcome.dryrun {
          self.reporter.deploy_plan(stack, &outcome.deployment);
        }
        Ok(outcome)
      }
      Err(failure) => {
        if !options.dryrun {
          self.reporter.rollback(stack, &failure.rollback);
        }
        Err(failure.into())
      }
    }
  }

  pub async fn destroy(&self, stack: &Stack) -> Vec<ActionResult> {
    info!(stack = %stack.id, "destroying stack");
    self.backends.orchestrator.destroy(stack).await
  }

  /// Stop every component's running container.
  pub async fn stop(&self, stack: &Stack) -> Vec<ActionResult> {
    let mut results = Vec::with_capacity(stack.components.len());
    for id in stack.components.keys() {
      let result = self.backends.runtime.stop(&stack.container_name(id)).await;
      if let Err(e) = &result {
        warn!(component = %id, error = %e, "failed to stop container");
      }
      results.push(ActionResult::new(id, "stop").with_result(&result));
    }
    results
  }

  pub async fn status(&self, stack: &Stack) -> Result<Vec<ComponentStatus>, EngineError> {
    Ok(self.backends.orchestrator.status(stack).await?)
  }

  /// Copy the logs of one running container.
  pub async fn log(&self, container: &str, stdout: LogSink<'_>, stderr: LogSink<'_>) -> Result<(), EngineError> {
    Ok(self.backends.runtime.logs(container, stdout, stderr).await?)
  }

  /// Copy the logs of every component. All components are attempted; the
  /// last error is returned.
  pub async fn logs(&self, stack: &Stack, stdout: LogSink<'_>, stderr: LogSink<'_>) -> Result<(), EngineError> {
    let mut last_err = None;
    for id in stack.components.keys() {
      let container = stack.container_name(id);
      if let Err(e) = self.backends.runtime.logs(&container, &mut *stdout, &mut *stderr).await {
        warn!(container = %container, error = %e, "failed to read logs");
        last_err = Some(e);
      }
    }
    match last_err {
      Some(e) => Err(e.into()),
      None => Ok(()),
    }
  }

  /// Images built for the stack, as known to the local runtime.
  pub async fn artifacts(&self, stack: &Stack) -> Result<Vec<Artifact>, EngineError> {
    let label = format!("{}={}", STACK_LABEL, stack.id);
    Ok(self.backends.runtime.list_images(&label).await?)
  }

  pub fn get(&self, id: &str) -> Result<Stack, EngineError> {
    Ok(self.backends.store.get(id)?)
  }

  pub fn iter(&self, prefix: &str, visitor: &mut dyn FnMut(Stack) -> ControlFlow<()>) -> Result<(), EngineError> {
    Ok(self.backends.store.iter(prefix, visitor)?)
  }

  /// Store a new stack. Fails with [`EngineError::Conflict`] if the id is
  /// taken; the existing record is left unchanged.
  pub fn register(&self, stack: &Stack) -> Result<(), EngineError> {
    self.validate(stack)?;
    match self.backends.store.create(stack) {
      Ok(()) => {
        info!(stack = %stack.id, "stack registered");
        Ok(())
      }
      Err(StoreError::Exists(id)) => Err(EngineError::Conflict { id }),
      Err(e) => Err(e.into()),
    }
  }

  /// Update a registered stack.
  pub fn commit(&self, stack: &Stack) -> Result<(), EngineError> {
    self.validate(stack)?;
    self.backends.store.update(stack)?;
    debug!(stack = %stack.id, "stack committed");
    Ok(())
  }

  /// Short id of the source revision at `path`.
  pub async fn head_version(&self, path: &Path) -> Result<Option<String>, EngineError> {
    Ok(self.backends.vcs.head_version(path).await?)
  }
}

fn evaluate_component(component: &mut Component, vars: &ScopeVariables) -> Result<(), EngineError> {
  let mut evaluated = BTreeMap::new();
  for (key, expression) in &component.env {
    let value = expr::evaluate_string(expression, vars).map_err(|source| EngineError::Evaluation {
      component: component.id.clone(),
      key: key.clone(),
      expression: expression.clone(),
      source,
    })?;
    evaluated.insert(key.clone(), value);
  }
  component.env = evaluated;
  Ok(())
}
