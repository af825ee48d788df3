//! Call-recording fake backends.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stackwright_lib::StackEngine;
use stackwright_lib::action::ActionResult;
use stackwright_lib::backend::Backends;
use stackwright_lib::backend::orchestrator::{
  ComponentStatus, DeployOptions, Deployment, Orchestrator, OrchestratorError,
};
use stackwright_lib::backend::registry::{ManifestInfo, Registry, RegistryError};
use stackwright_lib::backend::runtime::{
  Artifact, BuildOutput, BuildRequest, ContainerRuntime, LogSink, RuntimeError,
};
use stackwright_lib::backend::store::{MemoryStore, StackStore};
use stackwright_lib::backend::vcs::{StatusEntry, Vcs, VcsError, VcsStatus};
use stackwright_lib::report::{BuildSummary, Reporter};
use stackwright_lib::scope::ScopeVariables;
use stackwright_lib::stack::{BuildDescriptor, Component, ComponentKind, Stack};
use stackwright_lib::util::process::ProcessError;
use tokio::io::AsyncWriteExt;

fn failure(msg: &str) -> ProcessError {
  ProcessError::Failed {
    cmd: "fake".to_string(),
    code: Some(1),
    stderr: msg.to_string(),
  }
}

#[derive(Default)]
pub struct FakeRuntime {
  /// Component ids whose build fails.
  pub failing: BTreeSet<String>,
  pub builds: Mutex<Vec<BuildRequest>>,
  pub pushes: Mutex<Vec<String>>,
  pub stops: Mutex<Vec<String>>,
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
  fn id(&self) -> &str {
    "fake"
  }

  async fn build_image(&self, request: &BuildRequest) -> Result<BuildOutput, RuntimeError> {
    self.builds.lock().unwrap().push(request.clone());
    let component = request.labels.get("component").cloned().unwrap_or_default();
    if self.failing.contains(&component) {
      return Err(failure("build failed").into());
    }
    Ok(BuildOutput::default())
  }

  async fn push_image(&self, reference: &str) -> Result<(), RuntimeError> {
    self.pushes.lock().unwrap().push(reference.to_string());
    Ok(())
  }

  async fn logs(&self, container: &str, stdout: LogSink<'_>, _stderr: LogSink<'_>) -> Result<(), RuntimeError> {
    stdout.write_all(format!("{} started\n", container).as_bytes()).await?;
    Ok(())
  }

  async fn list_images(&self, label: &str) -> Result<Vec<Artifact>, RuntimeError> {
    Ok(vec![Artifact {
      id: "sha256:1".to_string(),
      tags: vec!["reg/s1/api:1.0".to_string()],
      labels: BTreeMap::from([("filter".to_string(), label.to_string())]),
      created: "2024-01-01T00:00:00Z".to_string(),
      size: 10,
    }])
  }

  async fn stop(&self, container: &str) -> Result<(), RuntimeError> {
    self.stops.lock().unwrap().push(container.to_string());
    if container.starts_with("db.") {
      return Err(failure("no such container").into());
    }
    Ok(())
  }
}

/// Registry holding a fixed set of `name:tag` manifests.
#[derive(Default)]
pub struct FakeRegistry {
  pub manifests: BTreeSet<String>,
  pub lookups: Mutex<Vec<String>>,
}

impl FakeRegistry {
  pub fn with(manifests: &[&str]) -> Self {
    Self {
      manifests: manifests.iter().map(|m| m.to_string()).collect(),
      ..Default::default()
    }
  }
}

#[async_trait]
impl Registry for FakeRegistry {
  fn id(&self) -> &str {
    "fake"
  }

  fn image_name(&self, name: &str) -> String {
    format!("reg/{}", name)
  }

  async fn get_manifest(&self, name: &str, tag: &str) -> Result<ManifestInfo, RegistryError> {
    let key = format!("{}:{}", name, tag);
    self.lookups.lock().unwrap().push(key.clone());
    if self.manifests.contains(&key) {
      Ok(ManifestInfo::default())
    } else {
      Err(RegistryError::ManifestNotFound {
        name: self.image_name(name),
        tag: tag.to_string(),
      })
    }
  }

  async fn push(&self, runtime: &dyn ContainerRuntime, reference: &str) -> Result<(), RegistryError> {
    runtime.push_image(reference).await?;
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorCall {
  Deploy { stack: String, dryrun: bool },
  Destroy { stack: String },
}

#[derive(Default)]
pub struct FakeOrchestrator {
  pub fail_deploy: bool,
  pub calls: Mutex<Vec<OrchestratorCall>>,
}

#[async_trait]
impl Orchestrator for FakeOrchestrator {
  fn id(&self) -> &str {
    "fake"
  }

  async fn deploy(&self, stack: &Stack, options: &DeployOptions) -> Result<Deployment, OrchestratorError> {
    self.calls.lock().unwrap().push(OrchestratorCall::Deploy {
      stack: stack.id.clone(),
      dryrun: options.dryrun,
    });
    if self.fail_deploy {
      return Err(OrchestratorError::Status {
        url: "fake://deploy".to_string(),
        status: 500,
        body: "no capacity".to_string(),
      });
    }
    Ok(Deployment {
      response: serde_json::json!({ "dryrun": options.dryrun }),
      job: serde_json::to_value(stack).unwrap(),
    })
  }

  async fn destroy(&self, stack: &Stack) -> Vec<ActionResult> {
    self.calls.lock().unwrap().push(OrchestratorCall::Destroy {
      stack: stack.id.clone(),
    });
    vec![ActionResult::new(&stack.id, "destroy").with_error("nothing to destroy")]
  }

  async fn status(&self, stack: &Stack) -> Result<Vec<ComponentStatus>, OrchestratorError> {
    Ok(
      stack
        .components
        .keys()
        .map(|id| ComponentStatus {
          id: id.clone(),
          status: "running".to_string(),
          details: None,
        })
        .collect(),
    )
  }
}

#[derive(Default)]
pub struct FakeVcs {
  pub dirty: bool,
}

#[async_trait]
impl Vcs for FakeVcs {
  fn id(&self) -> &str {
    "fake"
  }

  async fn status(&self, _path: &Path) -> Result<VcsStatus, VcsError> {
    let mut status = VcsStatus::default();
    if self.dirty {
      status.entries.push(StatusEntry {
        code: " M".to_string(),
        path: "src/main.rs".to_string(),
      });
    }
    Ok(status)
  }

  async fn head_version(&self, _path: &Path) -> Result<Option<String>, VcsError> {
    Ok(Some("abc1234".to_string()))
  }
}

#[derive(Default)]
pub struct RecordingReporter {
  pub summaries: Mutex<Vec<BuildSummary>>,
  pub rollbacks: Mutex<Vec<Vec<ActionResult>>>,
  pub plans: Mutex<Vec<Deployment>>,
}

impl Reporter for RecordingReporter {
  fn build_summary(&self, summary: &BuildSummary) {
    self.summaries.lock().unwrap().push(summary.clone());
  }

  fn deploy_plan(&self, _stack: &Stack, deployment: &Deployment) {
    self.plans.lock().unwrap().push(deployment.clone());
  }

  fn rollback(&self, _stack: &Stack, results: &[ActionResult]) {
    self.rollbacks.lock().unwrap().push(results.to_vec());
  }
}

/// Handles kept by a test to inspect what the engine did.
pub struct Fakes {
  pub runtime: Arc<FakeRuntime>,
  pub registry: Arc<FakeRegistry>,
  pub orchestrator: Arc<FakeOrchestrator>,
  pub reporter: Arc<RecordingReporter>,
}

#[derive(Default)]
pub struct Setup {
  pub runtime: FakeRuntime,
  pub registry: FakeRegistry,
  pub orchestrator: FakeOrchestrator,
  pub vcs: FakeVcs,
}

impl Setup {
  pub fn engine(self) -> (StackEngine, Fakes) {
    self.engine_with_store(Arc::new(MemoryStore::new()))
  }

  pub fn engine_with_store(self, store: Arc<dyn StackStore>) -> (StackEngine, Fakes) {
    let fakes = Fakes {
      runtime: Arc::new(self.runtime),
      registry: Arc::new(self.registry),
      orchestrator: Arc::new(self.orchestrator),
      reporter: Arc::new(RecordingReporter::default()),
    };

    let backends = Backends {
      runtime: fakes.runtime.clone(),
      registry: fakes.registry.clone(),
      orchestrator: fakes.orchestrator.clone(),
      vcs: Arc::new(self.vcs),
      store,
    };

    let mut base = ScopeVariables::new();
    base.insert("vcs.username", "octocat");

    let engine = StackEngine::with_backends(backends, base).with_reporter(fakes.reporter.clone());
    (engine, fakes)
  }
}

pub fn buildable(id: &str, ports: &[(&str, u16)]) -> Component {
  Component {
    id: id.to_string(),
    name: id.to_string(),
    version: "1.0".to_string(),
    kind: ComponentKind::Api,
    build: Some(BuildDescriptor {
      dockerfile: "Dockerfile".to_string(),
      context: id.to_string(),
    }),
    env: BTreeMap::new(),
    ports: ports.iter().map(|(l, p)| (l.to_string(), *p)).collect(),
    head: false,
  }
}

pub fn external(id: &str, image: &str) -> Component {
  Component {
    id: id.to_string(),
    name: image.to_string(),
    version: "16".to_string(),
    kind: ComponentKind::Datastore,
    build: None,
    env: BTreeMap::new(),
    ports: BTreeMap::new(),
    head: false,
  }
}
