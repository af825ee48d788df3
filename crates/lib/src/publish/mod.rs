//! Artifact publishing.
//!
//! Pushes each buildable component's image to the registry. Failures are
//! recorded per component and never stop the remaining pushes.

mod gate;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info};

use crate::backend::registry::Registry;
use crate::backend::runtime::ContainerRuntime;
use crate::build::duration_text;
use crate::stack::Stack;

pub use gate::{GateDecision, WorktreeGate, decide};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishResult {
  pub reference: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublishReport {
  pub components: BTreeMap<String, PublishResult>,
  #[serde(with = "duration_text")]
  pub elapsed: Duration,
}

impl PublishReport {
  pub fn succeeded(&self) -> bool {
    self.components.values().all(|r| r.error.is_none())
  }

  pub fn failed(&self) -> impl Iterator<Item = (&String, &PublishResult)> {
    self.components.iter().filter(|(_, r)| r.error.is_some())
  }
}

/// `<registry image name>:<version>` for a component of `stack`.
pub fn image_reference(registry: &dyn Registry, stack: &Stack, component_id: &str, version: &str) -> String {
  format!("{}:{}", registry.image_name(&stack.artifact_name(component_id)), version)
}

pub struct Publisher {
  runtime: Arc<dyn ContainerRuntime>,
  registry: Arc<dyn Registry>,
}

impl Publisher {
  pub fn new(runtime: Arc<dyn ContainerRuntime>, registry: Arc<dyn Registry>) -> Self {
    Self { runtime, registry }
  }

  pub async fn publish(&self, stack: &Stack) -> PublishReport {
    let start = Instant::now();
    let mut report = PublishReport::default();

    for component in stack.buildable() {
      let reference = image_reference(self.registry.as_ref(), stack, &component.id, &component.version);
      info!(component = %component.id, image = %reference, "publishing artifact");

      let result = self.registry.push(self.runtime.as_ref(), &reference).await;
      if let Err(e) = &result {
        error!(component = %component.id, error = %e, "publish failed");
      }

      report.components.insert(
        component.id.clone(),
        PublishResult {
          reference,
          error: result.err().map(|e| e.to_string()),
        },
      );
    }

    report.elapsed = start.elapsed();
    report
  }
}
