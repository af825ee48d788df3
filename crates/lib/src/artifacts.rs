//! Pre-deploy artifact existence checks.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::registry::Registry;
use crate::stack::Stack;

pub use crate::backend::runtime::Artifact;

/// Registry status of one buildable component's artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactStatus {
  pub component: String,
  /// `<image name>:<version>`.
  pub artifact: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArtifactReport {
  pub entries: Vec<ArtifactStatus>,
}

impl ArtifactReport {
  pub fn missing(&self) -> impl Iterator<Item = &ArtifactStatus> {
    self.entries.iter().filter(|e| e.error.is_some())
  }

  pub fn is_complete(&self) -> bool {
    self.missing().next().is_none()
  }
}

impl fmt::Display for ArtifactReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let width = self
      .entries
      .iter()
      .map(|e| e.artifact.len())
      .max()
      .unwrap_or(0)
      .max("Artifact".len());

    writeln!(f, " {:<width$}  Status", "Artifact")?;
    writeln!(f, " {:<width$}  ------", "--------")?;
    for entry in &self.entries {
      let status = entry.error.as_deref().unwrap_or("ok");
      writeln!(f, " {:<width$}  {}", entry.artifact, status)?;
    }
    Ok(())
  }
}

pub struct ArtifactChecker {
  registry: Arc<dyn Registry>,
}

impl ArtifactChecker {
  pub fn new(registry: Arc<dyn Registry>) -> Self {
    Self { registry }
  }

  /// Look up every buildable component's manifest.
  ///
  /// Sets each buildable component's `name` to the registry's canonical
  /// image name. Non-buildable components are neither checked nor renamed.
  pub async fn check(&self, stack: &mut Stack) -> ArtifactReport {
    let mut report = ArtifactReport::default();

    let logical: Vec<(String, String)> = stack
      .buildable()
      .map(|c| (c.id.clone(), stack.artifact_name(&c.id)))
      .collect();

    for (id, logical) in logical {
      let Some(component) = stack.components.get_mut(&id) else {
        continue;
      };

      let result = self.registry.get_manifest(&logical, &component.version).await;
      component.name = self.registry.image_name(&logical);

      let artifact = format!("{}:{}", component.name, component.version);
      match &result {
        Ok(_) => debug!(artifact = %artifact, "artifact present"),
        Err(e) => warn!(artifact = %artifact, error = %e, "artifact missing"),
      }

      report.entries.push(ArtifactStatus {
        component: id,
        artifact,
        error: result.err().map(|e| e.to_string()),
      });
    }

    report
  }
}
