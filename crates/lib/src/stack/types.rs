use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Declared role of a component within its stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
  #[default]
  Api,
  Web,
  Datastore,
  Cache,
  Worker,
  Batch,
}

impl ComponentKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ComponentKind::Api => "api",
      ComponentKind::Web => "web",
      ComponentKind::Datastore => "datastore",
      ComponentKind::Cache => "cache",
      ComponentKind::Worker => "worker",
      ComponentKind::Batch => "batch",
    }
  }
}

impl std::fmt::Display for ComponentKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// How to build a component's image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDescriptor {
  /// Dockerfile path, relative to the build context.
  pub dockerfile: String,
  /// Build context directory.
  #[serde(default = "default_context")]
  pub context: String,
}

fn default_context() -> String {
  ".".to_string()
}

/// One deployable unit of a stack.
///
/// Components with a [`BuildDescriptor`] produce an artifact; the rest
/// reference an existing image by `name` and are skipped by build, publish
/// and artifact checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
  #[serde(default)]
  pub id: String,
  /// Image name. For buildable components this is normalized to the
  /// registry's canonical image name before deploy.
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub version: String,
  #[serde(rename = "type", default)]
  pub kind: ComponentKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub build: Option<BuildDescriptor>,
  /// Environment variables. Values are raw expressions until evaluated.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
  /// Port label -> port number.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub ports: BTreeMap<String, u16>,
  /// Marks the primary component of the stack.
  #[serde(default)]
  pub head: bool,
}

impl Component {
  /// Returns true if this component produces an artifact.
  pub fn is_buildable(&self) -> bool {
    self.build.is_some()
  }

  pub fn has_env_vars(&self) -> bool {
    !self.env.is_empty()
  }

  /// Image reference used when running the component.
  pub fn image(&self) -> String {
    if self.version.is_empty() {
      self.name.clone()
    } else {
      format!("{}:{}", self.name, self.version)
    }
  }
}

/// A named collection of components describing one deployable application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
  pub id: String,
  #[serde(default)]
  pub version: String,
  #[serde(default)]
  pub components: BTreeMap<String, Component>,
}

impl Stack {
  pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      version: version.into(),
      components: BTreeMap::new(),
    }
  }

  /// Add a component keyed by its id, replacing any previous one.
  pub fn with_component(mut self, component: Component) -> Self {
    self.components.insert(component.id.clone(), component);
    self
  }

  /// Logical artifact name for a component: `<stack>/<component>`.
  pub fn artifact_name(&self, component_id: &str) -> String {
    format!("{}/{}", self.id, component_id)
  }

  /// Runtime instance name for a component: `<component>.<stack>`.
  pub fn container_name(&self, component_id: &str) -> String {
    format!("{}.{}", component_id, self.id)
  }

  pub fn buildable(&self) -> impl Iterator<Item = &Component> {
    self.components.values().filter(|c| c.is_buildable())
  }

  /// Fill empty component ids from their map keys.
  pub fn normalize_ids(&mut self) {
    for (key, component) in self.components.iter_mut() {
      if component.id.is_empty() {
        component.id = key.clone();
      }
    }
  }
}
