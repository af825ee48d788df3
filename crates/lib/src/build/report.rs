use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

/// Outcome of building one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentBuild {
  /// Image reference the build was tagged with.
  pub image: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(with = "duration_text")]
  pub duration: Duration,
}

impl ComponentBuild {
  pub fn succeeded(&self) -> bool {
    self.error.is_none()
  }
}

/// Per-component build outcomes plus aggregate timing.
///
/// Complete once the build phase has joined every task; never mutated after
/// it is handed back.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
  pub components: BTreeMap<String, ComponentBuild>,
  #[serde(with = "duration_text")]
  pub elapsed: Duration,
}

impl BuildReport {
  /// True only if every attempted build succeeded.
  pub fn succeeded(&self) -> bool {
    self.components.values().all(ComponentBuild::succeeded)
  }

  pub fn failed(&self) -> impl Iterator<Item = (&String, &ComponentBuild)> {
    self.components.iter().filter(|(_, b)| !b.succeeded())
  }

  pub fn len(&self) -> usize {
    self.components.len()
  }

  pub fn is_empty(&self) -> bool {
    self.components.is_empty()
  }
}

/// Serialize durations as humantime strings (`1m 2s 300ms`).
pub(crate) mod duration_text {
  use std::time::Duration;

  use serde::Serializer;

  pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    let rounded = Duration::from_millis(duration.as_millis() as u64);
    serializer.collect_str(&humantime::format_duration(rounded))
  }
}
