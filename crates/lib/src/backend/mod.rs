//! Pluggable backends and the provider registry that constructs them.
//!
//! Each backend kind has a [`Providers`] table mapping provider ids (the
//! `provider` key of the matching config section) to constructors. Unknown ids
//! fail at construction with [`ConfigError::UnknownProvider`]; there is no
//! fallback provider.

pub mod orchestrator;
pub mod registry;
pub mod runtime;
pub mod store;
pub mod vcs;

use std::sync::Arc;

use tracing::debug;

use crate::config::{ConfigError, EngineConfig};

use orchestrator::{DockerOrchestrator, NomadOrchestrator, Orchestrator};
use registry::{DockerRegistry, Registry};
use runtime::{ContainerRuntime, DockerRuntime};
use store::{FileStore, MemoryStore, StackStore};
use vcs::{GitVcs, Vcs};

pub type Constructor<T> = fn(&EngineConfig) -> Result<Arc<T>, ConfigError>;

/// Provider table for one backend kind.
pub struct Providers<T: ?Sized> {
  kind: &'static str,
  entries: Vec<(&'static str, Constructor<T>)>,
}

impl<T: ?Sized> Providers<T> {
  pub fn new(kind: &'static str) -> Self {
    Self {
      kind,
      entries: Vec::new(),
    }
  }

  /// Add a provider, replacing any existing one with the same id.
  pub fn register(mut self, id: &'static str, constructor: Constructor<T>) -> Self {
    self.entries.retain(|(existing, _)| *existing != id);
    self.entries.push((id, constructor));
    self
  }

  pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.entries.iter().map(|(id, _)| *id)
  }

  pub fn build(&self, id: &str, config: &EngineConfig) -> Result<Arc<T>, ConfigError> {
    let constructor = self
      .entries
      .iter()
      .find(|(known, _)| *known == id)
      .map(|(_, ctor)| ctor)
      .ok_or_else(|| ConfigError::UnknownProvider {
        kind: self.kind.to_string(),
        id: id.to_string(),
        available: self.ids().collect::<Vec<_>>().join(", "),
      })?;

    debug!(kind = self.kind, provider = id, "constructing backend");
    constructor(config)
  }
}

pub fn runtimes() -> Providers<dyn ContainerRuntime> {
  Providers::<dyn ContainerRuntime>::new("runtime").register("docker", |config| {
    Ok(Arc::new(DockerRuntime::new(config.runtime.docker.clone())))
  })
}

pub fn registries() -> Providers<dyn Registry> {
  Providers::<dyn Registry>::new("registry").register("docker", |config| {
    Ok(Arc::new(DockerRegistry::new(config.registry.clone())))
  })
}

pub fn orchestrators() -> Providers<dyn Orchestrator> {
  Providers::<dyn Orchestrator>::new("orchestrator")
    .register("docker", |config| {
      Ok(Arc::new(DockerOrchestrator::new(config.runtime.docker.clone())))
    })
    .register("nomad", |config| {
      let nomad = config
        .orchestrator
        .nomad
        .clone()
        .ok_or_else(|| ConfigError::MissingSection {
          kind: "orchestrator".to_string(),
          provider: "nomad".to_string(),
          section: "orchestrator.nomad".to_string(),
        })?;
      Ok(Arc::new(NomadOrchestrator::new(nomad)))
    })
}

pub fn vcs_providers() -> Providers<dyn Vcs> {
  Providers::<dyn Vcs>::new("vcs").register("git", |config| Ok(Arc::new(GitVcs::new(config.vcs.clone()))))
}

pub fn stores() -> Providers<dyn StackStore> {
  Providers::<dyn StackStore>::new("store")
    .register("file", |config| Ok(Arc::new(FileStore::new(config.store.root()))))
    .register("memory", |_| Ok(Arc::new(MemoryStore::new())))
}

/// The backend handles owned by one engine.
#[derive(Clone)]
pub struct Backends {
  pub runtime: Arc<dyn ContainerRuntime>,
  pub registry: Arc<dyn Registry>,
  pub orchestrator: Arc<dyn Orchestrator>,
  pub vcs: Arc<dyn Vcs>,
  pub store: Arc<dyn StackStore>,
}

impl Backends {
  /// Validate `config` and construct every selected provider.
  pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
    config.validate()?;

    Ok(Self {
      runtime: runtimes().build(&config.runtime.provider, config)?,
      registry: registries().build(&config.registry.provider, config)?,
      orchestrator: orchestrators().build(&config.orchestrator.provider, config)?,
      vcs: vcs_providers().build(&config.vcs.provider, config)?,
      store: stores().build(&config.store.provider, config)?,
    })
  }
}

impl std::fmt::Debug for Backends {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Backends")
      .field("runtime", &self.runtime.id())
      .field("registry", &self.registry.id())
      .field("orchestrator", &self.orchestrator.id())
      .field("vcs", &self.vcs.id())
      .field("store", &self.store.id())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::NomadConfig;

  #[test]
  fn unknown_provider_is_rejected() {
    let mut config = EngineConfig::default();
    config.orchestrator.provider = "kubernetes".to_string();

    let err = Backends::from_config(&config).unwrap_err();
    match err {
      ConfigError::UnknownProvider { kind, id, available } => {
        assert_eq!(kind, "orchestrator");
        assert_eq!(id, "kubernetes");
        assert_eq!(available, "docker, nomad");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn builds_selected_providers() {
    let mut config = EngineConfig::default();
    config.orchestrator.provider = "nomad".to_string();
    config.orchestrator.nomad = Some(NomadConfig {
      addr: "http://127.0.0.1:4646".to_string(),
      region: None,
      datacenters: vec!["dc1".to_string()],
      token: None,
    });
    config.store.provider = "memory".to_string();

    let backends = Backends::from_config(&config).unwrap();
    assert_eq!(backends.orchestrator.id(), "nomad");
    assert_eq!(backends.store.id(), "memory");
    assert_eq!(backends.runtime.id(), "docker");
  }

  #[test]
  fn register_replaces_existing_id() {
    let providers = stores().register("file", |_| Ok(Arc::new(MemoryStore::new())));
    assert_eq!(providers.ids().collect::<Vec<_>>(), vec!["memory", "file"]);
    let store = providers.build("file", &EngineConfig::default()).unwrap();
    assert_eq!(store.id(), "memory");
  }
}
