//! Engine configuration.
//!
//! Each backend has its own typed section; unknown keys are rejected when the
//! file is parsed and missing provider sections are rejected by
//! [`EngineConfig::validate`], before any backend is constructed.
//!
//! ```toml
//! [runtime]
//! provider = "docker"
//!
//! [registry]
//! provider = "docker"
//! addr = "registry.internal:5000"
//!
//! [orchestrator]
//! provider = "nomad"
//!
//! [orchestrator.nomad]
//! addr = "http://nomad.internal:4646"
//! datacenters = ["dc1"]
//!
//! [vcs]
//! provider = "git"
//! username = "octocat"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::VCS_SCOPE_PREFIX;
use crate::platform::paths;
use crate::scope::ScopeVariables;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("unknown {kind} provider '{id}' (available: {available})")]
  UnknownProvider { kind: String, id: String, available: String },

  #[error("{provider} {kind} requires a [{section}] section")]
  MissingSection {
    kind: String,
    provider: String,
    section: String,
  },

  #[error("invalid {field}: {reason}")]
  Invalid { field: String, reason: String },
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
  pub runtime: RuntimeConfig,
  pub registry: RegistryConfig,
  pub orchestrator: OrchestratorConfig,
  pub vcs: VcsConfig,
  pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
  pub provider: String,
  pub docker: DockerConfig,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      provider: "docker".to_string(),
      docker: DockerConfig::default(),
    }
  }
}

/// Settings for backends that drive the docker CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerConfig {
  /// Path or name of the docker binary.
  pub binary: String,
  /// Value for `DOCKER_HOST`, if not the local daemon.
  pub host: Option<String>,
}

impl Default for DockerConfig {
  fn default() -> Self {
    Self {
      binary: "docker".to_string(),
      host: None,
    }
  }
}

impl DockerConfig {
  /// Environment passed to every docker invocation.
  pub fn envs(&self) -> Vec<(String, String)> {
    match &self.host {
      Some(host) => vec![("DOCKER_HOST".to_string(), host.clone())],
      None => Vec::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
  pub provider: String,
  /// Registry host and optional port, e.g. `localhost:5000`.
  pub addr: String,
  /// Use plain HTTP for the registry API.
  pub insecure: bool,
  /// Optional path prefix prepended to every image name.
  pub namespace: Option<String>,
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      provider: "docker".to_string(),
      addr: "localhost:5000".to_string(),
      insecure: true,
      namespace: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
  pub provider: String,
  pub nomad: Option<NomadConfig>,
}

impl Default for OrchestratorConfig {
  fn default() -> Self {
    Self {
      provider: "docker".to_string(),
      nomad: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NomadConfig {
  /// Nomad HTTP API address, e.g. `http://127.0.0.1:4646`.
  pub addr: String,
  #[serde(default)]
  pub region: Option<String>,
  #[serde(default = "default_datacenters")]
  pub datacenters: Vec<String>,
  #[serde(default)]
  pub token: Option<String>,
}

fn default_datacenters() -> Vec<String> {
  vec!["dc1".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VcsConfig {
  pub provider: String,
  pub username: Option<String>,
  /// Remote address, e.g. `github.com`.
  pub addr: Option<String>,
  /// Path or name of the git binary.
  pub binary: String,
}

impl Default for VcsConfig {
  fn default() -> Self {
    Self {
      provider: "git".to_string(),
      username: None,
      addr: None,
      binary: "git".to_string(),
    }
  }
}

impl VcsConfig {
  /// Scope variables exposed under the `vcs.` namespace.
  pub fn scope_vars(&self) -> ScopeVariables {
    let mut vars = ScopeVariables::new();
    vars.insert(format!("{}.id", VCS_SCOPE_PREFIX), self.provider.as_str());
    if let Some(username) = &self.username {
      vars.insert(format!("{}.username", VCS_SCOPE_PREFIX), username.as_str());
    }
    if let Some(addr) = &self.addr {
      vars.insert(format!("{}.addr", VCS_SCOPE_PREFIX), addr.as_str());
    }
    vars
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
  pub provider: String,
  /// Root directory for the file store. Defaults to the data directory.
  pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      provider: "file".to_string(),
      path: None,
    }
  }
}

impl StoreConfig {
  pub fn root(&self) -> PathBuf {
    self.path.clone().unwrap_or_else(paths::data_dir)
  }
}

impl EngineConfig {
  /// Parse a config document.
  pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(content)?)
  }

  /// Load, apply environment overrides and validate.
  ///
  /// A missing file yields the defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let mut config = match std::fs::read_to_string(path) {
      Ok(content) => Self::from_toml(&content)?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "config file not found, using defaults");
        Self::default()
      }
      Err(source) => {
        return Err(ConfigError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    config.apply_env();
    config.validate()?;
    Ok(config)
  }

  /// Load from the default location.
  pub fn load_default() -> Result<Self, ConfigError> {
    Self::load(&paths::config_file())
  }

  /// Fill unset nomad settings from `NOMAD_ADDR` / `NOMAD_TOKEN`.
  pub fn apply_env(&mut self) {
    if self.orchestrator.provider != "nomad" {
      return;
    }

    let env_addr = std::env::var("NOMAD_ADDR").ok();
    let env_token = std::env::var("NOMAD_TOKEN").ok();

    match &mut self.orchestrator.nomad {
      Some(nomad) => {
        if nomad.token.is_none() {
          nomad.token = env_token;
        }
      }
      None => {
        if let Some(addr) = env_addr {
          self.orchestrator.nomad = Some(NomadConfig {
            addr,
            region: None,
            datacenters: default_datacenters(),
            token: env_token,
          });
        }
      }
    }
  }

  /// Check the sections required by the selected providers.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.runtime.docker.binary.trim().is_empty() {
      return Err(invalid("runtime.docker.binary", "must not be empty"));
    }

    if self.registry.addr.trim().is_empty() {
      return Err(invalid("registry.addr", "must not be empty"));
    }
    if self.registry.addr.contains("://") {
      return Err(invalid("registry.addr", "must be host[:port] without a scheme"));
    }

    if self.orchestrator.provider == "nomad" {
      let nomad = self
        .orchestrator
        .nomad
        .as_ref()
        .ok_or_else(|| ConfigError::MissingSection {
          kind: "orchestrator".to_string(),
          provider: "nomad".to_string(),
          section: "orchestrator.nomad".to_string(),
        })?;
      if !(nomad.addr.starts_with("http://") || nomad.addr.starts_with("https://")) {
        return Err(invalid("orchestrator.nomad.addr", "must start with http:// or https://"));
      }
      if nomad.datacenters.is_empty() {
        return Err(invalid("orchestrator.nomad.datacenters", "must list at least one datacenter"));
      }
    }

    if self.vcs.binary.trim().is_empty() {
      return Err(invalid("vcs.binary", "must not be empty"));
    }

    Ok(())
  }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
  ConfigError::Invalid {
    field: field.to_string(),
    reason: reason.to_string(),
  }
}
