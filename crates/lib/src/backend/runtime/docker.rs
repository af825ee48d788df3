use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{Artifact, BuildOutput, BuildRequest, ContainerRuntime, LogSink, RuntimeError};
use crate::config::DockerConfig;
use crate::util::process;

/// Runtime backed by the `docker` CLI.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
  config: DockerConfig,
}

impl DockerRuntime {
  pub fn new(config: DockerConfig) -> Self {
    Self { config }
  }

  async fn docker(&self, args: Vec<String>) -> Result<String, RuntimeError> {
    let out = process::run(&self.config.binary, &args, &self.config.envs(), None).await?;
    Ok(out.stdout)
  }
}

/// Arguments for `docker build`.
pub(crate) fn build_args(request: &BuildRequest) -> Vec<String> {
  let mut args = vec![
    "build".to_string(),
    "--quiet".to_string(),
    "-t".to_string(),
    request.reference.clone(),
    "-f".to_string(),
    request.dockerfile.display().to_string(),
  ];

  for (key, value) in &request.labels {
    args.push("--label".to_string());
    args.push(format!("{}={}", key, value));
  }
  for (key, value) in &request.build_args {
    args.push("--build-arg".to_string());
    args.push(format!("{}={}", key, value));
  }

  args.push(request.context.display().to_string());
  args
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectedImage {
  id: String,
  #[serde(default)]
  repo_tags: Option<Vec<String>>,
  #[serde(default)]
  created: String,
  #[serde(default)]
  size: u64,
  #[serde(default)]
  config: Option<InspectedConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectedConfig {
  #[serde(default)]
  labels: Option<BTreeMap<String, String>>,
}

/// Decode the JSON array printed by `docker image inspect`.
pub(crate) fn parse_inspect(output: &str) -> Result<Vec<Artifact>, RuntimeError> {
  let images: Vec<InspectedImage> = serde_json::from_str(output)?;
  Ok(
    images
      .into_iter()
      .map(|img| Artifact {
        id: img.id,
        tags: img.repo_tags.unwrap_or_default(),
        labels: img.config.and_then(|c| c.labels).unwrap_or_default(),
        created: img.created,
        size: img.size,
      })
      .collect(),
  )
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
  fn id(&self) -> &str {
    "docker"
  }

  async fn build_image(&self, request: &BuildRequest) -> Result<BuildOutput, RuntimeError> {
    info!(image = %request.reference, context = %request.context.display(), "building image");
    let image_id = self.docker(build_args(request)).await?;
    debug!(image = %request.reference, id = %image_id, "image built");

    Ok(BuildOutput {
      image_id: (!image_id.is_empty()).then(|| image_id.clone()),
      log: image_id,
    })
  }

  async fn push_image(&self, reference: &str) -> Result<(), RuntimeError> {
    info!(image = %reference, "pushing image");
    self.docker(vec!["push".to_string(), reference.to_string()]).await?;
    Ok(())
  }

  async fn logs(&self, container: &str, stdout: LogSink<'_>, stderr: LogSink<'_>) -> Result<(), RuntimeError> {
    let args = vec!["logs".to_string(), container.to_string()];
    process::stream(&self.config.binary, &args, &self.config.envs(), stdout, stderr).await?;
    Ok(())
  }

  async fn list_images(&self, label: &str) -> Result<Vec<Artifact>, RuntimeError> {
    let ids = self
      .docker(vec![
        "image".to_string(),
        "ls".to_string(),
        "--quiet".to_string(),
        "--no-trunc".to_string(),
        "--filter".to_string(),
        format!("label={}", label),
      ])
      .await?;

    let mut ids: Vec<String> = ids.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect();
    ids.dedup();
    if ids.is_empty() {
      return Ok(Vec::new());
    }

    let mut args = vec!["image".to_string(), "inspect".to_string()];
    args.extend(ids);
    parse_inspect(&self.docker(args).await?)
  }

  async fn stop(&self, container: &str) -> Result<(), RuntimeError> {
    info!(container = %container, "stopping container");
    self.docker(vec!["stop".to_string(), container.to_string()]).await?;
    Ok(())
  }
}
