use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::{ManifestInfo, Registry, RegistryError};
use crate::backend::runtime::ContainerRuntime;
use crate::config::RegistryConfig;

const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.v2+json, \
  application/vnd.docker.distribution.manifest.list.v2+json, \
  application/vnd.oci.image.manifest.v1+json, \
  application/vnd.oci.image.index.v1+json";

/// Docker Registry HTTP API v2 client.
#[derive(Debug, Clone)]
pub struct DockerRegistry {
  config: RegistryConfig,
  client: reqwest::Client,
}

impl DockerRegistry {
  pub fn new(config: RegistryConfig) -> Self {
    Self {
      config,
      client: reqwest::Client::new(),
    }
  }

  fn repository(&self, name: &str) -> String {
    match &self.config.namespace {
      Some(ns) if !ns.is_empty() => format!("{}/{}", ns.trim_matches('/'), name),
      _ => name.to_string(),
    }
  }

  fn base_url(&self) -> String {
    let scheme = if self.config.insecure { "http" } else { "https" };
    format!("{}://{}", scheme, self.config.addr)
  }
}

#[async_trait]
impl Registry for DockerRegistry {
  fn id(&self) -> &str {
    "docker"
  }

  fn image_name(&self, name: &str) -> String {
    format!("{}/{}", self.config.addr, self.repository(name))
  }

  async fn get_manifest(&self, name: &str, tag: &str) -> Result<ManifestInfo, RegistryError> {
    let url = format!("{}/v2/{}/manifests/{}", self.base_url(), self.repository(name), tag);
    debug!(url = %url, "fetching manifest");

    let response = self
      .client
      .get(&url)
      .header(reqwest::header::ACCEPT, MANIFEST_ACCEPT)
      .send()
      .await
      .map_err(|source| RegistryError::Http { url: url.clone(), source })?;

    match response.status() {
      status if status.is_success() => {
        let header = |key: &str| {
          response
            .headers()
            .get(key)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
        };
        Ok(ManifestInfo {
          digest: header("docker-content-digest"),
          media_type: header("content-type"),
        })
      }
      StatusCode::NOT_FOUND => Err(RegistryError::ManifestNotFound {
        name: self.image_name(name),
        tag: tag.to_string(),
      }),
      status => Err(RegistryError::Status {
        url,
        status: status.as_u16(),
      }),
    }
  }

  async fn push(&self, runtime: &dyn ContainerRuntime, reference: &str) -> Result<(), RegistryError> {
    runtime.push_image(reference).await?;
    Ok(())
  }
}
