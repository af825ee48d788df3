//! Concurrent component builds.
//!
//! Every buildable component is built in its own task; a failed build never
//! prevents its siblings from being attempted. The joining task is the only
//! writer of the [`BuildReport`].

mod report;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::backend::runtime::{BuildRequest, ContainerRuntime};
use crate::consts::{COMPONENT_LABEL, STACK_LABEL};
use crate::stack::{Component, Stack};

pub use report::{BuildReport, ComponentBuild};
pub(crate) use report::duration_text;

#[derive(Debug, Error)]
#[error("component '{component}' is not buildable")]
pub struct NotBuildable {
  pub component: String,
}

/// Build request for `component`, tagged as `reference`, with paths relative
/// to `workdir`.
pub fn build_request(
  stack: &Stack,
  component: &Component,
  reference: String,
  workdir: &Path,
) -> Result<BuildRequest, NotBuildable> {
  let descriptor = component.build.as_ref().ok_or_else(|| NotBuildable {
    component: component.id.clone(),
  })?;

  let context = workdir.join(&descriptor.context);
  Ok(BuildRequest {
    reference,
    dockerfile: context.join(&descriptor.dockerfile),
    context,
    labels: BTreeMap::from([
      (STACK_LABEL.to_string(), stack.id.clone()),
      (COMPONENT_LABEL.to_string(), component.id.clone()),
    ]),
    build_args: component.env.clone(),
  })
}

pub struct ComponentBuilder {
  runtime: Arc<dyn ContainerRuntime>,
  parallelism: Option<usize>,
}

impl ComponentBuilder {
  pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
    Self {
      runtime,
      parallelism: None,
    }
  }

  /// Cap concurrent builds. Defaults to one task per component.
  pub fn with_parallelism(mut self, parallelism: Option<usize>) -> Self {
    self.parallelism = parallelism.filter(|n| *n > 0);
    self
  }

  /// Build every request, keyed by component id, and wait for all of them.
  pub async fn build(&self, requests: BTreeMap<String, BuildRequest>) -> BuildReport {
    let start = Instant::now();
    info!(components = requests.len(), "starting component builds");

    let semaphore = Arc::new(Semaphore::new(self.parallelism.unwrap_or(requests.len()).max(1)));
    let mut pending: BTreeMap<String, String> = BTreeMap::new();
    let mut join_set = JoinSet::new();

    for (component, request) in requests {
      pending.insert(component.clone(), request.reference.clone());
      let runtime = self.runtime.clone();
      let semaphore = semaphore.clone();

      join_set.spawn(async move {
        let Ok(_permit) = semaphore.acquire_owned().await else {
          return (component, request.reference, Err("build scheduler closed".to_string()), Duration::ZERO);
        };

        let started = Instant::now();
        let result = runtime.build_image(&request).await.map(|_| ()).map_err(|e| e.to_string());
        (component, request.reference, result, started.elapsed())
      });
    }

    let mut report = BuildReport::default();

    while let Some(joined) = join_set.join_next().await {
      match joined {
        Ok((component, image, result, duration)) => {
          match &result {
            Ok(()) => info!(component = %component, duration = ?duration, "build succeeded"),
            Err(e) => error!(component = %component, error = %e, "build failed"),
          }
          pending.remove(&component);
          report.components.insert(
            component,
            ComponentBuild {
              image,
              error: result.err(),
              duration,
            },
          );
        }
        Err(e) => {
          error!(error = %e, "build task panicked");
        }
      }
    }

    // Tasks that never reported back count as failures.
    for (component, image) in pending {
      report.components.insert(
        component,
        ComponentBuild {
          image,
          error: Some("build task did not complete".to_string()),
          duration: Duration::ZERO,
        },
      );
    }

    report.elapsed = start.elapsed();
    debug!(
      succeeded = report.succeeded(),
      elapsed = ?report.elapsed,
      "component builds complete"
    );
    report
  }
}
