//! Single-host orchestrator on top of the docker CLI.
//!
//! Every component runs as a container named `<component>.<stack>` attached
//! to a user network named after the stack, so the scope addresses resolve
//! through docker's embedded DNS.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ComponentStatus, DeployOptions, Deployment, Orchestrator, OrchestratorError};
use crate::action::ActionResult;
use crate::config::DockerConfig;
use crate::consts::{COMPONENT_LABEL, STACK_LABEL};
use crate::stack::Stack;
use crate::util::process::{self, ProcessError};

/// What a deploy will create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockerPlan {
  pub network: String,
  pub containers: Vec<RunSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
  pub name: String,
  pub image: String,
  pub env: BTreeMap<String, String>,
  pub labels: BTreeMap<String, String>,
}

impl RunSpec {
  fn args(&self, network: &str) -> Vec<String> {
    let mut args = vec![
      "run".to_string(),
      "--detach".to_string(),
      "--name".to_string(),
      self.name.clone(),
      "--network".to_string(),
      network.to_string(),
      "--network-alias".to_string(),
      self.name.clone(),
    ];
    for (key, value) in &self.labels {
      args.push("--label".to_string());
      args.push(format!("{}={}", key, value));
    }
    for (key, value) in &self.env {
      args.push("--env".to_string());
      args.push(format!("{}={}", key, value));
    }
    args.push(self.image.clone());
    args
  }
}

#[derive(Debug, Clone)]
pub struct DockerOrchestrator {
  config: DockerConfig,
}

impl DockerOrchestrator {
  pub fn new(config: DockerConfig) -> Self {
    Self { config }
  }

  pub fn plan(&self, stack: &Stack) -> DockerPlan {
    DockerPlan {
      network: stack.id.clone(),
      containers: stack
        .components
        .values()
        .map(|c| RunSpec {
          name: stack.container_name(&c.id),
          image: c.image(),
          env: c.env.clone(),
          labels: BTreeMap::from([
            (STACK_LABEL.to_string(), stack.id.clone()),
            (COMPONENT_LABEL.to_string(), c.id.clone()),
          ]),
        })
        .collect(),
    }
  }

  async fn docker(&self, args: Vec<String>) -> Result<String, ProcessError> {
    let out = process::run(&self.config.binary, &args, &self.config.envs(), None).await?;
    Ok(out.stdout)
  }

  async fn ensure_network(&self, network: &str) -> Result<(), ProcessError> {
    let inspect = self
      .docker(vec!["network".to_string(), "inspect".to_string(), network.to_string()])
      .await;
    if inspect.is_ok() {
      debug!(network = %network, "network exists");
      return Ok(());
    }
    self
      .docker(vec!["network".to_string(), "create".to_string(), network.to_string()])
      .await?;
    Ok(())
  }

  async fn remove(&self, container: &str) -> Result<String, ProcessError> {
    self
      .docker(vec!["rm".to_string(), "--force".to_string(), container.to_string()])
      .await
  }
}

#[async_trait]
impl Orchestrator for DockerOrchestrator {
  fn id(&self) -> &str {
    "docker"
  }

  async fn deploy(&self, stack: &Stack, options: &DeployOptions) -> Result<Deployment, OrchestratorError> {
    let plan = self.plan(stack);
    let job = serde_json::to_value(&plan)?;

    if options.dryrun {
      return Ok(Deployment {
        response: serde_json::Value::Null,
        job,
      });
    }

    info!(stack = %stack.id, network = %plan.network, "deploying containers");
    self.ensure_network(&plan.network).await?;

    let mut started = serde_json::Map::new();
    for spec in &plan.containers {
      // Replace any previous instance so deploys converge.
      let _ = self.remove(&spec.name).await;
      let id = self.docker(spec.args(&plan.network)).await?;
      debug!(container = %spec.name, id = %id, "container started");
      started.insert(spec.name.clone(), serde_json::Value::String(id));
    }

    Ok(Deployment {
      response: serde_json::Value::Object(started),
      job,
    })
  }

  async fn destroy(&self, stack: &Stack) -> Vec<ActionResult> {
    let mut results = Vec::with_capacity(stack.components.len() + 1);

    for id in stack.components.keys() {
      let name = stack.container_name(id);
      let result = self.remove(&name).await;
      if let Err(e) = &result {
        warn!(container = %name, error = %e, "failed to remove container");
      }
      results.push(ActionResult::new(id, "destroy").with_result(&result));
    }

    let result = self
      .docker(vec!["network".to_string(), "rm".to_string(), stack.id.clone()])
      .await;
    if let Err(e) = &result {
      warn!(network = %stack.id, error = %e, "failed to remove network");
    }
    results.push(ActionResult::new(format!("network/{}", stack.id), "destroy").with_result(&result));

    results
  }

  async fn status(&self, stack: &Stack) -> Result<Vec<ComponentStatus>, OrchestratorError> {
    let mut statuses = Vec::with_capacity(stack.components.len());

    for id in stack.components.keys() {
      let name = stack.container_name(id);
      let inspect = self
        .docker(vec![
          "inspect".to_string(),
          "--format".to_string(),
          "{{.State.Status}}".to_string(),
          name,
        ])
        .await;

      statuses.push(match inspect {
        Ok(state) => ComponentStatus {
          id: id.clone(),
          status: state,
          details: None,
        },
        Err(e) => ComponentStatus {
          id: id.clone(),
          status: "not running".to_string(),
          details: Some(e.to_string()),
        },
      });
    }

    Ok(statuses)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::stack::{Component, ComponentKind};

  fn stack() -> Stack {
    Stack::new("shop", "1.0").with_component(Component {
      id: "db".to_string(),
      name: "postgres".to_string(),
      version: "16".to_string(),
      kind: ComponentKind::Datastore,
      build: None,
      env: BTreeMap::from([("POSTGRES_PASSWORD".to_string(), "secret".to_string())]),
      ports: BTreeMap::from([("pg".to_string(), 5432)]),
      head: false,
    })
  }

  #[test]
  fn plan_names_containers_after_scope_addresses() {
    let plan = DockerOrchestrator::new(DockerConfig::default()).plan(&stack());
    assert_eq!(plan.network, "shop");
    assert_eq!(plan.containers[0].name, "db.shop");
    assert_eq!(plan.containers[0].image, "postgres:16");
    assert_eq!(plan.containers[0].labels.get("stack").map(String::as_str), Some("shop"));
  }

  #[test]
  fn run_args_attach_network_alias() {
    let plan = DockerOrchestrator::new(DockerConfig::default()).plan(&stack());
    let args = plan.containers[0].args(&plan.network);
    assert!(args.windows(2).any(|w| w[0] == "--network-alias" && w[1] == "db.shop"));
    assert!(args.windows(2).any(|w| w[0] == "--env" && w[1] == "POSTGRES_PASSWORD=secret"));
    assert_eq!(args.last().map(String::as_str), Some("postgres:16"));
  }

  #[tokio::test]
  async fn dry_run_does_not_invoke_docker() {
    let orch = DockerOrchestrator::new(DockerConfig {
      binary: "/nonexistent/docker".to_string(),
      host: None,
    });

    let deployment = orch.deploy(&stack(), &DeployOptions { dryrun: true }).await.unwrap();
    assert!(deployment.response.is_null());
    assert_eq!(deployment.job["containers"][0]["name"], "db.shop");
  }

  #[tokio::test]
  async fn destroy_reports_every_resource() {
    let orch = DockerOrchestrator::new(DockerConfig {
      binary: "/nonexistent/docker".to_string(),
      host: None,
    });

    let results = orch.destroy(&stack()).await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.succeeded()));
    assert_eq!(results[1].resource, "network/shop");
  }
}
