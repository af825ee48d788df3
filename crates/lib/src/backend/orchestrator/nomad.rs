//! Nomad HTTP API orchestrator.
//!
//! Each stack becomes one service job. Every component is a task group with a
//! single docker task; port labels become dynamic ports mapped to the
//! declared container port.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::{ComponentStatus, DeployOptions, Deployment, Orchestrator, OrchestratorError};
use crate::action::ActionResult;
use crate::config::NomadConfig;
use crate::stack::{Component, Stack};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Job {
  #[serde(rename = "ID")]
  pub id: String,
  pub name: String,
  #[serde(rename = "Type")]
  pub kind: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub region: Option<String>,
  pub datacenters: Vec<String>,
  pub meta: BTreeMap<String, String>,
  pub task_groups: Vec<TaskGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskGroup {
  pub name: String,
  pub count: u32,
  pub networks: Vec<Network>,
  pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Network {
  pub dynamic_ports: Vec<Port>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Port {
  pub label: String,
  pub to: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
  pub name: String,
  pub driver: String,
  pub config: serde_json::Value,
  pub env: BTreeMap<String, String>,
}

/// Orchestrator talking to a Nomad agent over HTTP.
#[derive(Debug, Clone)]
pub struct NomadOrchestrator {
  config: NomadConfig,
  client: reqwest::Client,
}

impl NomadOrchestrator {
  pub fn new(config: NomadConfig) -> Self {
    Self {
      config,
      client: reqwest::Client::new(),
    }
  }

  /// Translate a stack into a Nomad job.
  pub fn job(&self, stack: &Stack) -> Job {
    Job {
      id: stack.id.clone(),
      name: stack.id.clone(),
      kind: "service".to_string(),
      region: self.config.region.clone(),
      datacenters: self.config.datacenters.clone(),
      meta: BTreeMap::from([("stack-version".to_string(), stack.version.clone())]),
      task_groups: stack.components.values().map(task_group).collect(),
    }
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.addr.trim_end_matches('/'), path)
  }

  async fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<serde_json::Value>,
  ) -> Result<serde_json::Value, OrchestratorError> {
    let url = self.url(path);
    debug!(method = %method, url = %url, "nomad request");

    let mut request = self.client.request(method, &url);
    if let Some(token) = &self.config.token {
      request = request.header("X-Nomad-Token", token);
    }
    if let Some(body) = body {
      request = request.json(&body);
    }

    let response = request.send().await.map_err(|source| OrchestratorError::Http {
      url: url.clone(),
      source,
    })?;

    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|source| OrchestratorError::Http { url: url.clone(), source })?;

    if !status.is_success() {
      return Err(OrchestratorError::Status {
        url,
        status: status.as_u16(),
        body: text,
      });
    }

    if text.trim().is_empty() {
      return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
  }
}

fn task_group(component: &Component) -> TaskGroup {
  let labels: Vec<&String> = component.ports.keys().collect();

  TaskGroup {
    name: component.id.clone(),
    count: 1,
    networks: vec![Network {
      dynamic_ports: component
        .ports
        .iter()
        .map(|(label, port)| Port {
          label: label.clone(),
          to: *port,
        })
        .collect(),
    }],
    tasks: vec![Task {
      name: component.id.clone(),
      driver: "docker".to_string(),
      config: json!({ "image": component.image(), "ports": labels }),
      env: component.env.clone(),
    }],
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Allocation {
  #[serde(rename = "ID")]
  id: String,
  task_group: String,
  client_status: String,
  #[serde(default)]
  desired_status: Option<String>,
}

#[async_trait]
impl Orchestrator for NomadOrchestrator {
  fn id(&self) -> &str {
    "nomad"
  }

  async fn deploy(&self, stack: &Stack, options: &DeployOptions) -> Result<Deployment, OrchestratorError> {
    let job = serde_json::to_value(self.job(stack))?;

    let response = if options.dryrun {
      info!(stack = %stack.id, "planning nomad job");
      self
        .request(
          Method::POST,
          &format!("/v1/job/{}/plan", stack.id),
          Some(json!({ "Job": job, "Diff": true })),
        )
        .await?
    } else {
      info!(stack = %stack.id, "registering nomad job");
      self
        .request(Method::POST, "/v1/jobs", Some(json!({ "Job": job })))
        .await?
    };

    Ok(Deployment { response, job })
  }

  async fn destroy(&self, stack: &Stack) -> Vec<ActionResult> {
    info!(stack = %stack.id, "deregistering nomad job");
    let result = self
      .request(Method::DELETE, &format!("/v1/job/{}?purge=true", stack.id), None)
      .await;

    if let Err(e) = &result {
      warn!(stack = %stack.id, error = %e, "failed to deregister job");
    }

    let action = ActionResult::new(&stack.id, "destroy").with_result(&result);
    match result {
      Ok(data) => vec![action.with_data(data)],
      Err(_) => vec![action],
    }
  }

  async fn status(&self, stack: &Stack) -> Result<Vec<ComponentStatus>, OrchestratorError> {
    let value = self
      .request(Method::GET, &format!("/v1/job/{}/allocations", stack.id), None)
      .await?;
    let allocations: Vec<Allocation> = serde_json::from_value(value)?;

    let mut statuses: Vec<ComponentStatus> = stack
      .components
      .keys()
      .map(|id| {
        let latest = allocations.iter().filter(|a| &a.task_group == id).last();
        match latest {
          Some(alloc) => ComponentStatus {
            id: id.clone(),
            status: alloc.client_status.clone(),
            details: Some(match &alloc.desired_status {
              Some(desired) => format!("allocation {} (desired: {})", alloc.id, desired),
              None => format!("allocation {}", alloc.id),
            }),
          },
          None => ComponentStatus {
            id: id.clone(),
            status: "not running".to_string(),
            details: None,
          },
        }
      })
      .collect();
    statuses.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(statuses)
  }
}
