//! Uniform outcome record for one discrete backend operation.

use serde::{Deserialize, Serialize};

/// Outcome of one operation (build, publish, stop, destroy, ...) against a
/// single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
  pub resource: String,
  pub action: String,
  /// Backend-specific payload.
  #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
  pub data: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl ActionResult {
  pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
    Self {
      resource: resource.into(),
      action: action.into(),
      data: serde_json::Value::Null,
      error: None,
    }
  }

  pub fn with_data(mut self, data: serde_json::Value) -> Self {
    self.data = data;
    self
  }

  pub fn with_error(mut self, error: impl std::fmt::Display) -> Self {
    self.error = Some(error.to_string());
    self
  }

  /// Record the error of `result`, if any.
  pub fn with_result<T, E: std::fmt::Display>(self, result: &Result<T, E>) -> Self {
    match result {
      Ok(_) => self,
      Err(e) => self.with_error(e),
    }
  }

  pub fn succeeded(&self) -> bool {
    self.error.is_none()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn records_result_error() {
    let ok: Result<(), String> = Ok(());
    let err: Result<(), String> = Err("no such container".to_string());

    assert!(ActionResult::new("api", "stop").with_result(&ok).succeeded());

    let failed = ActionResult::new("db", "stop").with_result(&err);
    assert!(!failed.succeeded());
    assert_eq!(failed.error.as_deref(), Some("no such container"));
  }

  #[test]
  fn serializes_without_empty_fields() {
    let json = serde_json::to_value(ActionResult::new("api", "destroy")).unwrap();
    assert_eq!(json, serde_json::json!({ "resource": "api", "action": "destroy" }));
  }
}
