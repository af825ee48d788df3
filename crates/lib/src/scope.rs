//! Scope variable resolution.
//!
//! Derives the namespaced variable environment used to evaluate component
//! expressions. Resolution is pure: it reads the stack's current fields and
//! never touches the network or any backend.
//!
//! # Keys
//!
//! - `stack.id`, `stack.version`
//! - `vcs.*` from the configured version control provider
//! - `component.<id>.container.ip` = `<id>.<stack-id>`
//! - `component.<id>.container.addr.<label>` = `<id>.<stack-id>:<port>`

use std::collections::BTreeMap;

use serde::Serialize;

use crate::consts::{COMPONENT_SCOPE_PREFIX, STACK_SCOPE_PREFIX};
use crate::expr::{Value, VariableSource};
use crate::stack::{Component, Stack};

/// Resolved, immutable variable environment for one Build or Deploy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScopeVariables(BTreeMap<String, Value>);

impl ScopeVariables {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    self.0.insert(key.into(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.0.iter()
  }

  pub fn keys(&self) -> impl Iterator<Item = &String> {
    self.0.keys()
  }

  /// Copy every variable from `other`, overwriting existing keys.
  pub fn extend(&mut self, other: &ScopeVariables) {
    for (k, v) in other.iter() {
      self.0.insert(k.clone(), v.clone());
    }
  }
}

impl VariableSource for ScopeVariables {
  fn lookup(&self, name: &str) -> Option<&Value> {
    self.0.get(name)
  }
}

impl FromIterator<(String, Value)> for ScopeVariables {
  fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
    Self(iter.into_iter().collect())
  }
}

/// Scope key for a component variable: `component.<id>.<name>`.
pub fn component_var(component: &Component, name: &str) -> String {
  format!("{}.{}.{}", COMPONENT_SCOPE_PREFIX, component.id, name)
}

/// Builds [`ScopeVariables`] for stacks on top of a fixed base environment.
#[derive(Debug, Clone, Default)]
pub struct ScopeResolver {
  base: ScopeVariables,
}

impl ScopeResolver {
  /// Create a resolver whose output always includes `base` (e.g. `vcs.*`).
  pub fn new(base: ScopeVariables) -> Self {
    Self { base }
  }

  /// Resolve the full scope for a stack.
  pub fn resolve(&self, stack: &Stack) -> ScopeVariables {
    let mut vars = self.base.clone();

    vars.insert(format!("{}.id", STACK_SCOPE_PREFIX), stack.id.as_str());
    vars.insert(format!("{}.version", STACK_SCOPE_PREFIX), stack.version.as_str());

    for component in stack.components.values() {
      let ip = stack.container_name(&component.id);

      for (label, port) in &component.ports {
        vars.insert(
          component_var(component, &format!("container.addr.{}", label)),
          format!("{}:{}", ip, port),
        );
      }
      vars.insert(component_var(component, "container.ip"), ip);
    }

    vars
  }
}
