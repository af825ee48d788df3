use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind tag of an evaluated [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
  String,
  Int,
  Float,
  Bool,
}

impl fmt::Display for ValueKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ValueKind::String => "string",
      ValueKind::Int => "int",
      ValueKind::Float => "float",
      ValueKind::Bool => "bool",
    };
    f.write_str(s)
  }
}

/// A typed value produced by expression evaluation or held in scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
  String(String),
  Int(i64),
  Float(f64),
  Bool(bool),
}

impl Value {
  pub fn kind(&self) -> ValueKind {
    match self {
      Value::String(_) => ValueKind::String,
      Value::Int(_) => ValueKind::Int,
      Value::Float(_) => ValueKind::Float,
      Value::Bool(_) => ValueKind::Bool,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  /// Convert to a string, failing on any other kind.
  pub fn into_string(self) -> Result<String, Value> {
    match self {
      Value::String(s) => Ok(s),
      other => Err(other),
    }
  }

  /// Render the value as text for string interpolation.
  pub fn render(&self) -> String {
    self.to_string()
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::String(s) => f.write_str(s),
      Value::Int(i) => write!(f, "{}", i),
      Value::Float(x) => write!(f, "{}", x),
      Value::Bool(b) => write!(f, "{}", b),
    }
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::String(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::String(s)
  }
}
