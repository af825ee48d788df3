//! Manifest file loading.
//!
//! Stacks are read from YAML (`.yml`/`.yaml`) or JSON documents. Component ids
//! left empty are filled from their map keys; no further validation happens
//! here.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::types::Stack;

#[derive(Debug, Error)]
pub enum LoadError {
  #[error("failed to read manifest '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse YAML manifest: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("failed to parse JSON manifest: {0}")]
  Json(#[from] serde_json::Error),
}

/// Load a stack from a manifest file, choosing the format by extension.
pub fn load_stack(path: &Path) -> Result<Stack, LoadError> {
  let content = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
    path: path.to_path_buf(),
    source,
  })?;

  let json = path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

  parse_stack(&content, json)
}

/// Parse a stack document from a string.
pub fn parse_stack(content: &str, json: bool) -> Result<Stack, LoadError> {
  let mut stack: Stack = if json {
    serde_json::from_str(content)?
  } else {
    serde_yaml::from_str(content)?
  };
  stack.normalize_ids();
  Ok(stack)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::stack::ComponentKind;

  const MANIFEST: &str = r#"
id: shop
version: 0.4.0
components:
  api:
    type: api
    version: 0.4.0
    head: true
    build:
      dockerfile: api.dockerfile
    env:
      DB_ADDR: "${component.db.container.addr.sql}"
    ports:
      http: 8080
  db:
    name: cockroachdb/cockroach
    version: v2.0.2
    type: datastore
    ports:
      sql: 26257
"#;

  #[test]
  fn parses_yaml_manifest() {
    let stack = parse_stack(MANIFEST, false).unwrap();

    assert_eq!(stack.id, "shop");
    assert_eq!(stack.components.len(), 2);

    let api = &stack.components["api"];
    assert_eq!(api.id, "api");
    assert!(api.is_buildable());
    assert_eq!(api.build.as_ref().unwrap().context, ".");
    assert_eq!(api.env["DB_ADDR"], "${component.db.container.addr.sql}");

    let db = &stack.components["db"];
    assert_eq!(db.kind, ComponentKind::Datastore);
    assert!(!db.is_buildable());
  }

  #[test]
  fn loads_json_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stack.json");
    std::fs::write(
      &path,
      r#"{"id":"s1","version":"1","components":{"api":{"build":{"dockerfile":"Dockerfile"},"version":"1"}}}"#,
    )
    .unwrap();

    let stack = load_stack(&path).unwrap();
    assert_eq!(stack.components["api"].id, "api");
  }

  #[test]
  fn missing_file_is_read_error() {
    let err = load_stack(Path::new("/definitely/not/here.yml")).unwrap_err();
    assert!(matches!(err, LoadError::Read { .. }));
  }
}
