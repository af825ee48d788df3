//! JSON-file stack store.
//!
//! # Layout
//!
//! ```text
//! {root}/stacks/
//! └── <id>.json
//! ```

use std::fs;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::{StackStore, StoreError, check_id};
use crate::stack::Stack;

const STACKS_DIR: &str = "stacks";

#[derive(Debug, Clone)]
pub struct FileStore {
  base_path: PathBuf,
}

impl FileStore {
  pub fn new(root: impl AsRef<Path>) -> Self {
    Self {
      base_path: root.as_ref().join(STACKS_DIR),
    }
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  fn stack_path(&self, id: &str) -> PathBuf {
    self.base_path.join(format!("{}.json", id))
  }

  fn ensure_dir(&self) -> Result<(), StoreError> {
    fs::create_dir_all(&self.base_path).map_err(|source| StoreError::Io {
      path: self.base_path.clone(),
      source,
    })
  }

  fn encode(stack: &Stack) -> Result<String, StoreError> {
    serde_json::to_string_pretty(stack).map_err(|source| StoreError::Json {
      id: stack.id.clone(),
      source,
    })
  }

  /// Fully written and synced temp file next to the stack documents. It is
  /// removed on drop unless persisted.
  fn write_temp(&self, stack: &Stack) -> Result<NamedTempFile, StoreError> {
    let content = Self::encode(stack)?;
    let io_err = |source| StoreError::Io {
      path: self.base_path.clone(),
      source,
    };

    let mut temp = NamedTempFile::new_in(&self.base_path).map_err(io_err)?;
    temp.write_all(content.as_bytes()).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    Ok(temp)
  }

  fn read(&self, path: &Path, id: &str) -> Result<Stack, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| {
      if source.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(id.to_string())
      } else {
        StoreError::Io {
          path: path.to_path_buf(),
          source,
        }
      }
    })?;

    serde_json::from_str(&content).map_err(|source| StoreError::Json {
      id: id.to_string(),
      source,
    })
  }
}

impl StackStore for FileStore {
  fn id(&self) -> &str {
    "file"
  }

  fn get(&self, id: &str) -> Result<Stack, StoreError> {
    check_id(id)?;
    self.read(&self.stack_path(id), id)
  }

  fn iter(&self, prefix: &str, visitor: &mut dyn FnMut(Stack) -> ControlFlow<()>) -> Result<(), StoreError> {
    let entries = match fs::read_dir(&self.base_path) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
      Err(source) => {
        return Err(StoreError::Io {
          path: self.base_path.clone(),
          source,
        });
      }
    };

    let mut ids: Vec<String> = entries
      .filter_map(|entry| entry.ok())
      .filter_map(|entry| {
        let name = entry.file_name().into_string().ok()?;
        name.strip_suffix(".json").map(String::from)
      })
      .filter(|id| id.starts_with(prefix))
      .collect();
    ids.sort();

    for id in ids {
      let stack = self.read(&self.stack_path(&id), &id)?;
      if visitor(stack).is_break() {
        break;
      }
    }

    Ok(())
  }

  fn create(&self, stack: &Stack) -> Result<(), StoreError> {
    check_id(&stack.id)?;
    self.ensure_dir()?;

    let path = self.stack_path(&stack.id);
    if path.exists() {
      return Err(StoreError::Exists(stack.id.clone()));
    }

    // Linked into place only once fully written; never overwrites.
    let temp = self.write_temp(stack)?;
    match temp.persist_noclobber(&path) {
      Ok(_) => {}
      Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
        return Err(StoreError::Exists(stack.id.clone()));
      }
      Err(e) => return Err(StoreError::Io { path, source: e.error }),
    }

    debug!(stack = %stack.id, path = %path.display(), "stack created");
    Ok(())
  }

  fn update(&self, stack: &Stack) -> Result<(), StoreError> {
    check_id(&stack.id)?;

    let path = self.stack_path(&stack.id);
    if !path.exists() {
      return Err(StoreError::NotFound(stack.id.clone()));
    }

    let temp = self.write_temp(stack)?;
    temp
      .persist(&path)
      .map_err(|e| StoreError::Io { path, source: e.error })?;

    debug!(stack = %stack.id, "stack updated");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn store() -> (TempDir, FileStore) {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    (dir, store)
  }

  #[test]
  fn create_then_get() {
    let (_dir, store) = store();
    store.create(&Stack::new("shop", "1.0")).unwrap();
    assert_eq!(store.get("shop").unwrap().version, "1.0");
  }

  #[test]
  fn duplicate_create_keeps_original() {
    let (_dir, store) = store();
    store.create(&Stack::new("shop", "1.0")).unwrap();

    let err = store.create(&Stack::new("shop", "2.0")).unwrap_err();
    assert!(matches!(err, StoreError::Exists(ref id) if id == "shop"));
    assert_eq!(store.get("shop").unwrap().version, "1.0");
  }

  #[test]
  fn create_leaves_only_complete_documents() {
    let (_dir, store) = store();
    store.create(&Stack::new("shop", "1.0")).unwrap();
    assert!(store.create(&Stack::new("shop", "2.0")).is_err());
    store.update(&Stack::new("shop", "1.1")).unwrap();

    let mut names: Vec<String> = fs::read_dir(store.base_path())
      .unwrap()
      .map(|entry| entry.unwrap().file_name().into_string().unwrap())
      .collect();
    names.sort();
    assert_eq!(names, vec!["shop.json".to_string()]);
    assert_eq!(store.get("shop").unwrap().version, "1.1");
  }

  #[test]
  fn update_requires_existing() {
    let (_dir, store) = store();
    assert!(matches!(
      store.update(&Stack::new("shop", "1.0")),
      Err(StoreError::NotFound(_))
    ));

    store.create(&Stack::new("shop", "1.0")).unwrap();
    store.update(&Stack::new("shop", "1.1")).unwrap();
    assert_eq!(store.get("shop").unwrap().version, "1.1");
    assert!(!store.base_path().join("shop.json.tmp").exists());
  }

  #[test]
  fn iter_filters_by_prefix_in_order() {
    let (_dir, store) = store();
    for id in ["web-b", "api", "web-a"] {
      store.create(&Stack::new(id, "1")).unwrap();
    }

    let mut seen = Vec::new();
    store
      .iter("web", &mut |stack| {
        seen.push(stack.id);
        ControlFlow::Continue(())
      })
      .unwrap();
    assert_eq!(seen, vec!["web-a".to_string(), "web-b".to_string()]);
  }

  #[test]
  fn iter_on_missing_dir_is_empty() {
    let (_dir, store) = store();
    let mut count = 0;
    store
      .iter("", &mut |_| {
        count += 1;
        ControlFlow::Continue(())
      })
      .unwrap();
    assert_eq!(count, 0);
  }

  #[test]
  fn rejects_path_like_ids() {
    let (_dir, store) = store();
    assert!(matches!(store.get("../etc"), Err(StoreError::InvalidId(_))));
  }
}
