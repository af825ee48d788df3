//! Stack persistence.
//!
//! Stores hold registered stack definitions keyed by stack id. `create`
//! enforces id uniqueness; a duplicate leaves the existing record untouched.

mod file;
mod memory;

use std::ops::ControlFlow;
use std::path::PathBuf;

use thiserror::Error;

use crate::stack::{Stack, valid_id};

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("stack not found: {0}")]
  NotFound(String),

  #[error("stack already exists: {0}")]
  Exists(String),

  #[error("invalid stack id '{0}'")]
  InvalidId(String),

  #[error("store I/O error at '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to encode or decode stack '{id}': {source}")]
  Json {
    id: String,
    #[source]
    source: serde_json::Error,
  },
}

pub trait StackStore: Send + Sync {
  fn id(&self) -> &str;

  fn get(&self, id: &str) -> Result<Stack, StoreError>;

  /// Visit every stack whose id starts with `prefix`, in id order, until the
  /// visitor breaks.
  fn iter(&self, prefix: &str, visitor: &mut dyn FnMut(Stack) -> ControlFlow<()>) -> Result<(), StoreError>;

  /// Insert a new stack. Fails with [`StoreError::Exists`] on a duplicate id.
  fn create(&self, stack: &Stack) -> Result<(), StoreError>;

  /// Replace an existing stack.
  fn update(&self, stack: &Stack) -> Result<(), StoreError>;
}

fn check_id(id: &str) -> Result<(), StoreError> {
  if valid_id(id) {
    Ok(())
  } else {
    Err(StoreError::InvalidId(id.to_string()))
  }
}
