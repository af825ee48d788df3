//! Version control backends.
//!
//! Only the narrow queries the engine needs: working tree status for the
//! publish gate and the head revision for stack versioning.

mod git;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::process::ProcessError;

pub use git::GitVcs;

#[derive(Debug, Error)]
pub enum VcsError {
  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error("failed to open repository at '{path}': {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: Box<gix::discover::Error>,
  },

  #[error("failed to resolve HEAD: {0}")]
  ResolveHead(String),
}

/// One changed path in the working tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
  /// Two-letter porcelain code, e.g. ` M` or `??`.
  pub code: String,
  pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsStatus {
  pub entries: Vec<StatusEntry>,
}

impl VcsStatus {
  pub fn is_clean(&self) -> bool {
    self.entries.is_empty()
  }
}

impl fmt::Display for VcsStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, entry) in self.entries.iter().enumerate() {
      if i > 0 {
        writeln!(f)?;
      }
      write!(f, "{} {}", entry.code, entry.path)?;
    }
    Ok(())
  }
}

#[async_trait]
pub trait Vcs: Send + Sync {
  fn id(&self) -> &str;

  async fn status(&self, path: &Path) -> Result<VcsStatus, VcsError>;

  /// Short id of the commit at HEAD, or `None` for a repository without
  /// commits.
  async fn head_version(&self, path: &Path) -> Result<Option<String>, VcsError>;
}
