use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use super::{StatusEntry, Vcs, VcsError, VcsStatus};
use crate::config::VcsConfig;
use crate::util::process;

const SHORT_ID_LEN: usize = 7;

#[derive(Debug, Clone)]
pub struct GitVcs {
  config: VcsConfig,
}

impl GitVcs {
  pub fn new(config: VcsConfig) -> Self {
    Self { config }
  }
}

/// Parse `git status --porcelain=v1` output.
pub(crate) fn parse_porcelain(output: &str) -> VcsStatus {
  let entries = output
    .lines()
    .filter(|line| line.len() > 3)
    .map(|line| {
      let (code, path) = line.split_at(2);
      StatusEntry {
        code: code.to_string(),
        path: path.trim_start().to_string(),
      }
    })
    .collect();

  VcsStatus { entries }
}

#[async_trait]
impl Vcs for GitVcs {
  fn id(&self) -> &str {
    "git"
  }

  async fn status(&self, path: &Path) -> Result<VcsStatus, VcsError> {
    let args = vec!["status".to_string(), "--porcelain=v1".to_string()];
    let out = process::run(&self.config.binary, &args, &[], Some(path)).await?;
    let status = parse_porcelain(&out.stdout);
    debug!(path = %path.display(), changes = status.entries.len(), "worktree status");
    Ok(status)
  }

  async fn head_version(&self, path: &Path) -> Result<Option<String>, VcsError> {
    let repo = gix::discover(path).map_err(|e| VcsError::Open {
      path: path.to_path_buf(),
      source: Box::new(e),
    })?;

    let mut head = repo.head().map_err(|e| VcsError::ResolveHead(e.to_string()))?;
    if head.is_unborn() {
      return Ok(None);
    }

    let commit = head
      .peel_to_commit()
      .map_err(|e| VcsError::ResolveHead(e.to_string()))?;

    Ok(Some(commit.id.to_hex_with_len(SHORT_ID_LEN).to_string()))
  }
}
