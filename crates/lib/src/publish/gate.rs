//! Publish gating on working tree cleanliness.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::vcs::{Vcs, VcsError, VcsStatus};

/// Whether freshly built artifacts may be published, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
  /// Clean worktree.
  Clean,
  /// Dirty worktree, publish explicitly requested. Source and artifacts may
  /// be out of sync.
  Override { status: VcsStatus },
  /// Dirty worktree, publish skipped.
  Skipped { status: VcsStatus },
}

impl GateDecision {
  pub fn can_publish(&self) -> bool {
    !matches!(self, GateDecision::Skipped { .. })
  }

  /// Uncommitted changes, if the worktree was dirty.
  pub fn uncommitted(&self) -> Option<&VcsStatus> {
    match self {
      GateDecision::Clean => None,
      GateDecision::Override { status } | GateDecision::Skipped { status } => Some(status),
    }
  }
}

/// Decide from a status snapshot and the explicit publish flag.
pub fn decide(status: VcsStatus, explicit_publish: bool) -> GateDecision {
  if status.is_clean() {
    return GateDecision::Clean;
  }

  if explicit_publish {
    warn!(
      changes = status.entries.len(),
      "explicit artifact publish requested, source code and artifacts may be out of sync"
    );
    GateDecision::Override { status }
  } else {
    info!(changes = status.entries.len(), "uncommitted changes, artifacts will not be published");
    GateDecision::Skipped { status }
  }
}

pub struct WorktreeGate {
  vcs: Arc<dyn Vcs>,
}

impl WorktreeGate {
  pub fn new(vcs: Arc<dyn Vcs>) -> Self {
    Self { vcs }
  }

  /// Query the worktree at `workdir` and decide.
  pub async fn check(&self, workdir: &Path, explicit_publish: bool) -> Result<GateDecision, VcsError> {
    let status = self.vcs.status(workdir).await?;
    Ok(decide(status, explicit_publish))
  }
}
