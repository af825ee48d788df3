//! Command implementations for `stk`.
//!
//! Every command is a synchronous `cmd_*` function; async engine calls run on
//! a runtime created per command.

mod artifacts;
mod build;
mod deploy;
mod destroy;
mod logs;
mod scope;
mod status;
mod store;
mod validate;

pub use artifacts::cmd_artifacts;
pub use build::cmd_build;
pub use deploy::cmd_deploy;
pub use destroy::{cmd_destroy, cmd_stop};
pub use logs::cmd_logs;
pub use scope::cmd_scope;
pub use status::cmd_status;
pub use store::{cmd_commit, cmd_get, cmd_list, cmd_register};
pub use validate::cmd_validate;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};

use stackwright_lib::StackEngine;
use stackwright_lib::config::EngineConfig;
use stackwright_lib::stack::{Stack, load_stack};

use crate::output::OutputFormat;
use crate::reporter::TerminalReporter;

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
  pub config: Option<PathBuf>,
  pub manifest: PathBuf,
  pub output: OutputFormat,
  pub verbose: bool,
}

impl Context {
  pub fn load_config(&self) -> Result<EngineConfig> {
    match &self.config {
      Some(path) => EngineConfig::load(path).with_context(|| format!("Failed to load config {}", path.display())),
      None => EngineConfig::load_default().context("Failed to load config"),
    }
  }

  pub fn load_stack(&self) -> Result<Stack> {
    load_stack(&self.manifest).with_context(|| format!("Failed to load manifest {}", self.manifest.display()))
  }

  /// Build the engine from the configured providers.
  ///
  /// Text output renders progress with [`TerminalReporter`]; JSON output
  /// keeps stdout for the result and leaves progress to the log.
  pub fn engine(&self) -> Result<StackEngine> {
    let config = self.load_config()?;
    let engine = StackEngine::new(&config).context("Failed to initialize backends")?;
    Ok(match self.output {
      OutputFormat::Text => engine.with_reporter(Arc::new(TerminalReporter::new(self.verbose))),
      OutputFormat::Json => engine,
    })
  }
}

/// Drive `future` to completion. Ctrl-C drops it, which kills any child
/// process it spawned.
pub fn run<F, T>(future: F) -> Result<T>
where
  F: Future<Output = Result<T>>,
{
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(async {
    tokio::select! {
      result = future => result,
      _ = tokio::signal::ctrl_c() => bail!("Interrupted"),
    }
  })
}
