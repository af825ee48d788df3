use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use tracing::debug;

use stackwright_lib::BuildOptions;

use crate::output::{print_info, print_json, print_success};

use super::{Context, run};

pub fn cmd_build(ctx: &Context, publish: bool, workdir: Option<&Path>, jobs: Option<usize>) -> Result<()> {
  let workdir = match workdir {
    Some(dir) => dunce::canonicalize(dir).with_context(|| format!("Invalid workdir {}", dir.display()))?,
    None => manifest_dir(&ctx.manifest)?,
  };
  let engine = ctx.engine()?;
  let mut stack = ctx.load_stack()?;

  let options = BuildOptions {
    publish,
    workdir,
    parallelism: jobs,
  };

  let outcome = run(async {
    if stack.version.is_empty() {
      let version = engine
        .head_version(&options.workdir)
        .await?
        .context("Stack has no version and the workdir has no commit")?;
      debug!(version = %version, "using repository head as stack version");
      stack.version = version;
    }
    Ok(engine.build(&mut stack, &options).await?)
  })?;

  if ctx.output.is_json() {
    print_json(&outcome)?;
  } else if outcome.published() {
    println!();
    print_success(&format!("Built and published {} component(s)", outcome.report.len()));
  } else {
    println!();
    print_info(&format!("Built {} component(s)", outcome.report.len()));
  }
  Ok(())
}

/// Directory holding the manifest; build contexts are relative to it.
fn manifest_dir(manifest: &Path) -> Result<PathBuf> {
  let path = dunce::canonicalize(manifest).with_context(|| format!("Failed to resolve {}", manifest.display()))?;
  Ok(path.parent().map(Path::to_path_buf).unwrap_or(path))
}
