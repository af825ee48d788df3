use anyhow::Result;

use stackwright_lib::backend::orchestrator::DeployOptions;

use crate::output::{print_json, print_success};

use super::{Context, run};

pub fn cmd_deploy(ctx: &Context, dry_run: bool) -> Result<()> {
  let engine = ctx.engine()?;
  let mut stack = ctx.load_stack()?;
  let options = DeployOptions { dryrun: dry_run };

  let outcome = run(async { Ok(engine.deploy(&mut stack, &options).await?) })?;

  if ctx.output.is_json() {
    print_json(&outcome)?;
  } else if !outcome.dryrun {
    println!();
    print_success(&format!("Stack '{}' deployed", stack.id));
  }
  Ok(())
}
