//! `stk destroy` and `stk stop`.

use anyhow::{Result, bail};

use stackwright_lib::action::ActionResult;

use crate::output::{print_info, print_json};
use crate::prompts::confirm;
use crate::reporter::print_results;

use super::{Context, run};

pub fn cmd_destroy(ctx: &Context, force: bool) -> Result<()> {
  let stack = ctx.load_stack()?;
  if !confirm(&format!("Destroy every resource of stack '{}'?", stack.id), force)? {
    print_info("Aborted.");
    return Ok(());
  }
  let engine = ctx.engine()?;

  let results = run(async { Ok(engine.destroy(&stack).await) })?;
  finish(ctx, "destroy", &results)
}

pub fn cmd_stop(ctx: &Context) -> Result<()> {
  let engine = ctx.engine()?;
  let stack = ctx.load_stack()?;

  let results = run(async { Ok(engine.stop(&stack).await) })?;
  finish(ctx, "stop", &results)
}

fn finish(ctx: &Context, action: &str, results: &[ActionResult]) -> Result<()> {
  if ctx.output.is_json() {
    print_json(&results)?;
  } else {
    print_results(results);
  }

  let failed = results.iter().filter(|r| !r.succeeded()).count();
  if failed > 0 {
    bail!("{} of {} {} action(s) failed", failed, results.len(), action);
  }
  Ok(())
}
