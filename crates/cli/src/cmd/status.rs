use anyhow::Result;

use crate::output::{print_info, print_json, table};

use super::{Context, run};

pub fn cmd_status(ctx: &Context) -> Result<()> {
  let engine = ctx.engine()?;
  let stack = ctx.load_stack()?;

  let statuses = run(async { Ok(engine.status(&stack).await?) })?;

  if ctx.output.is_json() {
    return print_json(&statuses);
  }
  if statuses.is_empty() {
    print_info(&format!("Stack '{}' is not running", stack.id));
    return Ok(());
  }
  let rows: Vec<Vec<String>> = statuses
    .iter()
    .map(|s| vec![s.id.clone(), s.status.clone(), s.details.clone().unwrap_or_default()])
    .collect();
  print!("{}", table(&["Component", "Status", "Details"], &rows));
  Ok(())
}
