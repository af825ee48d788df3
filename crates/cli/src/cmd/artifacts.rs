use anyhow::Result;

use crate::output::{format_bytes, print_info, print_json, table, truncate_hash};

use super::{Context, run};

/// List the images built for the stack.
pub fn cmd_artifacts(ctx: &Context) -> Result<()> {
  let engine = ctx.engine()?;
  let stack = ctx.load_stack()?;

  let artifacts = run(async { Ok(engine.artifacts(&stack).await?) })?;

  if ctx.output.is_json() {
    return print_json(&artifacts);
  }
  if artifacts.is_empty() {
    print_info(&format!("No artifacts found for stack '{}'", stack.id));
    return Ok(());
  }
  let rows: Vec<Vec<String>> = artifacts
    .iter()
    .map(|a| {
      vec![
        truncate_hash(&a.id).to_string(),
        a.tags.join(", "),
        a.created.clone(),
        format_bytes(a.size),
      ]
    })
    .collect();
  print!("{}", table(&["Image", "Tags", "Created", "Size"], &rows));
  Ok(())
}
