use anyhow::Result;
use serde_json::json;

use crate::output::{print_json, print_success};

use super::Context;

pub fn cmd_validate(ctx: &Context) -> Result<()> {
  let stack = ctx.load_stack()?;
  stack.check()?;

  if ctx.output.is_json() {
    print_json(&json!({ "stack": stack.id, "components": stack.components.len(), "valid": true }))?;
  } else {
    print_success(&format!(
      "Stack '{}' is valid ({} component(s))",
      stack.id,
      stack.components.len()
    ));
  }
  Ok(())
}
