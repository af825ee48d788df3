//! `stk scope`: print the variables expressions are evaluated against.

use anyhow::Result;

use stackwright_lib::scope::ScopeResolver;

use crate::output::{print_json, table};

use super::Context;

/// Resolution needs only the VCS identity from the config, so no backend is
/// constructed.
pub fn cmd_scope(ctx: &Context) -> Result<()> {
  let config = ctx.load_config()?;
  let stack = ctx.load_stack()?;
  stack.check()?;

  let vars = ScopeResolver::new(config.vcs.scope_vars()).resolve(&stack);

  if ctx.output.is_json() {
    print_json(&vars)?;
  } else {
    let rows: Vec<Vec<String>> = vars.iter().map(|(k, v)| vec![k.clone(), v.to_string()]).collect();
    print!("{}", table(&["Variable", "Value"], &rows));
  }
  Ok(())
}
