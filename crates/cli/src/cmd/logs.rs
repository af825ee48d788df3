use anyhow::{Result, bail};

use super::{Context, run};

/// Copy container logs to the terminal, for one component or all of them.
pub fn cmd_logs(ctx: &Context, component: Option<&str>) -> Result<()> {
  let engine = ctx.engine()?;
  let stack = ctx.load_stack()?;

  let container = match component {
    Some(id) if !stack.components.contains_key(id) => bail!("Stack '{}' has no component '{}'", stack.id, id),
    Some(id) => Some(stack.container_name(id)),
    None => None,
  };

  run(async {
    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();
    match &container {
      Some(name) => engine.log(name, &mut stdout, &mut stderr).await?,
      None => engine.logs(&stack, &mut stdout, &mut stderr).await?,
    }
    Ok(())
  })
}
