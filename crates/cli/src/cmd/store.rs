//! Commands over the persistence store.

use std::ops::ControlFlow;

use anyhow::Result;

use stackwright_lib::stack::Stack;

use crate::output::{print_info, print_json, print_stat, print_success, table};

use super::Context;

pub fn cmd_register(ctx: &Context) -> Result<()> {
  let engine = ctx.engine()?;
  let stack = ctx.load_stack()?;
  engine.register(&stack)?;
  if !ctx.output.is_json() {
    print_success(&format!("Stack '{}' registered", stack.id));
  }
  Ok(())
}

pub fn cmd_commit(ctx: &Context) -> Result<()> {
  let engine = ctx.engine()?;
  let stack = ctx.load_stack()?;
  engine.commit(&stack)?;
  if !ctx.output.is_json() {
    print_success(&format!("Stack '{}' committed", stack.id));
  }
  Ok(())
}

pub fn cmd_get(ctx: &Context, id: &str) -> Result<()> {
  let engine = ctx.engine()?;
  let stack = engine.get(id)?;

  if ctx.output.is_json() {
    return print_json(&stack);
  }
  print_stat("Stack", &stack.id);
  print_stat("Version", &stack.version);
  println!();
  let rows: Vec<Vec<String>> = stack
    .components
    .values()
    .map(|c| vec![c.id.clone(), c.kind.as_str().to_string(), c.image()])
    .collect();
  print!("{}", table(&["Component", "Kind", "Image"], &rows));
  Ok(())
}

pub fn cmd_list(ctx: &Context, prefix: &str) -> Result<()> {
  let engine = ctx.engine()?;

  let mut stacks: Vec<Stack> = Vec::new();
  engine.iter(prefix, &mut |stack| {
    stacks.push(stack);
    ControlFlow::Continue(())
  })?;

  if ctx.output.is_json() {
    return print_json(&stacks);
  }
  if stacks.is_empty() {
    print_info("No stacks registered");
    return Ok(());
  }
  let rows: Vec<Vec<String>> = stacks
    .iter()
    .map(|s| vec![s.id.clone(), s.version.clone(), s.components.len().to_string()])
    .collect();
  print!("{}", table(&["Stack", "Version", "Components"], &rows));
  Ok(())
}
