//! Interactive confirmation for destructive commands.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Result, bail};
use owo_colors::{OwoColorize, Stream};

/// Ask a yes/no question on stderr. `force` answers yes without asking.
///
/// Fails rather than blocking when stdin or stderr is not a terminal.
pub fn confirm(message: &str, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Refusing to prompt in non-interactive mode. Pass --force to proceed.");
  }

  let mut stderr = io::stderr();
  write!(
    stderr,
    "{} [y/N] ",
    message.if_supports_color(Stream::Stderr, |s| s.bold())
  )?;
  stderr.flush()?;

  read_answer(io::stdin().lock())
}

fn read_answer(mut input: impl BufRead) -> Result<bool> {
  let mut line = String::new();
  input.read_line(&mut line)?;
  Ok(is_yes(&line))
}

fn is_yes(answer: &str) -> bool {
  matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
