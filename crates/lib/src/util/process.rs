//! External command execution for CLI-driven backends.
//!
//! Children are spawned with `kill_on_drop`, so dropping the returned future
//! (e.g. on Ctrl-C) terminates the in-flight process.

use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("failed to spawn '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("command failed with exit code {code:?}: {cmd}: {stderr}")]
  Failed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("failed to stream output of '{program}': {source}")]
  Stream {
    program: String,
    #[source]
    source: std::io::Error,
  },
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
  pub stdout: String,
  pub stderr: String,
}

/// Run `program` with `args`, returning its output on a zero exit status.
pub async fn run(
  program: &str,
  args: &[String],
  envs: &[(String, String)],
  cwd: Option<&Path>,
) -> Result<ProcessOutput, ProcessError> {
  let cmd = format!("{} {}", program, args.join(" "));
  debug!(cmd = %cmd, "spawning process");

  let mut command = Command::new(program);
  command
    .args(args)
    .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  if let Some(dir) = cwd {
    command.current_dir(dir);
  }

  let output = command.output().await.map_err(|source| ProcessError::Spawn {
    program: program.to_string(),
    source,
  })?;

  let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
  let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

  if !output.status.success() {
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }
    return Err(ProcessError::Failed {
      cmd,
      code: output.status.code(),
      stderr,
    });
  }

  Ok(ProcessOutput { stdout, stderr })
}

/// Run `program`, copying its stdout and stderr into the given writers as
/// they are produced.
pub async fn stream<O, E>(
  program: &str,
  args: &[String],
  envs: &[(String, String)],
  stdout: &mut O,
  stderr: &mut E,
) -> Result<(), ProcessError>
where
  O: AsyncWrite + Unpin + ?Sized,
  E: AsyncWrite + Unpin + ?Sized,
{
  let cmd = format!("{} {}", program, args.join(" "));
  debug!(cmd = %cmd, "streaming process");

  let mut child = Command::new(program)
    .args(args)
    .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true)
    .spawn()
    .map_err(|source| ProcessError::Spawn {
      program: program.to_string(),
      source,
    })?;

  let stream_err = |source| ProcessError::Stream {
    program: program.to_string(),
    source,
  };

  let (Some(mut child_out), Some(mut child_err)) = (child.stdout.take(), child.stderr.take()) else {
    return Err(stream_err(std::io::Error::other("child pipes unavailable")));
  };

  tokio::try_join!(
    tokio::io::copy(&mut child_out, stdout),
    tokio::io::copy(&mut child_err, stderr),
  )
  .map_err(stream_err)?;
  stdout.flush().await.map_err(stream_err)?;
  stderr.flush().await.map_err(stream_err)?;

  let status = child.wait().await.map_err(stream_err)?;
  if !status.success() {
    return Err(ProcessError::Failed {
      cmd,
      code: status.code(),
      stderr: String::new(),
    });
  }

  Ok(())
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;

  fn args(a: &[&str]) -> Vec<String> {
    a.iter().map(|s| s.to_string()).collect()
  }

  #[tokio::test]
  async fn captures_stdout() {
    let out = run("sh", &args(&["-c", "echo hello"]), &[], None).await.unwrap();
    assert_eq!(out.stdout, "hello");
  }

  #[tokio::test]
  async fn passes_environment() {
    let envs = vec![("STK_TEST_VALUE".to_string(), "42".to_string())];
    let out = run("sh", &args(&["-c", "echo $STK_TEST_VALUE"]), &envs, None).await.unwrap();
    assert_eq!(out.stdout, "42");
  }

  #[tokio::test]
  async fn non_zero_exit_is_failure() {
    let err = run("sh", &args(&["-c", "echo boom >&2; exit 3"]), &[], None).await.unwrap_err();
    match err {
      ProcessError::Failed { code, stderr, .. } => {
        assert_eq!(code, Some(3));
        assert_eq!(stderr, "boom");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn streams_both_pipes() {
    let mut out = Vec::new();
    let mut err = Vec::new();
    stream("sh", &args(&["-c", "echo out; echo err >&2"]), &[], &mut out, &mut err)
      .await
      .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "out\n");
    assert_eq!(String::from_utf8(err).unwrap(), "err\n");
  }

  #[tokio::test]
  async fn missing_program_is_spawn_error() {
    let err = run("/nonexistent/stk-binary", &[], &[], None).await.unwrap_err();
    assert!(matches!(err, ProcessError::Spawn { .. }));
  }
}
