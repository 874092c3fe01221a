//! External command execution.
//!
//! A command succeeds only when it exits with status zero and writes nothing
//! to stderr; otherwise the error carries the command line and its error text.

use std::io;

use tokio::process::Command;
use tracing::{debug, info};

use thiserror::Error;

/// Errors raised while running an external command.
#[derive(Debug, Error)]
pub enum ShellError {
  #[error("failed to spawn `{cmd}`: {source}")]
  Spawn { cmd: String, source: io::Error },

  #[error("`{cmd}` failed with exit code {code:?}: {message}")]
  Failed {
    cmd: String,
    code: Option<i32>,
    message: String,
  },

  #[error("`{cmd}` reported an error: {message}")]
  Stderr { cmd: String, message: String },
}

/// Captured output of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
  pub stdout: String,
}

/// Render a program and its arguments for logs and errors.
pub fn display_command(program: &str, args: &[String]) -> String {
  std::iter::once(program.to_string())
    .chain(args.iter().cloned())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Run `program` with `args` and capture stdout.
///
/// The program is spawned directly, not through a shell, so arguments are
/// passed verbatim.
pub async fn run_command(program: &str, args: &[String]) -> Result<CommandOutput, ShellError> {
  let cmd = display_command(program, args);
  info!(cmd = %cmd, "executing command");

  let output = Command::new(program)
    .args(args)
    .output()
    .await
    .map_err(|source| ShellError::Spawn {
      cmd: cmd.clone(),
      source,
    })?;

  let stdout = String::from_utf8_lossy(&output.stdout).to_string();
  let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

  if !output.status.success() {
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }
    let message = if stderr.is_empty() { stdout.trim().to_string() } else { stderr };
    return Err(ShellError::Failed {
      cmd,
      code: output.status.code(),
      message,
    });
  }

  if !stderr.is_empty() {
    return Err(ShellError::Stderr { cmd, message: stderr });
  }

  debug!(bytes = stdout.len(), "command output captured");
  Ok(CommandOutput { stdout })
}
