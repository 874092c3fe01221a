//! Windows adapter built on `cmd` builtins and `certutil`.

use std::path::Path;

use tracing::debug;

use super::{HashAlgorithm, Host, HostError, listing_lines, normalize_digest};
use crate::gateway::{CommandOutput, ShellError, run_command};
use crate::platform::os::Os;

#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsShell;

/// Extract the digest from `certutil -hashfile` output.
///
/// ```text
/// SHA256 hash of xpi\addon-1.2.0.xpi:
/// 3a 7b ...
/// CertUtil: -hashfile command completed successfully.
/// ```
pub fn parse_certutil_output(output: &str, algorithm: HashAlgorithm) -> Result<String, HostError> {
  let line = output.lines().nth(1).ok_or_else(|| HostError::UnexpectedDigest {
    algorithm,
    output: output.to_string(),
  })?;
  normalize_digest(line, algorithm)
}

/// Interpret the result of `dir /B`.
///
/// `dir` exits with code 1 ("File Not Found") when the directory is empty,
/// which is an empty listing rather than a failure.
pub fn parse_dir_result(result: Result<CommandOutput, ShellError>) -> Result<Vec<String>, HostError> {
  match result {
    Ok(output) => Ok(listing_lines(&output.stdout)),
    Err(ShellError::Failed { code: Some(1), cmd, .. }) => {
      debug!(cmd = %cmd, "empty directory listing");
      Ok(Vec::new())
    }
    Err(e) => Err(e.into()),
  }
}

impl Host for WindowsShell {
  async fn list_directory(&self, path: &Path) -> Result<Vec<String>, HostError> {
    let args = vec![
      "/C".to_string(),
      "dir".to_string(),
      "/B".to_string(),
      path.display().to_string(),
    ];
    parse_dir_result(run_command("cmd", &args).await)
  }

  async fn hash_file(&self, path: &Path, algorithm: HashAlgorithm) -> Result<String, HostError> {
    let args = vec![
      "-hashfile".to_string(),
      path.display().to_string(),
      algorithm.certutil_name().to_string(),
    ];
    let output = run_command("certutil", &args).await?;
    let digest = parse_certutil_output(&output.stdout, algorithm)?;
    debug!(path = %path.display(), digest = %digest, "hashed file");
    Ok(digest)
  }

  async fn open_url(&self, url: &str) -> Result<(), HostError> {
    let (program, args) = Os::Windows.open_command(url);
    run_command(program, &args).await?;
    Ok(())
  }
}
