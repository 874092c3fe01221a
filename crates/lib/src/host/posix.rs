//! POSIX adapter built on `ls` and `sha256sum`/`shasum`.

use std::path::Path;

use tracing::debug;

use super::{HashAlgorithm, Host, HostError, listing_lines, normalize_digest};
use crate::gateway::run_command;
use crate::platform::os::Os;

#[derive(Debug, Clone, Copy)]
pub struct PosixShell {
  os: Os,
}

impl PosixShell {
  pub fn new(os: Os) -> Self {
    Self { os }
  }

  /// Hash command for this OS; macOS ships `shasum` instead of coreutils.
  fn hash_command(&self, path: &Path, algorithm: HashAlgorithm) -> (&'static str, Vec<String>) {
    let file = path.display().to_string();
    match (self.os, algorithm) {
      (Os::MacOs, HashAlgorithm::Sha256) => ("shasum", vec!["-a".to_string(), "256".to_string(), file]),
      (_, HashAlgorithm::Sha256) => ("sha256sum", vec![file]),
    }
  }
}

/// Extract the digest from `sha256sum`/`shasum` output (`<hex>  <path>`).
///
/// GNU tools prefix the line with `\` when the filename needed escaping.
pub fn parse_sum_output(output: &str, algorithm: HashAlgorithm) -> Result<String, HostError> {
  let token = output
    .lines()
    .next()
    .and_then(|line| line.split_whitespace().next())
    .map(|token| token.trim_start_matches('\\'))
    .ok_or_else(|| HostError::UnexpectedDigest {
      algorithm,
      output: output.to_string(),
    })?;
  normalize_digest(token, algorithm)
}

impl Host for PosixShell {
  async fn list_directory(&self, path: &Path) -> Result<Vec<String>, HostError> {
    let args = vec!["-1".to_string(), path.display().to_string()];
    let output = run_command("ls", &args).await?;
    Ok(listing_lines(&output.stdout))
  }

  async fn hash_file(&self, path: &Path, algorithm: HashAlgorithm) -> Result<String, HostError> {
    let (program, args) = self.hash_command(path, algorithm);
    let output = run_command(program, &args).await?;
    let digest = parse_sum_output(&output.stdout, algorithm)?;
    debug!(path = %path.display(), digest = %digest, "hashed file");
    Ok(digest)
  }

  async fn open_url(&self, url: &str) -> Result<(), HostError> {
    let (program, args) = self.os.open_command(url);
    run_command(program, &args).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const DIGEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

  #[test]
  fn parses_sha256sum_output() {
    let output = format!("{}  xpi/addon-1.2.0.xpi\n", DIGEST);
    assert_eq!(parse_sum_output(&output, HashAlgorithm::Sha256).unwrap(), DIGEST);
  }

  #[test]
  fn parses_escaped_filename_output() {
    let output = format!("\\{}  xpi/odd\\nname.xpi\n", DIGEST);
    assert_eq!(parse_sum_output(&output, HashAlgorithm::Sha256).unwrap(), DIGEST);
  }

  #[test]
  fn rejects_empty_output() {
    assert!(parse_sum_output("", HashAlgorithm::Sha256).is_err());
  }

  #[test]
  fn macos_uses_shasum() {
    let (program, args) = PosixShell::new(Os::MacOs).hash_command(Path::new("a.xpi"), HashAlgorithm::Sha256);
    assert_eq!(program, "shasum");
    assert_eq!(args, vec!["-a", "256", "a.xpi"]);

    let (program, args) = PosixShell::new(Os::Linux).hash_command(Path::new("a.xpi"), HashAlgorithm::Sha256);
    assert_eq!(program, "sha256sum");
    assert_eq!(args, vec!["a.xpi"]);
  }

  #[tokio::test]
  #[cfg(target_os = "linux")]
  async fn lists_and_hashes_with_coreutils() {
    let temp = tempfile::TempDir::new().unwrap();
    std::fs::write(temp.path().join("addon-1.0.0.xpi"), "test").unwrap();
    std::fs::write(temp.path().join("notes.txt"), "x").unwrap();
    let host = PosixShell::new(Os::Linux);

    let entries = host.list_directory(temp.path()).await.unwrap();
    assert_eq!(entries, vec!["addon-1.0.0.xpi", "notes.txt"]);

    let digest = host
      .hash_file(&temp.path().join("addon-1.0.0.xpi"), HashAlgorithm::Sha256)
      .await
      .unwrap();
    assert_eq!(digest, DIGEST);
  }
}
