//! Locating and fingerprinting the signed artifact of a version.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ReleaseConfig;
use crate::host::{HashAlgorithm, Host, HostError};

/// An artifact file found in the artifact directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
  pub file_name: String,
  /// Path relative to the project root with `/` separators, as used in update links.
  pub relative: String,
  pub path: PathBuf,
}

/// Whether `file_name` carries `version` as a standalone token.
///
/// The token must not touch further digits on either side, so `1.2.1` does
/// not match `tab-1.2.10.xpi` or `tab-11.2.1.xpi`.
pub fn matches_version(file_name: &str, version: &str) -> bool {
  if version.is_empty() {
    return false;
  }
  let bytes = file_name.as_bytes();
  file_name.match_indices(version).any(|(start, _)| {
    let end = start + version.len();
    let before = start.checked_sub(1).map(|i| bytes[i]);
    let after = bytes.get(end).copied();
    !before.is_some_and(|b| b.is_ascii_digit()) && !after.is_some_and(|b| b.is_ascii_digit())
  })
}

/// Find the first artifact in the artifact directory for `version`.
///
/// A missing artifact directory is the same as no matching artifact. Any other
/// failure to inspect it, or a file in its place, is an error.
pub async fn locate<H: Host>(host: &H, config: &ReleaseConfig, version: &str) -> Result<Option<Artifact>, HostError> {
  let dir = config.resolve(&config.artifact_dir);
  match tokio::fs::metadata(&dir).await {
    Ok(meta) if meta.is_dir() => {}
    Ok(_) => {
      return Err(HostError::List {
        path: dir.display().to_string(),
        source: io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
      });
    }
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      debug!(dir = %dir.display(), "artifact directory does not exist");
      return Ok(None);
    }
    Err(source) => {
      return Err(HostError::List {
        path: dir.display().to_string(),
        source,
      });
    }
  }

  let found = host
    .list_directory(&dir)
    .await?
    .into_iter()
    .find(|name| name.ends_with(&config.artifact_extension) && matches_version(name, version));

  Ok(found.map(|file_name| {
    debug!(file = %file_name, version, "artifact located");
    Artifact {
      relative: format!("{}/{}", config.artifact_dir, file_name),
      path: dir.join(&file_name),
      file_name,
    }
  }))
}

/// Integrity string `sha256:<hex>` of the file at `path`.
pub async fn integrity<H: Host>(host: &H, path: &Path) -> Result<String, HostError> {
  let algorithm = HashAlgorithm::Sha256;
  let digest = host.hash_file(path, algorithm).await?;
  Ok(format!("{}:{}", algorithm.tag(), digest))
}
