//! Host capabilities: directory listing, file hashing and URL opening.
//!
//! Listing and hashing are platform dependent in invocation syntax and output
//! shape. Each adapter normalizes its output so callers only ever see bare
//! filenames and lowercase hex digests. The adapter is chosen once at startup
//! by [`HostAdapter::detect`].

mod native;
mod posix;
mod windows;

use std::path::Path;

use thiserror::Error;

use crate::config::HostMode;
use crate::gateway::ShellError;
use crate::platform::os::Os;

pub use native::NativeHost;
pub use posix::PosixShell;
pub use windows::WindowsShell;

/// Errors raised by host capabilities.
#[derive(Debug, Error)]
pub enum HostError {
  #[error(transparent)]
  Shell(#[from] ShellError),

  #[error("failed to list {path}: {source}")]
  List { path: String, source: std::io::Error },

  #[error("failed to hash {path}: {source}")]
  Hash { path: String, source: std::io::Error },

  #[error("unexpected {algorithm} output: {output:?}")]
  UnexpectedDigest { algorithm: HashAlgorithm, output: String },

  #[error("unsupported operating system: {0}")]
  UnsupportedOs(String),
}

/// Content hash algorithms understood by the hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
  Sha256,
}

impl HashAlgorithm {
  /// Tag used in integrity strings (`sha256:<hex>`).
  pub fn tag(&self) -> &'static str {
    match self {
      HashAlgorithm::Sha256 => "sha256",
    }
  }

  /// Name expected by `certutil -hashfile`.
  pub fn certutil_name(&self) -> &'static str {
    match self {
      HashAlgorithm::Sha256 => "SHA256",
    }
  }

  /// Length of the hex digest.
  pub fn hex_len(&self) -> usize {
    match self {
      HashAlgorithm::Sha256 => 64,
    }
  }
}

impl std::fmt::Display for HashAlgorithm {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.tag())
  }
}

/// Capabilities the release flows need from the host system.
///
/// The flows are strictly sequential, so the returned futures carry no `Send`
/// requirement.
#[allow(async_fn_in_trait)]
pub trait Host {
  /// Names of the entries in `path`.
  async fn list_directory(&self, path: &Path) -> Result<Vec<String>, HostError>;

  /// Bare lowercase hex digest of the file at `path`.
  async fn hash_file(&self, path: &Path, algorithm: HashAlgorithm) -> Result<String, HostError>;

  /// Open `url` in the user's browser.
  async fn open_url(&self, url: &str) -> Result<(), HostError>;
}

/// The adapter selected for this process.
#[derive(Debug, Clone)]
pub enum HostAdapter {
  Windows(WindowsShell),
  Posix(PosixShell),
  Native(NativeHost),
}

impl HostAdapter {
  /// Select the adapter for the running OS and the configured mode.
  pub fn detect(mode: HostMode) -> Result<Self, HostError> {
    let os = Os::current().ok_or_else(|| HostError::UnsupportedOs(std::env::consts::OS.to_string()))?;
    Ok(Self::for_os(os, mode))
  }

  pub fn for_os(os: Os, mode: HostMode) -> Self {
    match (mode, os) {
      (HostMode::Native, _) => HostAdapter::Native(NativeHost::new(os)),
      (HostMode::Shell, Os::Windows) => HostAdapter::Windows(WindowsShell),
      (HostMode::Shell, os) => HostAdapter::Posix(PosixShell::new(os)),
    }
  }
}

impl Host for HostAdapter {
  async fn list_directory(&self, path: &Path) -> Result<Vec<String>, HostError> {
    match self {
      HostAdapter::Windows(h) => h.list_directory(path).await,
      HostAdapter::Posix(h) => h.list_directory(path).await,
      HostAdapter::Native(h) => h.list_directory(path).await,
    }
  }

  async fn hash_file(&self, path: &Path, algorithm: HashAlgorithm) -> Result<String, HostError> {
    match self {
      HostAdapter::Windows(h) => h.hash_file(path, algorithm).await,
      HostAdapter::Posix(h) => h.hash_file(path, algorithm).await,
      HostAdapter::Native(h) => h.hash_file(path, algorithm).await,
    }
  }

  async fn open_url(&self, url: &str) -> Result<(), HostError> {
    match self {
      HostAdapter::Windows(h) => h.open_url(url).await,
      HostAdapter::Posix(h) => h.open_url(url).await,
      HostAdapter::Native(h) => h.open_url(url).await,
    }
  }
}

/// Validate a candidate digest and return it in lowercase.
///
/// Whitespace inside the candidate is dropped; older `certutil` versions print
/// the digest as space-separated byte pairs.
pub fn normalize_digest(candidate: &str, algorithm: HashAlgorithm) -> Result<String, HostError> {
  let digest: String = candidate
    .chars()
    .filter(|c| !c.is_whitespace())
    .collect::<String>()
    .to_ascii_lowercase();

  if digest.len() != algorithm.hex_len() || hex::decode(&digest).is_err() {
    return Err(HostError::UnexpectedDigest {
      algorithm,
      output: candidate.to_string(),
    });
  }

  Ok(digest)
}

/// Split listing output into entry names.
pub(crate) fn listing_lines(output: &str) -> Vec<String> {
  output
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  const DIGEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

  #[test]
  fn normalize_accepts_uppercase_and_spaces() {
    let spaced = "9F 86 D0 81 88 4C 7D 65 9A 2F EA A0 C5 5A D0 15 A3 BF 4F 1B 2B 0B 82 2C D1 5D 6C 15 B0 F0 0A 08";
    assert_eq!(normalize_digest(spaced, HashAlgorithm::Sha256).unwrap(), DIGEST);
    assert_eq!(
      normalize_digest(&DIGEST.to_uppercase(), HashAlgorithm::Sha256).unwrap(),
      DIGEST
    );
  }

  #[test]
  fn normalize_rejects_wrong_length_or_non_hex() {
    assert!(normalize_digest("abc", HashAlgorithm::Sha256).is_err());
    let not_hex = "z".repeat(64);
    assert!(matches!(
      normalize_digest(&not_hex, HashAlgorithm::Sha256),
      Err(HostError::UnexpectedDigest { .. })
    ));
  }

  #[test]
  fn adapter_selection() {
    assert!(matches!(
      HostAdapter::for_os(Os::Windows, HostMode::Shell),
      HostAdapter::Windows(_)
    ));
    assert!(matches!(
      HostAdapter::for_os(Os::Linux, HostMode::Shell),
      HostAdapter::Posix(_)
    ));
    assert!(matches!(
      HostAdapter::for_os(Os::MacOs, HostMode::Native),
      HostAdapter::Native(_)
    ));
  }

  #[test]
  fn listing_lines_drops_blank_lines() {
    let output = "a.xpi\r\n\r\nb.xpi\n  \n";
    assert_eq!(listing_lines(output), vec!["a.xpi", "b.xpi"]);
  }
}
