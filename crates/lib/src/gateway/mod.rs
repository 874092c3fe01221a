//! Awaitable file operations with uniform error reporting.
//!
//! Every operation names the path it failed on. Best-effort deletion is
//! expressed as an explicit NotFound filter so other failures still surface.

pub mod shell;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub use shell::{CommandOutput, ShellError, run_command};

/// Errors raised by the file gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to write {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },

  #[error("failed to delete {}: {source}", path.display())]
  Delete { path: PathBuf, source: io::Error },

  #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
  Copy {
    from: PathBuf,
    to: PathBuf,
    source: io::Error,
  },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: io::Error },
}

impl GatewayError {
  /// Whether the underlying I/O error is `NotFound`.
  pub fn is_not_found(&self) -> bool {
    let source = match self {
      GatewayError::Read { source, .. }
      | GatewayError::Write { source, .. }
      | GatewayError::Delete { source, .. }
      | GatewayError::Copy { source, .. }
      | GatewayError::CreateDir { source, .. } => source,
    };
    source.kind() == io::ErrorKind::NotFound
  }
}

/// Read a UTF-8 text file.
pub async fn read_text(path: &Path) -> Result<String, GatewayError> {
  tokio::fs::read_to_string(path).await.map_err(|source| GatewayError::Read {
    path: path.to_path_buf(),
    source,
  })
}

/// Write a text file, replacing any existing content.
pub async fn write_text(path: &Path, content: &str) -> Result<(), GatewayError> {
  debug!(path = %path.display(), bytes = content.len(), "writing file");
  tokio::fs::write(path, content).await.map_err(|source| GatewayError::Write {
    path: path.to_path_buf(),
    source,
  })
}

/// Delete a file.
pub async fn remove_file(path: &Path) -> Result<(), GatewayError> {
  debug!(path = %path.display(), "deleting file");
  tokio::fs::remove_file(path).await.map_err(|source| GatewayError::Delete {
    path: path.to_path_buf(),
    source,
  })
}

/// Delete a file, treating an already missing file as success.
///
/// Returns whether a file was removed.
pub async fn remove_file_if_exists(path: &Path) -> Result<bool, GatewayError> {
  match remove_file(path).await {
    Ok(()) => Ok(true),
    Err(e) if e.is_not_found() => Ok(false),
    Err(e) => Err(e),
  }
}

/// Copy `from` over `to`.
pub async fn copy_file(from: &Path, to: &Path) -> Result<(), GatewayError> {
  debug!(from = %from.display(), to = %to.display(), "copying file");
  tokio::fs::copy(from, to)
    .await
    .map(|_| ())
    .map_err(|source| GatewayError::Copy {
      from: from.to_path_buf(),
      to: to.to_path_buf(),
      source,
    })
}

/// Create a directory and its parents; existing directories are fine.
pub async fn create_dir_all(path: &Path) -> Result<(), GatewayError> {
  tokio::fs::create_dir_all(path)
    .await
    .map_err(|source| GatewayError::CreateDir {
      path: path.to_path_buf(),
      source,
    })
}
