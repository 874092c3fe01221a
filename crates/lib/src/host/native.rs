//! In-process adapter: `read_dir` listing and SHA-256 via `sha2`.

use std::fs;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use super::{HashAlgorithm, Host, HostError};
use crate::gateway::run_command;
use crate::platform::os::Os;

#[derive(Debug, Clone, Copy)]
pub struct NativeHost {
  os: Os,
}

impl NativeHost {
  pub fn new(os: Os) -> Self {
    Self { os }
  }
}

/// Hash a file's contents with a streaming SHA-256.
fn sha256_file(path: &Path) -> std::io::Result<String> {
  let mut file = fs::File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(hex::encode(hasher.finalize()))
}

impl Host for NativeHost {
  async fn list_directory(&self, path: &Path) -> Result<Vec<String>, HostError> {
    let list_err = |source| HostError::List {
      path: path.display().to_string(),
      source,
    };

    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(path).await.map_err(list_err)?;
    while let Some(entry) = dir.next_entry().await.map_err(list_err)? {
      entries.push(entry.file_name().to_string_lossy().to_string());
    }
    // Match the sorted output of `ls` and `dir`.
    entries.sort();
    Ok(entries)
  }

  async fn hash_file(&self, path: &Path, algorithm: HashAlgorithm) -> Result<String, HostError> {
    let owned = path.to_path_buf();
    let result = match algorithm {
      HashAlgorithm::Sha256 => tokio::task::spawn_blocking(move || sha256_file(&owned)).await,
    };

    let digest = result
      .map_err(|join| HostError::Hash {
        path: path.display().to_string(),
        source: std::io::Error::other(join),
      })?
      .map_err(|source| HostError::Hash {
        path: path.display().to_string(),
        source,
      })?;

    debug!(path = %path.display(), digest = %digest, "hashed file");
    Ok(digest)
  }

  async fn open_url(&self, url: &str) -> Result<(), HostError> {
    let (program, args) = self.os.open_command(url);
    run_command(program, &args).await?;
    Ok(())
  }
}
