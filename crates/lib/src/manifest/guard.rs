//! Scoped manifest mutations.
//!
//! Both guards persist their mutation on creation and undo it in `restore()`.
//! A guard dropped without `restore()` (early return, panic, cancelled future)
//! undoes the mutation synchronously in `Drop`.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{ExtensionManifest, ManifestError};
use crate::gateway;

/// Keeps the beta label applied to the manifest on disk while alive.
#[derive(Debug)]
pub struct BetaLabelGuard {
  path: PathBuf,
  manifest: ExtensionManifest,
  title_fields: Vec<String>,
  active: bool,
}

impl BetaLabelGuard {
  /// Load the manifest at `path`, apply the beta label and persist it.
  pub async fn apply(path: &Path, title_fields: &[String]) -> Result<Self, ManifestError> {
    let mut manifest = ExtensionManifest::load(path).await?;
    manifest.apply_beta_label(title_fields);

    // Armed before the write so a failed write still reverts.
    let guard = Self {
      path: path.to_path_buf(),
      manifest,
      title_fields: title_fields.to_vec(),
      active: true,
    };
    guard.manifest.save(&guard.path).await?;
    debug!(path = %guard.path.display(), "beta label applied");
    Ok(guard)
  }

  /// Revert the label and persist the manifest.
  pub async fn restore(mut self) -> Result<(), ManifestError> {
    self.manifest.revert_beta_label(&self.title_fields);
    self.active = false;
    self.manifest.save(&self.path).await?;
    debug!(path = %self.path.display(), "beta label reverted");
    Ok(())
  }
}

impl Drop for BetaLabelGuard {
  fn drop(&mut self) {
    if !self.active {
      return;
    }
    self.manifest.revert_beta_label(&self.title_fields);
    let result = self
      .manifest
      .to_json_string()
      .map_err(|e| e.to_string())
      .and_then(|text| std::fs::write(&self.path, text).map_err(|e| e.to_string()));
    match result {
      Ok(()) => debug!(path = %self.path.display(), "beta label reverted on drop"),
      Err(error) => warn!(path = %self.path.display(), %error, "failed to revert beta label"),
    }
  }
}

/// Keeps a platform manifest variant in place of the working manifest while alive.
#[derive(Debug)]
pub struct ManifestSwap {
  path: PathBuf,
  original: String,
  active: bool,
}

impl ManifestSwap {
  /// Copy `variant` over `path`, remembering the original content.
  pub async fn swap(path: &Path, variant: &Path) -> Result<Self, ManifestError> {
    let original = gateway::read_text(path).await?;
    let swap = Self {
      path: path.to_path_buf(),
      original,
      active: true,
    };
    gateway::copy_file(variant, path).await?;
    debug!(path = %path.display(), variant = %variant.display(), "manifest variant swapped in");
    Ok(swap)
  }

  /// Write the original manifest back.
  pub async fn restore(mut self) -> Result<(), ManifestError> {
    self.active = false;
    gateway::write_text(&self.path, &self.original).await?;
    debug!(path = %self.path.display(), "original manifest restored");
    Ok(())
  }
}

impl Drop for ManifestSwap {
  fn drop(&mut self) {
    if !self.active {
      return;
    }
    match std::fs::write(&self.path, &self.original) {
      Ok(()) => debug!(path = %self.path.display(), "original manifest restored on drop"),
      Err(error) => warn!(path = %self.path.display(), %error, "failed to restore manifest"),
    }
  }
}
