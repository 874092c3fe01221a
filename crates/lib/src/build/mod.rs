//! The `build` flow: package the extension into a zip.
//!
//! Manifest mutations made for the build (platform variant, beta label) are
//! held by guards and undone whether archiving succeeds or not.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::archive::{self, ArchiveError};
use crate::config::ReleaseConfig;
use crate::gateway::{self, GatewayError};
use crate::host::{Host, HostError};
use crate::manifest::{BetaLabelGuard, ExtensionManifest, ManifestError, ManifestSwap};

/// Errors that can occur during a build.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error(transparent)]
  Gateway(#[from] GatewayError),

  #[error("failed to open the upload page: {0}")]
  Host(#[from] HostError),
}

/// Options read from the words following `build`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
  pub beta: bool,
  pub amo: bool,
  pub platform: Option<String>,
}

impl BuildOptions {
  /// Interpret `beta`, `amo` and a configured platform key; other words are ignored.
  pub fn from_words(words: &[String], config: &ReleaseConfig) -> Self {
    let mut options = Self::default();
    for word in words {
      match word.as_str() {
        "beta" => options.beta = true,
        "amo" => options.amo = true,
        w if config.platforms.contains_key(w) => {
          if options.platform.is_none() {
            options.platform = Some(w.to_string());
          }
        }
        other => warn!(word = other, "ignoring unknown build option"),
      }
    }
    options
  }
}

/// Outcome of a build.
#[derive(Debug, Clone)]
pub struct BuildResult {
  pub archive: PathBuf,
  pub version: String,
  pub entries: usize,
  /// Whether the upload page was opened.
  pub opened_upload_page: bool,
}

/// Run the build flow.
pub async fn build<H: Host>(config: &ReleaseConfig, options: &BuildOptions, host: &H) -> Result<BuildResult, BuildError> {
  let manifest_path = config.resolve(&config.manifest_path);

  let (swap, suffix) = match options.platform.as_deref() {
    Some(platform) => match config.platforms.get(platform) {
      Some(variant) => (
        Some(ManifestSwap::swap(&manifest_path, &config.resolve(&variant.manifest)).await?),
        config.platform_suffix(platform),
      ),
      None => (None, None),
    },
    None => (None, None),
  };

  let version = ExtensionManifest::load(&manifest_path).await?.version()?.to_string();
  let zip_name = archive::zip_filename(
    &config.name,
    config.archive.include_version.then_some(version.as_str()),
    options.beta,
    suffix.as_deref(),
  );
  let output_dir = config.resolve(&config.archive.output_dir);
  let target = output_dir.join(&zip_name);

  let beta = if options.beta {
    Some(BetaLabelGuard::apply(&manifest_path, &config.manifest.title_fields).await?)
  } else {
    None
  };

  let packaged = package(config, &output_dir, &target).await;

  if let Some(guard) = beta {
    guard.restore().await?;
  }
  if let Some(swap) = swap {
    swap.restore().await?;
  }
  let summary = packaged?;

  info!(archive = %zip_name, version = %version, beta = options.beta, "build complete");

  let opened_upload_page = match (options.amo, config.amo_url.as_deref()) {
    (true, Some(url)) => {
      host.open_url(url).await?;
      true
    }
    (true, None) => {
      warn!("`amo` requested but no amo_url is configured");
      false
    }
    (false, _) => false,
  };

  Ok(BuildResult {
    archive: summary.path,
    version,
    entries: summary.entries,
    opened_upload_page,
  })
}

async fn package(config: &ReleaseConfig, output_dir: &Path, target: &Path) -> Result<archive::ArchiveSummary, BuildError> {
  if gateway::remove_file_if_exists(target).await? {
    info!(path = %target.display(), "removed previous archive");
  }
  gateway::create_dir_all(output_dir).await?;

  let entries = archive::collect_entries(&config.root, &config.archive.folders, &config.archive.files)?;
  Ok(archive::create_archive(target, entries).await?)
}
