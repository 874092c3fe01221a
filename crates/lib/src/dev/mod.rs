//! The `dev` flow: switch the working manifest to a platform variant.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::config::ReleaseConfig;
use crate::gateway::{self, GatewayError};

/// Errors that can occur while switching manifests.
#[derive(Debug, Error)]
pub enum DevError {
  #[error("no platform given; configured platforms: {}", format_platforms(available))]
  MissingPlatform { available: Vec<String> },

  #[error("unknown platform `{name}`; configured platforms: {}", format_platforms(available))]
  UnknownPlatform { name: String, available: Vec<String> },

  #[error(transparent)]
  Gateway(#[from] GatewayError),
}

fn format_platforms(available: &[String]) -> String {
  if available.is_empty() {
    "none (add a [platforms.<name>] table to the config)".to_string()
  } else {
    available.join(", ")
  }
}

/// Outcome of a manifest switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevResult {
  pub platform: String,
  pub source: PathBuf,
}

/// Copy the manifest variant of the first configured platform named in `words`
/// over the working manifest.
pub async fn switch_manifest(config: &ReleaseConfig, words: &[String]) -> Result<DevResult, DevError> {
  let available: Vec<String> = config.platforms.keys().cloned().collect();

  let Some((name, variant)) = words.iter().find_map(|w| config.platforms.get_key_value(w.as_str())) else {
    return Err(match words.first() {
      Some(name) => DevError::UnknownPlatform {
        name: name.clone(),
        available,
      },
      None => DevError::MissingPlatform { available },
    });
  };

  let source = config.resolve(&variant.manifest);
  let manifest = config.resolve(&config.manifest_path);
  gateway::copy_file(&source, &manifest).await?;

  info!(platform = %name, source = %source.display(), "manifest switched");
  Ok(DevResult {
    platform: name.clone(),
    source,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn project() -> (TempDir, ReleaseConfig) {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("manifest.json"), "{\"name\": \"working\"}").unwrap();
    std::fs::write(temp.path().join("manifest.fx.json"), "{\"name\": \"firefox\"}").unwrap();
    std::fs::write(temp.path().join("manifest.chrome.json"), "{\"name\": \"chrome\"}").unwrap();
    let config = ReleaseConfig::from_toml(
      "[platforms.fx]\nmanifest = \"manifest.fx.json\"\n\n[platforms.chrome]\nmanifest = \"manifest.chrome.json\"\n",
      temp.path().to_path_buf(),
    )
    .unwrap();
    (temp, config)
  }

  #[tokio::test]
  async fn copies_variant_over_manifest() {
    let (temp, config) = project();

    let result = switch_manifest(&config, &["chrome".to_string()]).await.unwrap();

    assert_eq!(result.platform, "chrome");
    assert_eq!(
      std::fs::read_to_string(temp.path().join("manifest.json")).unwrap(),
      "{\"name\": \"chrome\"}"
    );
  }

  #[tokio::test]
  async fn unknown_platform_lists_configured_ones() {
    let (temp, config) = project();

    let err = switch_manifest(&config, &["edge".to_string()]).await.unwrap_err();

    assert_eq!(err.to_string(), "unknown platform `edge`; configured platforms: chrome, fx");
    assert_eq!(
      std::fs::read_to_string(temp.path().join("manifest.json")).unwrap(),
      "{\"name\": \"working\"}"
    );
  }

  #[tokio::test]
  async fn missing_platform_is_an_error() {
    let (_temp, config) = project();
    assert!(matches!(
      switch_manifest(&config, &[]).await,
      Err(DevError::MissingPlatform { .. })
    ));
  }
}
