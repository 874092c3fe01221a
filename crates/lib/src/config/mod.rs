//! Release configuration.
//!
//! The configuration is read once from `xpiup.toml` and is immutable afterwards.
//! Every field has a default so a project without a config file still gets
//! sensible `build` behavior; `deploy` additionally requires `update_url`.
//!
//! ```toml
//! name = "tab-counter"
//! update_url = "https://example.github.io/tab-counter"
//! amo_url = "https://addons.mozilla.org/developers/addon/tab-counter/versions/submit/"
//!
//! [archive]
//! output_dir = "zip"
//! include_version = true
//! folders = ["icons", "src"]
//! files = ["manifest.json", "LICENSE"]
//!
//! [readme]
//! template = "[![v{VERSION}](https://img.shields.io/badge/firefox-v{VERSION}-orange)]({URL_UPDATES}/{XPI_FILEPATH})"
//!
//! [platforms.chrome]
//! manifest = "manifest.chrome.json"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::{CONFIG_FILENAME, DEFAULT_BADGE_URL_PREFIX};

/// Errors that can occur while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to parse config {}: {source}", path.display())]
  Parse { path: PathBuf, source: toml::de::Error },

  #[error("failed to resolve project root {}: {source}", path.display())]
  Root { path: PathBuf, source: io::Error },

  #[error("cannot derive an addon name from {}; set `name` in the config", path.display())]
  NoName { path: PathBuf },

  #[error("`{key}` must be set in the config for this command")]
  Missing { key: &'static str },
}

/// Which host adapter performs directory listing and hashing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostMode {
  /// Use the platform's shell commands (`dir`/`certutil`, `ls`/`sha256sum`).
  #[default]
  Shell,
  /// List and hash in process.
  Native,
}

/// What deploy does when a newer patch of the same release line is already recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
  /// Warn and still append the deployed version.
  #[default]
  Append,
  /// Warn and stop before touching any file.
  Abort,
}

/// Zip packaging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
  /// Directory (relative to the project root) the zip is written to.
  pub output_dir: PathBuf,
  /// Whether the manifest version is part of the zip filename.
  pub include_version: bool,
  /// Folders added recursively, stored under their own relative path.
  pub folders: Vec<PathBuf>,
  /// Single files, stored under their parent directory (or the archive root).
  pub files: Vec<PathBuf>,
}

impl Default for ArchiveConfig {
  fn default() -> Self {
    Self {
      output_dir: PathBuf::from("."),
      include_version: false,
      folders: Vec::new(),
      files: vec![PathBuf::from("manifest.json")],
    }
  }
}

/// README badge block settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadmeConfig {
  /// Template rendered between the badge markers.
  pub template: String,
  /// Prefix identifying version-stamped badge URLs elsewhere in the README.
  pub badge_url_prefix: String,
}

impl Default for ReadmeConfig {
  fn default() -> Self {
    Self {
      template: "[![Install v{VERSION}](https://img.shields.io/badge/install-v{VERSION}-blue)]({URL_UPDATES}/{XPI_FILEPATH})"
        .to_string(),
      badge_url_prefix: DEFAULT_BADGE_URL_PREFIX.to_string(),
    }
  }
}

/// Manifest editing settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestConfig {
  /// Dotted paths of nested title fields that receive the beta label when present.
  pub title_fields: Vec<String>,
}

impl Default for ManifestConfig {
  fn default() -> Self {
    Self {
      title_fields: vec![
        "browser_action.default_title".to_string(),
        "action.default_title".to_string(),
        "page_action.default_title".to_string(),
      ],
    }
  }
}

/// Deploy settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
  pub on_conflict: ConflictPolicy,
}

/// A browser-specific manifest variant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
  /// Manifest file (relative to the project root) used for this platform.
  pub manifest: PathBuf,
  /// Suffix appended to the zip name; defaults to the platform key.
  pub suffix: Option<String>,
}

/// On-disk shape of `xpiup.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
  name: Option<String>,
  update_url: Option<String>,
  amo_url: Option<String>,
  manifest_file: Option<PathBuf>,
  updates_file: Option<PathBuf>,
  readme_file: Option<PathBuf>,
  artifact_dir: Option<String>,
  artifact_extension: Option<String>,
  host: HostMode,
  archive: ArchiveConfig,
  readme: ReadmeConfig,
  manifest: ManifestConfig,
  deploy: DeployConfig,
  platforms: BTreeMap<String, PlatformConfig>,
}

/// Immutable settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseConfig {
  /// Project root; every relative path below resolves against it.
  pub root: PathBuf,
  /// Addon name used for zip filenames.
  pub name: String,
  /// Base URL the update links point at.
  pub update_url: Option<String>,
  /// Upload page opened by `build amo`.
  pub amo_url: Option<String>,
  pub manifest_path: PathBuf,
  pub updates_path: PathBuf,
  pub readme_path: PathBuf,
  /// Artifact directory, relative to the root, using `/` separators.
  pub artifact_dir: String,
  pub artifact_extension: String,
  pub host: HostMode,
  pub archive: ArchiveConfig,
  pub readme: ReadmeConfig,
  pub manifest: ManifestConfig,
  pub deploy: DeployConfig,
  pub platforms: BTreeMap<String, PlatformConfig>,
}

impl ReleaseConfig {
  /// Load the configuration for a project.
  ///
  /// With an explicit `path` the file must exist. Without one, `xpiup.toml` in
  /// `cwd` is used when present and defaults apply otherwise. The project root
  /// is the directory containing the config file.
  pub fn load(path: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
    let (config_path, required) = match path {
      Some(p) if p.is_absolute() => (p.to_path_buf(), true),
      Some(p) => (cwd.join(p), true),
      None => (cwd.join(CONFIG_FILENAME), false),
    };

    let raw = match fs::read_to_string(&config_path) {
      Ok(content) => toml::from_str::<RawConfig>(&content).map_err(|source| ConfigError::Parse {
        path: config_path.clone(),
        source,
      })?,
      Err(e) if e.kind() == io::ErrorKind::NotFound && !required => {
        debug!(path = %config_path.display(), "no config file, using defaults");
        RawConfig::default()
      }
      Err(source) => {
        return Err(ConfigError::Read {
          path: config_path,
          source,
        });
      }
    };

    let root_dir = config_path.parent().unwrap_or(cwd);
    let root = dunce::canonicalize(root_dir).map_err(|source| ConfigError::Root {
      path: root_dir.to_path_buf(),
      source,
    })?;

    Self::from_raw(raw, root)
  }

  /// Defaults for a project rooted at `root`.
  pub fn with_root(root: PathBuf) -> Result<Self, ConfigError> {
    Self::from_raw(RawConfig::default(), root)
  }

  /// Parse configuration text for a project rooted at `root`.
  pub fn from_toml(content: &str, root: PathBuf) -> Result<Self, ConfigError> {
    let raw = toml::from_str::<RawConfig>(content).map_err(|source| ConfigError::Parse {
      path: root.join(CONFIG_FILENAME),
      source,
    })?;
    Self::from_raw(raw, root)
  }

  fn from_raw(raw: RawConfig, root: PathBuf) -> Result<Self, ConfigError> {
    let name = match raw.name {
      Some(name) => name,
      None => root
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::NoName { path: root.clone() })?,
    };

    Ok(Self {
      name,
      update_url: raw.update_url.map(|u| u.trim_end_matches('/').to_string()),
      amo_url: raw.amo_url,
      manifest_path: raw.manifest_file.unwrap_or_else(|| PathBuf::from("manifest.json")),
      updates_path: raw.updates_file.unwrap_or_else(|| PathBuf::from("updates.json")),
      readme_path: raw.readme_file.unwrap_or_else(|| PathBuf::from("README.md")),
      artifact_dir: raw
        .artifact_dir
        .map(|d| d.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "xpi".to_string()),
      artifact_extension: raw.artifact_extension.unwrap_or_else(|| ".xpi".to_string()),
      host: raw.host,
      archive: raw.archive,
      readme: raw.readme,
      manifest: raw.manifest,
      deploy: raw.deploy,
      platforms: raw.platforms,
      root,
    })
  }

  /// Resolve a project-relative path.
  pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
    self.root.join(relative)
  }

  /// The update base URL, required by deploy.
  pub fn require_update_url(&self) -> Result<&str, ConfigError> {
    self.update_url.as_deref().ok_or(ConfigError::Missing { key: "update_url" })
  }

  /// Zip suffix for a configured platform.
  pub fn platform_suffix(&self, platform: &str) -> Option<String> {
    self
      .platforms
      .get(platform)
      .map(|p| p.suffix.clone().unwrap_or_else(|| platform.to_string()))
  }
}
