//! The `deploy` flow: record the signed artifact of the current version.
//!
//! Everything that can fail is read and validated before the first write:
//! the artifact is located and hashed, the update manifest reconciled and the
//! README rendered. Then `updates.json` and the README are written and the
//! artifacts of superseded patches are deleted.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::artifact;
use crate::config::{ConfigError, ConflictPolicy, ReleaseConfig};
use crate::gateway::{self, GatewayError};
use crate::host::{Host, HostError};
use crate::manifest::{ExtensionManifest, ManifestError};
use crate::readme::{self, BadgeValues, ReadmeError};
use crate::updates::{ReleaseEntry, UpdateManifest, UpdatesError};
use crate::version::SemanticVersion;

/// Errors that can occur during a deploy.
#[derive(Debug, Error)]
pub enum DeployError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Host(#[from] HostError),

  #[error(transparent)]
  Updates(#[from] UpdatesError),

  #[error(transparent)]
  Readme(#[from] ReadmeError),

  #[error(transparent)]
  Gateway(#[from] GatewayError),

  #[error("{} does not exist and the manifest declares no gecko id to create it for", path.display())]
  NoAddonId { path: PathBuf },

  #[error("refusing to deploy {version}: newer {} already recorded", join_versions(existing))]
  Conflict {
    version: SemanticVersion,
    existing: Vec<SemanticVersion>,
  },
}

fn join_versions(versions: &[SemanticVersion]) -> String {
  versions.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Result of a deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
  /// The artifact was recorded.
  Deployed {
    version: SemanticVersion,
    /// Artifact path relative to the project root.
    artifact: String,
    /// Deleted artifacts of superseded patches.
    removed: Vec<PathBuf>,
    /// Newer patches of the same line that were already recorded.
    conflicts: Vec<SemanticVersion>,
    /// Version-stamped badge URLs moved to the new version.
    badges_rewritten: usize,
  },
  /// No artifact exists for the manifest version; nothing was changed.
  ArtifactMissing { version: String },
}

/// Load the update manifest, or start one for the manifest's gecko id.
async fn load_or_seed(config: &ReleaseConfig, manifest: &ExtensionManifest) -> Result<UpdateManifest, DeployError> {
  let path = config.resolve(&config.updates_path);
  match gateway::read_text(&path).await {
    Ok(text) => Ok(UpdateManifest::parse(&text, &path.display().to_string())?),
    Err(e) if e.is_not_found() => {
      let id = manifest.gecko_id().ok_or(DeployError::NoAddonId { path: path.clone() })?;
      info!(path = %path.display(), addon = id, "creating update manifest");
      Ok(UpdateManifest::new_for(id))
    }
    Err(e) => Err(e.into()),
  }
}

/// Delete the artifact of each superseded version; missing ones are skipped.
async fn remove_superseded<H: Host>(host: &H, config: &ReleaseConfig, superseded: &[SemanticVersion]) -> Vec<PathBuf> {
  let mut removed = Vec::new();

  for version in superseded {
    let located = match artifact::locate(host, config, &version.to_string()).await {
      Ok(Some(found)) => found,
      Ok(None) => {
        debug!(version = %version, "no artifact left for superseded version");
        continue;
      }
      Err(error) => {
        warn!(version = %version, %error, "could not look up superseded artifact");
        continue;
      }
    };

    match gateway::remove_file_if_exists(&located.path).await {
      Ok(true) => {
        info!(path = %located.path.display(), "removed superseded artifact");
        removed.push(located.path);
      }
      Ok(false) => debug!(path = %located.path.display(), "superseded artifact already gone"),
      Err(error) => warn!(%error, "failed to remove superseded artifact"),
    }
  }

  removed
}

/// Run the deploy flow.
pub async fn deploy<H: Host>(config: &ReleaseConfig, host: &H) -> Result<DeployOutcome, DeployError> {
  let update_url = config.require_update_url()?;
  let manifest = ExtensionManifest::load(&config.resolve(&config.manifest_path)).await?;
  let raw_version = manifest.version()?;
  let version = manifest.semantic_version()?;

  let Some(found) = artifact::locate(host, config, raw_version).await? else {
    info!(version = raw_version, dir = %config.artifact_dir, "no artifact for version");
    return Ok(DeployOutcome::ArtifactMissing {
      version: raw_version.to_string(),
    });
  };
  let hash = artifact::integrity(host, &found.path).await?;

  let mut updates = load_or_seed(config, &manifest).await?;
  let plan = updates.plan(version)?;
  if !plan.conflicts.is_empty() && config.deploy.on_conflict == ConflictPolicy::Abort {
    return Err(DeployError::Conflict {
      version,
      existing: plan.conflicts,
    });
  }

  let readme_path = config.resolve(&config.readme_path);
  let readme_text = gateway::read_text(&readme_path).await?;
  let values = BadgeValues {
    url_updates: update_url,
    xpi_filepath: &found.relative,
    version: raw_version,
  };
  let readme_update = readme::update_content(&readme_text, &config.readme, &values)?;

  let entry = ReleaseEntry::new(version, update_url, &found.relative, hash);
  updates.commit(&plan, &entry);
  updates.save(&config.resolve(&config.updates_path)).await?;
  gateway::write_text(&readme_path, &readme_update.content).await?;

  let removed = remove_superseded(host, config, &plan.superseded).await;

  info!(
    version = %version,
    artifact = %found.relative,
    superseded = plan.superseded.len(),
    "deploy recorded"
  );

  Ok(DeployOutcome::Deployed {
    version,
    artifact: found.relative,
    removed,
    conflicts: plan.conflicts,
    badges_rewritten: readme_update.rewritten,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::consts::{README_BADGE_END, README_BADGE_START};
  use crate::host::NativeHost;
  use crate::platform::os::Os;
  use tempfile::TempDir;
  use tracing_test::traced_test;

  const URL: &str = "https://example.github.io/tab-counter";

  struct Project {
    temp: TempDir,
    config: ReleaseConfig,
  }

  impl Project {
    fn new(version: &str, artifacts: &[&str], extra_config: &str) -> Self {
      let temp = TempDir::new().unwrap();
      let root = temp.path();
      std::fs::write(
        root.join("manifest.json"),
        format!(
          "{{\n  \"name\": \"Tab Counter\",\n  \"version\": \"{version}\",\n  \"browser_specific_settings\": {{\n    \"gecko\": {{\n      \"id\": \"tab-counter@example.org\"\n    }}\n  }}\n}}\n"
        ),
      )
      .unwrap();
      std::fs::create_dir(root.join("xpi")).unwrap();
      for name in artifacts {
        std::fs::write(root.join("xpi").join(name), name.as_bytes()).unwrap();
      }
      std::fs::write(
        root.join("README.md"),
        format!("# Tab Counter\n\n{README_BADGE_START}\n{README_BADGE_END}\n"),
      )
      .unwrap();

      let toml = format!(
        "update_url = \"{URL}\"\n{extra_config}\n[readme]\ntemplate = \"[![v{{VERSION}}](https://img.shields.io/badge/install-v{{VERSION}}-blue)]({{URL_UPDATES}}/{{XPI_FILEPATH}})\"\n"
      );
      let config = ReleaseConfig::from_toml(&toml, root.to_path_buf()).unwrap();
      Self { temp, config }
    }

    fn path(&self, relative: &str) -> PathBuf {
      self.temp.path().join(relative)
    }

    fn write(&self, relative: &str, content: &str) {
      std::fs::write(self.path(relative), content).unwrap();
    }

    fn read(&self, relative: &str) -> String {
      std::fs::read_to_string(self.path(relative)).unwrap()
    }

    fn with_updates(self, versions: &[&str]) -> Self {
      let entries = versions
        .iter()
        .map(|v| {
          format!(
            "{{\"version\": \"{v}\", \"update_link\": \"{URL}/xpi/tab_counter-{v}-fx.xpi\", \"update_hash\": \"sha256:00\"}}"
          )
        })
        .collect::<Vec<_>>()
        .join(", ");
      self.write(
        "updates.json",
        &format!("{{\"addons\": {{\"tab-counter@example.org\": {{\"updates\": [{entries}]}}}}}}\n"),
      );
      self
    }

    fn recorded(&self) -> Vec<String> {
      let updates = UpdateManifest::parse(&self.read("updates.json"), "updates.json").unwrap();
      updates.versions().unwrap().iter().map(ToString::to_string).collect()
    }
  }

  fn host() -> NativeHost {
    NativeHost::new(Os::Linux)
  }

  #[tokio::test]
  async fn superseded_patch_is_replaced_and_deleted() {
    let project = Project::new(
      "1.2.1",
      &["tab_counter-1.2.0-fx.xpi", "tab_counter-1.2.1-fx.xpi"],
      "",
    )
    .with_updates(&["1.2.0"]);

    let outcome = deploy(&project.config, &host()).await.unwrap();

    assert_eq!(project.recorded(), vec!["1.2.1"]);
    assert!(!project.path("xpi/tab_counter-1.2.0-fx.xpi").exists());
    assert!(project.path("xpi/tab_counter-1.2.1-fx.xpi").exists());
    match outcome {
      DeployOutcome::Deployed { artifact, removed, .. } => {
        assert_eq!(artifact, "xpi/tab_counter-1.2.1-fx.xpi");
        assert_eq!(removed.len(), 1);
      }
      other => panic!("unexpected outcome: {other:?}"),
    }

    let updates = project.read("updates.json");
    assert!(updates.contains(&format!("\"update_link\": \"{URL}/xpi/tab_counter-1.2.1-fx.xpi\"")));
    assert!(updates.contains("\"update_hash\": \"sha256:"));
  }

  #[tokio::test]
  async fn superseded_patch_without_artifact_is_tolerated() {
    let project = Project::new("1.2.1", &["tab_counter-1.2.1-fx.xpi"], "").with_updates(&["1.2.0"]);

    let outcome = deploy(&project.config, &host()).await.unwrap();

    assert_eq!(project.recorded(), vec!["1.2.1"]);
    match outcome {
      DeployOutcome::Deployed { removed, conflicts, .. } => {
        assert!(removed.is_empty());
        assert!(conflicts.is_empty());
      }
      other => panic!("unexpected outcome: {other:?}"),
    }
  }

  #[tokio::test]
  #[traced_test]
  async fn conflicting_version_is_appended_with_warning() {
    let project = Project::new("1.2.0", &["tab_counter-1.2.0-fx.xpi"], "").with_updates(&["1.2.3"]);

    let outcome = deploy(&project.config, &host()).await.unwrap();

    assert_eq!(project.recorded(), vec!["1.2.3", "1.2.0"]);
    assert!(logs_contain("There is already a version 1.2.3"));
    assert!(matches!(outcome, DeployOutcome::Deployed { conflicts, .. } if conflicts.len() == 1));
  }

  #[tokio::test]
  async fn abort_policy_leaves_files_untouched() {
    let project = Project::new(
      "1.2.0",
      &["tab_counter-1.2.0-fx.xpi"],
      "\n[deploy]\non_conflict = \"abort\"\n",
    )
    .with_updates(&["1.2.3"]);
    let updates_before = project.read("updates.json");
    let readme_before = project.read("README.md");

    let result = deploy(&project.config, &host()).await;

    assert!(matches!(result, Err(DeployError::Conflict { .. })));
    assert_eq!(project.read("updates.json"), updates_before);
    assert_eq!(project.read("README.md"), readme_before);
  }

  #[tokio::test]
  async fn missing_artifact_changes_nothing() {
    let project = Project::new("1.3.0", &["tab_counter-1.2.0-fx.xpi"], "").with_updates(&["1.2.0"]);
    let updates_before = project.read("updates.json");
    let readme_before = project.read("README.md");

    let outcome = deploy(&project.config, &host()).await.unwrap();

    assert_eq!(
      outcome,
      DeployOutcome::ArtifactMissing {
        version: "1.3.0".to_string()
      }
    );
    assert_eq!(project.read("updates.json"), updates_before);
    assert_eq!(project.read("README.md"), readme_before);
  }

  #[tokio::test]
  async fn readme_block_and_stamped_badges_follow_version() {
    let project = Project::new("2.1.0", &["tab_counter-2.1.0-fx.xpi"], "").with_updates(&["2.0.0"]);
    project.write(
      "README.md",
      &format!(
        "# Tab Counter\n\n![version](https://img.shields.io/badge/version-v2.0.0-blue)\n\n{README_BADGE_START}\n[![v2.0.0](https://img.shields.io/badge/install-v2.0.0-blue)]({URL}/xpi/tab_counter-2.0.0-fx.xpi)\n{README_BADGE_END}\n"
      ),
    );

    deploy(&project.config, &host()).await.unwrap();

    let readme = project.read("README.md");
    assert!(readme.contains("https://img.shields.io/badge/version-v2.1.0-blue"));
    assert!(readme.contains(&format!(
      "[![v2.1.0](https://img.shields.io/badge/install-v2.1.0-blue)]({URL}/xpi/tab_counter-2.1.0-fx.xpi)"
    )));
    assert!(!readme.contains("2.0.0"));
    assert_eq!(project.recorded(), vec!["2.0.0", "2.1.0"]);
  }

  #[tokio::test]
  async fn redeploy_is_stable() {
    let project = Project::new("1.0.0", &["tab_counter-1.0.0-fx.xpi"], "");

    deploy(&project.config, &host()).await.unwrap();
    let updates_once = project.read("updates.json");
    let readme_once = project.read("README.md");
    deploy(&project.config, &host()).await.unwrap();

    assert_eq!(project.read("updates.json"), updates_once);
    assert_eq!(project.read("README.md"), readme_once);
  }

  #[tokio::test]
  async fn missing_update_manifest_is_seeded_from_gecko_id() {
    let project = Project::new("1.0.0", &["tab_counter-1.0.0-fx.xpi"], "");

    deploy(&project.config, &host()).await.unwrap();

    let updates = UpdateManifest::parse(&project.read("updates.json"), "updates.json").unwrap();
    assert_eq!(updates.addon_id(), "tab-counter@example.org");
    assert_eq!(project.recorded(), vec!["1.0.0"]);
  }

  #[tokio::test]
  async fn seeding_requires_gecko_id() {
    let project = Project::new("1.0.0", &["tab_counter-1.0.0-fx.xpi"], "");
    project.write("manifest.json", "{\"name\": \"Tab Counter\", \"version\": \"1.0.0\"}");

    let result = deploy(&project.config, &host()).await;
    assert!(matches!(result, Err(DeployError::NoAddonId { .. })));
  }

  #[tokio::test]
  async fn deploy_requires_update_url() {
    let temp = TempDir::new().unwrap();
    let config = ReleaseConfig::with_root(temp.path().to_path_buf()).unwrap();
    let result = deploy(&config, &host()).await;
    assert!(matches!(result, Err(DeployError::Config(ConfigError::Missing { .. }))));
  }

  #[tokio::test]
  async fn malformed_manifest_version_is_fatal() {
    let project = Project::new("1.2", &["tab_counter-1.2-fx.xpi"], "");
    let result = deploy(&project.config, &host()).await;
    assert!(matches!(result, Err(DeployError::Manifest(ManifestError::Version(_)))));
    assert!(!project.path("updates.json").exists());
  }
}
