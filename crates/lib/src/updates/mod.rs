//! The update manifest (`updates.json`) and release reconciliation.
//!
//! The document is kept as raw JSON so unknown fields survive a rewrite; only
//! the `version` of each release entry is interpreted. Reconciliation is split
//! into a pure [`UpdateManifest::plan`] and a [`UpdateManifest::commit`] so a
//! caller can refuse a conflicting plan before anything is written.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::gateway::{self, GatewayError};
use crate::version::{SemanticVersion, VersionError};

/// Errors that can occur while reading or rewriting the update manifest.
#[derive(Debug, Error)]
pub enum UpdatesError {
  #[error(transparent)]
  Gateway(#[from] GatewayError),

  #[error("failed to parse update manifest {origin}: {source}")]
  Parse { origin: String, source: serde_json::Error },

  #[error("update manifest {origin} is malformed: {message}")]
  Shape { origin: String, message: String },

  #[error("release entry {index} has an invalid version: {source}")]
  EntryVersion { index: usize, source: VersionError },

  #[error("failed to serialize update manifest: {0}")]
  Serialize(#[source] serde_json::Error),
}

static OBJECT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\},\n\s+\{").unwrap());

/// One recorded release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEntry {
  pub version: SemanticVersion,
  pub update_link: String,
  pub update_hash: String,
}

impl ReleaseEntry {
  /// Entry pointing at `<update_url>/<artifact>` with the given integrity string.
  pub fn new(version: SemanticVersion, update_url: &str, artifact: &str, update_hash: String) -> Self {
    Self {
      version,
      update_link: format!("{}/{}", update_url.trim_end_matches('/'), artifact),
      update_hash,
    }
  }

  fn to_value(&self) -> Value {
    json!({
      "version": self.version.to_string(),
      "update_link": self.update_link,
      "update_hash": self.update_hash,
    })
  }
}

/// Result of reconciling the recorded releases against a new version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
  /// Indices of the existing entries that stay, in their original order.
  pub retained: Vec<usize>,
  /// Older patches of the new version's line; their artifacts are deleted.
  pub superseded: Vec<SemanticVersion>,
  /// Newer patches of the new version's line that are already recorded.
  pub conflicts: Vec<SemanticVersion>,
}

/// Decide which existing releases survive the addition of `new`.
///
/// Entries on other release lines are kept. Within the line an equal patch is
/// replaced, a lower patch is superseded and a higher patch is kept and
/// reported as a conflict.
pub fn reconcile(existing: &[SemanticVersion], new: SemanticVersion) -> Reconciliation {
  let mut plan = Reconciliation::default();

  for (index, version) in existing.iter().enumerate() {
    if !version.same_line(&new) {
      plan.retained.push(index);
    } else if new.patch < version.patch {
      warn!(existing = %version, deploying = %new, "There is already a version {}", version);
      plan.retained.push(index);
      plan.conflicts.push(*version);
    } else if new.patch > version.patch {
      debug!(superseded = %version, "superseding older patch");
      plan.superseded.push(*version);
    } else {
      debug!(version = %version, "replacing existing entry");
    }
  }

  plan
}

/// The parsed update manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateManifest {
  document: Map<String, Value>,
  addon_id: String,
  trailing_newline: bool,
}

impl UpdateManifest {
  /// Parse update manifest text. The first key under `addons` is the addon.
  pub fn parse(text: &str, origin: &str) -> Result<Self, UpdatesError> {
    let shape = |message: &str| UpdatesError::Shape {
      origin: origin.to_string(),
      message: message.to_string(),
    };

    let value: Value = serde_json::from_str(text).map_err(|source| UpdatesError::Parse {
      origin: origin.to_string(),
      source,
    })?;
    let Value::Object(document) = value else {
      return Err(shape("top level is not an object"));
    };

    let addon_id = document
      .get("addons")
      .and_then(Value::as_object)
      .ok_or_else(|| shape("missing `addons` object"))?
      .iter()
      .next()
      .map(|(id, addon)| (id.clone(), addon))
      .ok_or_else(|| shape("`addons` is empty"))
      .and_then(|(id, addon)| match addon.get("updates") {
        Some(Value::Array(_)) => Ok(id),
        _ => Err(shape("addon has no `updates` array")),
      })?;

    Ok(Self {
      document,
      addon_id,
      trailing_newline: text.ends_with('\n'),
    })
  }

  /// Empty manifest for `addon_id`.
  pub fn new_for(addon_id: &str) -> Self {
    let mut addon = Map::new();
    addon.insert("updates".to_string(), Value::Array(Vec::new()));
    let mut addons = Map::new();
    addons.insert(addon_id.to_string(), Value::Object(addon));
    let mut document = Map::new();
    document.insert("addons".to_string(), Value::Object(addons));
    Self {
      document,
      addon_id: addon_id.to_string(),
      trailing_newline: true,
    }
  }

  /// Read and parse the manifest at `path`.
  pub async fn load(path: &Path) -> Result<Self, UpdatesError> {
    let text = gateway::read_text(path).await?;
    Self::parse(&text, &path.display().to_string())
  }

  pub fn addon_id(&self) -> &str {
    &self.addon_id
  }

  fn updates(&self) -> &[Value] {
    self
      .document
      .get("addons")
      .and_then(|addons| addons.get(&self.addon_id))
      .and_then(|addon| addon.get("updates"))
      .and_then(Value::as_array)
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  fn updates_mut(&mut self) -> Option<&mut Vec<Value>> {
    self
      .document
      .get_mut("addons")?
      .get_mut(&self.addon_id)?
      .get_mut("updates")?
      .as_array_mut()
  }

  /// Versions of the recorded releases, in document order.
  pub fn versions(&self) -> Result<Vec<SemanticVersion>, UpdatesError> {
    self
      .updates()
      .iter()
      .enumerate()
      .map(|(index, entry)| {
        let raw = entry.get("version").and_then(Value::as_str).unwrap_or_default();
        SemanticVersion::parse(raw).map_err(|source| UpdatesError::EntryVersion { index, source })
      })
      .collect()
  }

  /// Reconcile the recorded releases against `version` without changing anything.
  pub fn plan(&self, version: SemanticVersion) -> Result<Reconciliation, UpdatesError> {
    Ok(reconcile(&self.versions()?, version))
  }

  /// Drop the entries `plan` does not retain and append `entry`.
  pub fn commit(&mut self, plan: &Reconciliation, entry: &ReleaseEntry) {
    let Some(updates) = self.updates_mut() else {
      return;
    };
    let previous = std::mem::take(updates);
    updates.extend(
      previous
        .into_iter()
        .enumerate()
        .filter(|(index, _)| plan.retained.contains(index))
        .map(|(_, value)| value),
    );
    updates.push(entry.to_value());
  }

  /// Pretty JSON with consecutive array objects joined as `}, {`.
  pub fn to_json_string(&self) -> Result<String, UpdatesError> {
    let pretty = serde_json::to_string_pretty(&self.document).map_err(UpdatesError::Serialize)?;
    let mut out = OBJECT_RUN.replace_all(&pretty, "}, {").into_owned();
    if self.trailing_newline {
      out.push('\n');
    }
    Ok(out)
  }

  /// Persist the manifest at `path`.
  pub async fn save(&self, path: &Path) -> Result<(), UpdatesError> {
    let text = self.to_json_string()?;
    gateway::write_text(path, &text).await?;
    Ok(())
  }
}
