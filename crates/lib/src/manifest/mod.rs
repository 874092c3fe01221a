//! Extension manifest editing.
//!
//! The manifest is treated as an opaque JSON object: only the `version`, the
//! `name` and the configured title fields are ever read or touched. Key order
//! and the presence of a trailing newline survive a load/save cycle.

mod guard;

use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::consts::BETA_SUFFIX;
use crate::gateway::{self, GatewayError};
use crate::version::{SemanticVersion, VersionError};

pub use guard::{BetaLabelGuard, ManifestSwap};

/// Field that always receives the beta label.
const NAME_FIELD: &str = "name";

/// Errors that can occur while editing a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error(transparent)]
  Gateway(#[from] GatewayError),

  #[error("failed to parse manifest {origin}: {source}")]
  Parse { origin: String, source: serde_json::Error },

  #[error("manifest {origin} is not a JSON object")]
  NotAnObject { origin: String },

  #[error("failed to serialize manifest: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("manifest has no string field `{field}`")]
  MissingField { field: &'static str },

  #[error("invalid manifest version: {0}")]
  Version(#[from] VersionError),
}

/// A parsed extension manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionManifest {
  document: Map<String, Value>,
  trailing_newline: bool,
}

impl ExtensionManifest {
  /// Parse manifest text. `origin` names the source in errors.
  pub fn parse(text: &str, origin: &str) -> Result<Self, ManifestError> {
    let value: Value = serde_json::from_str(text).map_err(|source| ManifestError::Parse {
      origin: origin.to_string(),
      source,
    })?;

    match value {
      Value::Object(document) => Ok(Self {
        document,
        trailing_newline: text.ends_with('\n'),
      }),
      _ => Err(ManifestError::NotAnObject {
        origin: origin.to_string(),
      }),
    }
  }

  /// Read and parse the manifest at `path`.
  pub async fn load(path: &Path) -> Result<Self, ManifestError> {
    let text = gateway::read_text(path).await?;
    Self::parse(&text, &path.display().to_string())
  }

  /// Serialize with two-space indentation.
  pub fn to_json_string(&self) -> Result<String, ManifestError> {
    let mut out = serde_json::to_string_pretty(&self.document).map_err(ManifestError::Serialize)?;
    if self.trailing_newline {
      out.push('\n');
    }
    Ok(out)
  }

  /// Persist the manifest at `path`.
  pub async fn save(&self, path: &Path) -> Result<(), ManifestError> {
    let text = self.to_json_string()?;
    gateway::write_text(path, &text).await?;
    Ok(())
  }

  /// The raw `version` string.
  pub fn version(&self) -> Result<&str, ManifestError> {
    self
      .document
      .get("version")
      .and_then(Value::as_str)
      .ok_or(ManifestError::MissingField { field: "version" })
  }

  /// The `version` parsed as a semantic version.
  pub fn semantic_version(&self) -> Result<SemanticVersion, ManifestError> {
    Ok(SemanticVersion::parse(self.version()?)?)
  }

  /// Look up a string by dotted path (`browser_action.default_title`).
  pub fn get_str(&self, dotted: &str) -> Option<&str> {
    let mut parts = dotted.split('.');
    let mut current = self.document.get(parts.next()?)?;
    for part in parts {
      current = current.as_object()?.get(part)?;
    }
    current.as_str()
  }

  fn get_str_mut(&mut self, dotted: &str) -> Option<&mut String> {
    let mut parts = dotted.split('.');
    let mut current = self.document.get_mut(parts.next()?)?;
    for part in parts {
      current = current.as_object_mut()?.get_mut(part)?;
    }
    match current {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  /// The addon id declared for Gecko, if any.
  pub fn gecko_id(&self) -> Option<&str> {
    self
      .get_str("browser_specific_settings.gecko.id")
      .or_else(|| self.get_str("applications.gecko.id"))
  }

  /// Append the beta suffix to the name and every present title field.
  ///
  /// Absent fields are left alone. Nothing is written to disk.
  pub fn apply_beta_label(&mut self, title_fields: &[String]) -> &mut Self {
    for field in label_fields(title_fields) {
      if let Some(value) = self.get_str_mut(field) {
        value.push_str(BETA_SUFFIX);
      }
    }
    self
  }

  /// Strip a trailing beta suffix from the name and every present title field.
  pub fn revert_beta_label(&mut self, title_fields: &[String]) -> &mut Self {
    for field in label_fields(title_fields) {
      if let Some(value) = self.get_str_mut(field) {
        if value.ends_with(BETA_SUFFIX) {
          value.truncate(value.len() - BETA_SUFFIX.len());
        }
      }
    }
    self
  }
}

fn label_fields(title_fields: &[String]) -> impl Iterator<Item = &str> {
  std::iter::once(NAME_FIELD).chain(title_fields.iter().map(String::as_str))
}
