//! Semantic versions as used by extension manifests.
//!
//! Only the plain `MAJOR.MINOR.PATCH` form is accepted. Two versions are
//! meaningfully ordered only within the same release line (equal major and
//! minor); the patch number decides within a line.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors raised while parsing a version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
  #[error("malformed version '{input}': expected MAJOR.MINOR.PATCH")]
  Malformed { input: String },

  #[error("malformed version '{input}': component '{component}' is not a non-negative integer")]
  InvalidComponent { input: String, component: String },
}

/// A `MAJOR.MINOR.PATCH` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
  pub major: u64,
  pub minor: u64,
  pub patch: u64,
}

impl SemanticVersion {
  pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
    Self { major, minor, patch }
  }

  /// Parse a dotted version string.
  pub fn parse(input: &str) -> Result<Self, VersionError> {
    let parts: Vec<&str> = input.trim().split('.').collect();
    if parts.len() != 3 {
      return Err(VersionError::Malformed {
        input: input.to_string(),
      });
    }

    let component = |part: &str| -> Result<u64, VersionError> {
      if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::InvalidComponent {
          input: input.to_string(),
          component: part.to_string(),
        });
      }
      part.parse().map_err(|_| VersionError::InvalidComponent {
        input: input.to_string(),
        component: part.to_string(),
      })
    };

    Ok(Self {
      major: component(parts[0])?,
      minor: component(parts[1])?,
      patch: component(parts[2])?,
    })
  }

  /// The `(major, minor)` release line this version belongs to.
  pub fn line(&self) -> (u64, u64) {
    (self.major, self.minor)
  }

  pub fn same_line(&self, other: &SemanticVersion) -> bool {
    self.line() == other.line()
  }
}

impl fmt::Display for SemanticVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
  }
}

impl FromStr for SemanticVersion {
  type Err = VersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl Serialize for SemanticVersion {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for SemanticVersion {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Self::parse(&raw).map_err(serde::de::Error::custom)
  }
}
