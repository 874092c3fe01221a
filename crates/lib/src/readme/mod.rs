//! README badge maintenance.
//!
//! The README carries one install-badge block between two sentinel comments,
//! regenerated on every deploy from a template, plus any number of badge image
//! URLs stamped with the deployed version (`<prefix><label>-v<version>-<rest>`)
//! that follow the version along.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::config::ReadmeConfig;
use crate::consts::{PLACEHOLDER_URL_UPDATES, PLACEHOLDER_VERSION, PLACEHOLDER_XPI_FILEPATH, README_BADGE_END, README_BADGE_START};

const VERSION_PATTERN: &str = r"\d+(?:\.\d+)*";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{(?:VERSION|URL_UPDATES|XPI_FILEPATH)\}").unwrap());

/// Errors that can occur while updating the README.
#[derive(Debug, Error)]
pub enum ReadmeError {
  #[error("README has no `{marker}` marker")]
  MissingMarker { marker: &'static str },

  #[error("README badge end marker precedes the start marker")]
  MisorderedMarkers,

  #[error("invalid badge pattern: {0}")]
  Pattern(#[from] regex::Error),
}

/// Values substituted into the badge template.
#[derive(Debug, Clone, Copy)]
pub struct BadgeValues<'a> {
  pub url_updates: &'a str,
  pub xpi_filepath: &'a str,
  pub version: &'a str,
}

/// Outcome of a README update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadmeUpdate {
  pub content: String,
  /// Version found in the block before the update, if recoverable.
  pub previous_version: Option<String>,
  /// Number of version-stamped badge URLs rewritten.
  pub rewritten: usize,
}

/// Substitute the placeholders in `template`.
pub fn render_template(template: &str, values: &BadgeValues<'_>) -> String {
  template
    .replace(PLACEHOLDER_URL_UPDATES, values.url_updates)
    .replace(PLACEHOLDER_XPI_FILEPATH, values.xpi_filepath)
    .replace(PLACEHOLDER_VERSION, values.version)
}

/// Byte range of the text strictly between the markers.
fn block_range(content: &str) -> Result<(usize, usize), ReadmeError> {
  let start = content.find(README_BADGE_START).ok_or(ReadmeError::MissingMarker {
    marker: README_BADGE_START,
  })?;
  let end = content.find(README_BADGE_END).ok_or(ReadmeError::MissingMarker {
    marker: README_BADGE_END,
  })?;
  let inner_start = start + README_BADGE_START.len();
  if end < inner_start {
    return Err(ReadmeError::MisorderedMarkers);
  }
  Ok((inner_start, end))
}

/// Replace the text between the markers with `"\n" + rendered + "\n"`.
pub fn replace_block(content: &str, rendered: &str) -> Result<String, ReadmeError> {
  let (inner_start, inner_end) = block_range(content)?;
  let mut out = String::with_capacity(content.len() + rendered.len());
  out.push_str(&content[..inner_start]);
  out.push('\n');
  out.push_str(rendered);
  out.push('\n');
  out.push_str(&content[inner_end..]);
  Ok(out)
}

/// Turn the badge template into a pattern capturing the first `{VERSION}`.
fn template_pattern(template: &str) -> Result<Option<Regex>, ReadmeError> {
  let mut pattern = String::new();
  let mut last = 0;
  let mut captured = false;

  for found in PLACEHOLDER.find_iter(template) {
    pattern.push_str(&regex::escape(&template[last..found.start()]));
    match found.as_str() {
      PLACEHOLDER_VERSION if !captured => {
        pattern.push_str(&format!("(?P<version>{VERSION_PATTERN})"));
        captured = true;
      }
      PLACEHOLDER_VERSION => pattern.push_str(VERSION_PATTERN),
      _ => pattern.push_str(".*?"),
    }
    last = found.end();
  }
  pattern.push_str(&regex::escape(&template[last..]));

  if !captured {
    return Ok(None);
  }
  Ok(Some(Regex::new(&pattern)?))
}

/// Version previously rendered into the badge block of `content`.
pub fn recover_previous_version(content: &str, template: &str) -> Result<Option<String>, ReadmeError> {
  let (inner_start, inner_end) = block_range(content)?;
  let Some(pattern) = template_pattern(template)? else {
    return Ok(None);
  };
  Ok(
    pattern
      .captures(&content[inner_start..inner_end])
      .and_then(|caps| caps.name("version"))
      .map(|m| m.as_str().to_string()),
  )
}

/// Rewrite `<prefix><label>-v<old>-` to `<prefix><label>-v<new>-` everywhere.
///
/// Returns the new content and the number of rewritten URLs.
pub fn rewrite_badges(content: &str, prefix: &str, old: &str, new: &str) -> Result<(String, usize), ReadmeError> {
  let pattern = Regex::new(&format!(
    r#"(?P<head>{}[^\s/()"'<>]*?)-v{}-"#,
    regex::escape(prefix),
    regex::escape(old)
  ))?;
  let count = pattern.find_iter(content).count();
  let replacement = format!("${{head}}-v{new}-");
  Ok((pattern.replace_all(content, replacement.as_str()).into_owned(), count))
}

/// Apply a deploy to README `content`: rewrite stamped badges outside the
/// block, then regenerate the block.
pub fn update_content(content: &str, config: &ReadmeConfig, values: &BadgeValues<'_>) -> Result<ReadmeUpdate, ReadmeError> {
  let previous_version = recover_previous_version(content, &config.template)?;
  let rendered = render_template(&config.template, values);

  let (content, rewritten) = match previous_version.as_deref() {
    Some(old) if old != values.version => {
      let (inner_start, inner_end) = block_range(content)?;
      let prefix = &config.badge_url_prefix;
      let (head, before) = rewrite_badges(&content[..inner_start], prefix, old, values.version)?;
      let (tail, after) = rewrite_badges(&content[inner_end..], prefix, old, values.version)?;
      (format!("{head}{}{tail}", &content[inner_start..inner_end]), before + after)
    }
    Some(_) => (content.to_string(), 0),
    None => {
      debug!("no previous badge version found, skipping badge rewrite");
      (content.to_string(), 0)
    }
  };

  let content = replace_block(&content, &rendered)?;

  Ok(ReadmeUpdate {
    content,
    previous_version,
    rewritten,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  const TEMPLATE: &str =
    "[![Install v{VERSION}](https://img.shields.io/badge/install-v{VERSION}-blue)]({URL_UPDATES}/{XPI_FILEPATH})";

  fn values(version: &'static str, xpi: &'static str) -> BadgeValues<'static> {
    BadgeValues {
      url_updates: "https://example.github.io/tab-counter",
      xpi_filepath: xpi,
      version,
    }
  }

  fn config() -> ReadmeConfig {
    ReadmeConfig {
      template: TEMPLATE.to_string(),
      ..ReadmeConfig::default()
    }
  }

  fn readme(block: &str) -> String {
    format!(
      "# Tab Counter\n\n![version](https://img.shields.io/badge/version-v2.0.0-blue)\n\n{README_BADGE_START}\n{block}\n{README_BADGE_END}\n\nFooter text.\n"
    )
  }

  #[test]
  fn renders_all_placeholders() {
    let rendered = render_template(TEMPLATE, &values("1.2.1", "xpi/tab-1.2.1.xpi"));
    assert_eq!(
      rendered,
      "[![Install v1.2.1](https://img.shields.io/badge/install-v1.2.1-blue)](https://example.github.io/tab-counter/xpi/tab-1.2.1.xpi)"
    );
  }

  #[test]
  fn replaces_only_between_markers() {
    let content = format!("before\n{README_BADGE_START}\nold\nstuff\n{README_BADGE_END}\nafter\n");
    let out = replace_block(&content, "new").unwrap();
    assert_eq!(out, format!("before\n{README_BADGE_START}\nnew\n{README_BADGE_END}\nafter\n"));
  }

  #[test]
  fn missing_or_misordered_markers_fail() {
    assert!(matches!(
      replace_block("no markers here", "x"),
      Err(ReadmeError::MissingMarker { .. })
    ));
    let reversed = format!("{README_BADGE_END}\n{README_BADGE_START}\n");
    assert!(matches!(
      replace_block(&reversed, "x"),
      Err(ReadmeError::MisorderedMarkers)
    ));
  }

  #[test]
  fn recovers_version_from_rendered_block() {
    let block = render_template(TEMPLATE, &values("2.0.0", "xpi/tab-2.0.0.xpi"));
    let content = readme(&block);
    assert_eq!(
      recover_previous_version(&content, TEMPLATE).unwrap().as_deref(),
      Some("2.0.0")
    );
  }

  #[test]
  fn unrecoverable_version_is_none() {
    let content = readme("hand written block");
    assert_eq!(recover_previous_version(&content, TEMPLATE).unwrap(), None);
    assert_eq!(recover_previous_version(&content, "no placeholder").unwrap(), None);
  }

  #[test]
  fn rewrite_touches_only_stamped_badges() {
    let content = "![a](https://img.shields.io/badge/version-v2.0.0-blue) ![b](https://img.shields.io/badge/other-v2.0.01-red) ![c](https://example.org/badge/version-v2.0.0-blue)";
    let (out, count) = rewrite_badges(content, "https://img.shields.io/badge/", "2.0.0", "2.1.0").unwrap();
    assert_eq!(count, 1);
    assert!(out.contains("https://img.shields.io/badge/version-v2.1.0-blue"));
    assert!(out.contains("other-v2.0.01-red"));
    assert!(out.contains("https://example.org/badge/version-v2.0.0-blue"));
  }

  #[test]
  fn deploy_moves_block_and_stamped_badges_forward() {
    let block = render_template(TEMPLATE, &values("2.0.0", "xpi/tab-2.0.0.xpi"));
    let content = readme(&block);

    let update = update_content(&content, &config(), &values("2.1.0", "xpi/tab-2.1.0.xpi")).unwrap();

    assert_eq!(update.previous_version.as_deref(), Some("2.0.0"));
    assert!(update.content.contains("https://img.shields.io/badge/version-v2.1.0-blue"));
    assert!(update.content.contains("install-v2.1.0-blue"));
    assert!(update.content.contains("xpi/tab-2.1.0.xpi"));
    assert!(!update.content.contains("2.0.0"));
    assert!(update.content.ends_with("Footer text.\n"));
    assert_eq!(update.rewritten, 1);
  }

  #[test]
  fn update_is_idempotent() {
    let content = readme("placeholder");
    let once = update_content(&content, &config(), &values("1.2.1", "xpi/a-1.2.1.xpi")).unwrap();
    let twice = update_content(&once.content, &config(), &values("1.2.1", "xpi/a-1.2.1.xpi")).unwrap();
    assert_eq!(once.content, twice.content);
    assert_eq!(twice.rewritten, 0);
  }
}
