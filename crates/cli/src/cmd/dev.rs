//! Implementation of the `xpiup dev` command.

use anyhow::{Context, Result};

use xpiup_lib::config::ReleaseConfig;
use xpiup_lib::dev::switch_manifest;

use crate::output::print_success;

/// Switch the working manifest to the platform named in `words`.
pub fn cmd_dev(config: &ReleaseConfig, words: &[String]) -> Result<()> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt
    .block_on(switch_manifest(config, words))
    .context("Failed to switch manifest")?;

  print_success(&format!(
    "{} now uses the {} manifest ({})",
    config.manifest_path.display(),
    result.platform,
    result.source.strip_prefix(&config.root).unwrap_or(&result.source).display()
  ));
  Ok(())
}
