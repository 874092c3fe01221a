//! Implementation of the `xpiup build` command.

use std::time::Instant;

use anyhow::{Context, Result};

use xpiup_lib::build::{BuildOptions, build};
use xpiup_lib::config::ReleaseConfig;
use xpiup_lib::host::HostAdapter;

use crate::output::{format_bytes, format_duration, print_info, print_stat, print_success, print_warning};

/// Zip the extension using the options named in `words`.
pub fn cmd_build(config: &ReleaseConfig, words: &[String], host: &HostAdapter) -> Result<()> {
  let start = Instant::now();
  let options = BuildOptions::from_words(words, config);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(build(config, &options, host)).context("Build failed")?;

  let shown = result.archive.strip_prefix(&config.root).unwrap_or(&result.archive);
  print_success(&format!("created {}", shown.display()));
  print_stat("version", &result.version);
  print_stat("files", &result.entries.to_string());
  if let Ok(meta) = std::fs::metadata(&result.archive) {
    print_stat("size", &format_bytes(meta.len()));
  }
  print_stat("time", &format_duration(start.elapsed()));

  if result.opened_upload_page {
    print_info("opened the AMO upload page");
  } else if options.amo {
    print_warning("`amo` given but no amo_url is configured");
  }
  Ok(())
}
