//! Implementation of the `xpiup deploy` command.

use std::process::ExitCode;

use anyhow::{Context, Result};

use xpiup_lib::config::ReleaseConfig;
use xpiup_lib::deploy::{DeployOutcome, deploy};
use xpiup_lib::host::HostAdapter;

use crate::output::{print_error, print_info, print_success, print_warning, symbols};

/// Record the artifact of the manifest's version.
///
/// A missing artifact is reported and exits with status 1 without touching
/// any file.
pub fn cmd_deploy(config: &ReleaseConfig, host: &HostAdapter) -> Result<ExitCode> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = rt.block_on(deploy(config, host)).context("Deploy failed")?;

  match outcome {
    DeployOutcome::ArtifactMissing { version } => {
      print_error(&format!(
        "You need to download the {} of v{} before you can run this deploy script",
        config.artifact_extension, version
      ));
      Ok(ExitCode::FAILURE)
    }
    DeployOutcome::Deployed {
      artifact,
      removed,
      conflicts,
      badges_rewritten,
      ..
    } => {
      for existing in &conflicts {
        print_warning(&format!("There is already a version {}", existing));
      }
      for path in &removed {
        let shown = path.strip_prefix(&config.root).unwrap_or(path);
        print_info(&format!("{} removed {}", symbols::MINUS, shown.display()));
      }
      if badges_rewritten > 0 {
        print_info(&format!("{} badge URL(s) moved to the new version", badges_rewritten));
      }
      print_success(&format!(
        "added {} to {} and {}",
        artifact,
        config.updates_path.display(),
        config.readme_path.display()
      ));
      Ok(ExitCode::SUCCESS)
    }
  }
}
