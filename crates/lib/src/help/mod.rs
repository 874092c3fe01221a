//! The command overview printed by `help`.

use crate::archive::zip_filename;
use crate::config::ReleaseConfig;

const COMMANDS: &str = "\
xpiup help                 prints this help
xpiup dev <platform>       copies the platform manifest over {MANIFEST}
xpiup build                zips the configured files into {ZIP_FILENAME}
xpiup build amo            + opens the AMO page to upload a new version
xpiup build beta           + adds ' [beta]' to the name in the zipped manifest
xpiup build <platform>     + zips with the platform manifest instead
xpiup deploy               adds the xpi to {UPDATES} and {README} + deletes superseded versions";

/// Render the command overview for `config`.
pub fn commands_text(config: &ReleaseConfig) -> String {
  let mut text = COMMANDS
    .replace("{ZIP_FILENAME}", &zip_filename(&config.name, None, false, None))
    .replace("{MANIFEST}", &config.manifest_path.display().to_string())
    .replace("{UPDATES}", &config.updates_path.display().to_string())
    .replace("{README}", &config.readme_path.display().to_string());

  if !config.platforms.is_empty() {
    let names: Vec<&str> = config.platforms.keys().map(String::as_str).collect();
    text.push_str(&format!("\n\nplatforms: {}", names.join(", ")));
  }
  text
}
