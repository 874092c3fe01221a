//! Implementation of the `xpiup help` command.

use xpiup_lib::config::ReleaseConfig;
use xpiup_lib::help::commands_text;

pub fn cmd_help(config: &ReleaseConfig) {
  println!("{}", commands_text(config));
}
