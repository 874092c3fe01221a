mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use xpiup_lib::config::ReleaseConfig;
use xpiup_lib::host::HostAdapter;

use crate::cmd::{cmd_build, cmd_deploy, cmd_dev, cmd_help};
use crate::output::print_error;

/// Build and release helper for browser extensions
#[derive(Parser)]
#[command(name = "xpiup")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
  /// Path to the release config (default: xpiup.toml in the working directory)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List the commands
  Help,

  /// Copy a platform manifest over the working manifest
  Dev {
    /// Platform key from the config (e.g. fx, chrome)
    platform: Vec<String>,
  },

  /// Zip the extension
  Build {
    /// Any of: beta, amo, <platform>
    options: Vec<String>,
  },

  /// Record the signed xpi in updates.json and the README
  Deploy,
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
  let cwd = std::env::current_dir().context("Failed to determine working directory")?;
  let config = ReleaseConfig::load(cli.config.as_deref(), &cwd).context("Failed to load config")?;

  match cli.command {
    Commands::Help => {
      cmd_help(&config);
      Ok(ExitCode::SUCCESS)
    }
    Commands::Dev { platform } => cmd_dev(&config, &platform).map(|_| ExitCode::SUCCESS),
    Commands::Build { options } => {
      let host = HostAdapter::detect(config.host).context("Failed to select host adapter")?;
      cmd_build(&config, &options, &host).map(|_| ExitCode::SUCCESS)
    }
    Commands::Deploy => {
      let host = HostAdapter::detect(config.host).context("Failed to select host adapter")?;
      cmd_deploy(&config, &host)
    }
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match run(cli) {
    Ok(code) => code,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
