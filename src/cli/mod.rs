//! Command-line interface for Rally Tools.
//!
//! The CLI is a thin layer over the library: every command builds a
//! [`CommandContext`](common::CommandContext) from the global configuration and
//! calls into [`Repositories`](crate::repository::Repositories),
//! [`SupplyChain`](crate::supply_chain::SupplyChain) or
//! [`Snapshot`](crate::snapshot::Snapshot).
//!
//! # Available Commands
//!
//! - `rule list`, `preset list`, `provider list`, `notification list` - list the
//!   entities of an environment
//! - `supply calc` - calculate (and optionally save) the supply chain of a rule
//! - `supply replay` - calculate a supply chain from a captured snapshot
//! - `status` - test access to every configured environment
//! - `config` - inspect and edit `~/.rally/config.toml`
//!
//! # Global Options
//!
//! - `--verbose` - debug logging and a per-rule traversal report
//! - `--quiet` - errors only
//! - `--no-progress` - no spinners
//! - `--no-protect` - allow mutating requests against protected environments
//! - `--config` - path to a custom config file
//!
//! # Example
//!
//! ```bash
//! rally rule list -e DEV
//! rally supply calc "Ingest" -e DEV --to UAT
//! rally --no-progress supply calc "Ingest" -e DEV --capture dev.json
//! rally supply replay dev.json "Ingest"
//! ```

pub mod common;
mod config;
mod entities;
mod status;
mod supply;


use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::core::EntityKind;
use common::CommandContext;

/// Runtime configuration derived from the global flags.
///
/// Passed explicitly to commands instead of being written to the process
/// environment, so tests can build one directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Log filter for the tracing subscriber, e.g. `"debug"`.
    pub log_level: String,
    pub verbose: bool,
    pub quiet: bool,
    pub no_progress: bool,
    /// Allow mutating requests against `PROD` and restricted `UAT`.
    pub danger_modify: bool,
    /// Custom path to the global configuration file.
    pub config_path: Option<PathBuf>,
}

/// Rally Tools: inspect SDVI Rally environments and calculate supply chains.
#[derive(Parser)]
#[command(name = "rally", about = "Rally Tools - inspect Rally environments and their supply chains", version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output and the per-rule traversal report
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a custom global configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Allow mutating requests against protected environments
    #[arg(long, global = true)]
    no_protect: bool,

    /// Disable spinners
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Workflow rule actions
    Rule(entities::EntityCommand),

    /// Preset actions
    Preset(entities::EntityCommand),

    /// Provider type actions
    Provider(entities::EntityCommand),

    /// Notification preset actions
    Notification(entities::EntityCommand),

    /// Supply chain actions
    Supply(supply::SupplyCommand),

    /// Test access to every configured environment
    Status,

    /// Manage the global configuration
    Config(config::ConfigCommand),
}

impl Cli {
    /// Execute the CLI with configuration built from its own flags.
    ///
    /// # Errors
    ///
    /// Returns the error of the executed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    ///
    /// `--verbose` logs at `debug`, `--quiet` at `error`, otherwise `warn`.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            verbose: self.verbose,
            quiet: self.quiet,
            no_progress: self.no_progress,
            danger_modify: self.no_protect,
            config_path: self.config.clone(),
        }
    }

    /// Execute the CLI with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns the error of the executed command.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let context = || CommandContext::load(&config);

        match self.command {
            Commands::Rule(cmd) => cmd.execute(EntityKind::Rule, &context().await?).await,
            Commands::Preset(cmd) => cmd.execute(EntityKind::Preset, &context().await?).await,
            Commands::Provider(cmd) => cmd.execute(EntityKind::Provider, &context().await?).await,
            Commands::Notification(cmd) => {
                cmd.execute(EntityKind::Notification, &context().await?).await
            }
            Commands::Supply(cmd) => cmd.execute(&context().await?).await,
            Commands::Status => status::execute(&context().await?).await,
            Commands::Config(cmd) => cmd.execute(config.config_path.clone()).await,
        }
    }
}
