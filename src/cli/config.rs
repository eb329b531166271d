//! `rally config`: inspect and edit the global configuration.
//!
//! API keys are never printed; `show` masks them.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::config::{ApiConfig, GlobalConfig};

/// Command to manage the global configuration file.
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Show the configuration with API keys masked (default)
    Show,

    /// Print the path of the configuration file
    Path,

    /// Add or replace the API section of an environment
    AddApi {
        /// Environment name, e.g. `DEV`
        env: String,

        /// API root, e.g. `https://discovery-dev.sdvi.com/api/v2`
        url: String,

        /// API key
        key: String,

        /// Refuse mutating requests against this environment (only meaningful for `UAT`)
        #[arg(long)]
        restrict_uat: bool,
    },

    /// Remove the API section of an environment
    RemoveApi {
        env: String,
    },

    /// Environment used when `--env` is not given
    SetDefaultEnv {
        env: String,
    },

    /// Directory `supply calc --to` writes into
    SetRepodir {
        path: PathBuf,
    },
}

impl ConfigCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let path = GlobalConfig::resolve_path(config_path)?;
        match self.command {
            Some(ConfigSubcommands::Show) | None => Self::show(&path).await,
            Some(ConfigSubcommands::Path) => {
                println!("{}", path.display());
                Ok(())
            }
            Some(ConfigSubcommands::AddApi {
                env,
                url,
                key,
                restrict_uat,
            }) => {
                let api = ApiConfig {
                    url,
                    key,
                    restrict_uat,
                };
                update(&path, |config| config.add_api(env.clone(), api)).await?;
                println!("✅ Configured environment '{}'", env.green());
                Ok(())
            }
            Some(ConfigSubcommands::RemoveApi {
                env,
            }) => {
                let mut removed = false;
                update(&path, |config| removed = config.api.remove(&env).is_some()).await?;
                if removed {
                    println!("✅ Removed environment '{}'", env.green());
                } else {
                    println!("⚠️  Environment '{env}' was not configured");
                }
                Ok(())
            }
            Some(ConfigSubcommands::SetDefaultEnv {
                env,
            }) => {
                update(&path, |config| config.default_env = Some(env.clone())).await?;
                println!("✅ Default environment is now '{}'", env.green());
                Ok(())
            }
            Some(ConfigSubcommands::SetRepodir {
                path: repodir,
            }) => {
                update(&path, |config| config.repodir = Some(repodir.clone())).await?;
                println!("✅ Repository directory is now {}", repodir.display());
                Ok(())
            }
        }
    }

    async fn show(path: &Path) -> Result<()> {
        let config = GlobalConfig::load_with_optional(Some(path.to_path_buf())).await?;

        println!("{}", "Global Configuration".bold());
        println!("Location: {}\n", path.display());

        if config.api.is_empty() {
            println!("No environments configured.");
            println!("\n{}", "Tip:".yellow());
            println!("  Run 'rally config add-api <ENV> <URL> <KEY>' to add one");
        } else {
            println!("{}", toml::to_string_pretty(&masked(config))?);
        }
        Ok(())
    }
}

/// Load, edit and save the configuration at `path`.
async fn update(path: &Path, edit: impl FnOnce(&mut GlobalConfig)) -> Result<()> {
    let mut config = GlobalConfig::load_with_optional(Some(path.to_path_buf())).await?;
    edit(&mut config);
    config.save_to(path).await
}

fn masked(mut config: GlobalConfig) -> GlobalConfig {
    for api in config.api.values_mut() {
        api.key = mask_key(&api.key);
    }
    config
}

/// Keep the last four characters of a key and hide the rest.
fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("{}{tail}", "*".repeat(count - 4))
}
