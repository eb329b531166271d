//! `rally supply calc|replay`.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::common::CommandContext;
use crate::models::Entity;
use crate::snapshot::Snapshot;
use crate::supply_chain::SupplyChain;

/// Supply chain related actions.
#[derive(Args)]
pub struct SupplyCommand {
    #[command(subcommand)]
    action: SupplyAction,
}

#[derive(Subcommand)]
enum SupplyAction {
    /// Calculate the supply chain of a rule
    Calc {
        /// Name, or part of the name, of the starting rule
        rule: String,

        /// Environment the rule lives in (defaults to `default_env`)
        #[arg(short, long)]
        env: Option<String>,

        /// Save the result to the repository directory on behalf of this environment
        #[arg(long)]
        to: Option<String>,

        /// Also write a snapshot of the whole environment to this file
        #[arg(long, value_name = "FILE")]
        capture: Option<PathBuf>,
    },

    /// Calculate a supply chain from a snapshot, without network access
    Replay {
        /// Snapshot file written by `supply calc --capture`
        snapshot: PathBuf,

        /// Name, or part of the name, of the starting rule
        rule: String,

        /// Save the result to the repository directory on behalf of this environment
        #[arg(long)]
        to: Option<String>,
    },
}

impl SupplyCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        match self.action {
            SupplyAction::Calc {
                rule,
                env,
                to,
                capture,
            } => {
                let env = ctx.env(env)?;
                if let Some(path) = capture {
                    let snapshot = Snapshot::capture(&ctx.repos, &env).await?;
                    snapshot.save(&path).await?;
                    ctx.say(format!("Captured {} to {}", env.green(), path.display()));
                }
                run(ctx, &env, &rule, to.as_deref()).await
            }
            SupplyAction::Replay {
                snapshot,
                rule,
                to,
            } => {
                let snapshot = Snapshot::load(&snapshot).await?;
                snapshot.seed(&ctx.repos)?;
                run(ctx, &snapshot.remote, &rule, to.as_deref()).await
            }
        }
    }
}

async fn run(ctx: &CommandContext, env: &str, rule: &str, to: Option<&str>) -> Result<()> {
    let start = ctx.repos.find_rule(env, rule).await?;
    ctx.say(format!("Analyzing supply chain: {}", start.chalk_print(false)));

    let mut chain = SupplyChain::new(start);
    let reporter = ctx.reporter();
    chain.calculate(&ctx.repos, reporter.as_ref()).await?;

    if !ctx.quiet {
        for line in summary_lines(&chain) {
            println!("{line}");
        }
    }

    if let Some(target) = to {
        let sink = ctx.repo_sink()?;
        chain.sync_to(target, &sink).await?;
        ctx.say(format!("Synced supply chain for {} into {}", target.green(), sink.root().display()));
    }
    Ok(())
}

/// The calculated chain, one section per entity kind.
fn summary_lines(chain: &SupplyChain) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(rules) = chain.rules() {
        lines.push(format!("Required rules ({}):", rules.len()));
        lines.extend(rules.display_lines());
    }
    if let Some(presets) = chain.presets() {
        lines.push(format!("Required presets ({}):", presets.len()));
        lines.extend(presets.display_lines());
    }
    if let Some(notifications) = chain.notifications() {
        lines.push(format!("Required notifications ({}):", notifications.len()));
        lines.extend(notifications.iter().map(|n| n.chalk_print(true)));
    }
    lines
}
