//! `rally rule|preset|provider|notification list`.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::common::CommandContext;
use crate::core::EntityKind;
use crate::models::{Collection, Entity, Provider};

/// Actions on one kind of entity.
#[derive(Args)]
pub struct EntityCommand {
    #[command(subcommand)]
    action: EntityAction,
}

#[derive(Subcommand)]
enum EntityAction {
    /// List every entity of the environment
    List {
        /// Environment to list (defaults to `default_env`)
        #[arg(short, long)]
        env: Option<String>,
    },
}

impl EntityCommand {
    /// Run the action for entities of `kind`.
    pub async fn execute(self, kind: EntityKind, ctx: &CommandContext) -> Result<()> {
        match self.action {
            EntityAction::List {
                env,
            } => {
                let env = ctx.env(env)?;
                ctx.say("Loading...");
                let lines = match kind {
                    EntityKind::Rule => list_lines(&*ctx.repos.rules(&env).await?, kind, &env),
                    EntityKind::Preset => list_lines(&*ctx.repos.presets(&env).await?, kind, &env),
                    EntityKind::Provider => provider_lines(&*ctx.repos.providers(&env).await?, &env),
                    EntityKind::Notification => {
                        list_lines(&*ctx.repos.notifications(&env).await?, kind, &env)
                    }
                };
                for line in lines {
                    println!("{line}");
                }
                Ok(())
            }
        }
    }
}

fn header(count: usize, kind: EntityKind, env: &str) -> String {
    format!("{} {kind}s on {}.", count.to_string().yellow(), env.green())
}

/// Header followed by one padded line per entity.
fn list_lines<T: Entity>(collection: &Collection<T>, kind: EntityKind, env: &str) -> Vec<String> {
    let mut lines = vec![header(collection.len(), kind, env)];
    lines.extend(collection.display_lines());
    lines
}

/// Like [`list_lines`], with each provider's language when known.
fn provider_lines(providers: &Collection<Provider>, env: &str) -> Vec<String> {
    let mut lines = vec![header(providers.len(), EntityKind::Provider, env)];
    lines.extend(providers.iter().map(|provider| match provider.language() {
        Some(lang) => format!("{} ({})", provider.chalk_print(true), lang.dimmed()),
        None => provider.chalk_print(true),
    }));
    lines
}
