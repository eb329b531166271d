//! `rally status`: test access to every configured environment.

use anyhow::Result;
use colored::{ColoredString, Colorize};
use futures::future::join_all;

use super::common::CommandContext;
use crate::core::RallyError;

/// Print one access line per configured environment.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    println!("{} {}", "Rally Tools".bold(), format!("v{}", env!("CARGO_PKG_VERSION")).yellow());

    let envs: Vec<String> = ctx.config().environments().map(str::to_string).collect();
    if envs.is_empty() {
        println!("No environments configured. Run '{}' to add one.", "rally config add-api".green());
        return Ok(());
    }

    let client = ctx.repos.client();
    let results = join_all(envs.iter().map(|env| client.test_access(env))).await;
    for (env, result) in envs.iter().zip(results) {
        let label = match result {
            Ok(status) => describe_status(status),
            Err(e) => match e.downcast_ref::<RallyError>() {
                Some(RallyError::UnconfiguredEnv {
                    ..
                }) => "Unconfigured".yellow(),
                Some(RallyError::Timeout {
                    ..
                }) => "Timed out".red(),
                _ => format!("Unreachable ({e})").red(),
            },
        };
        println!("   {env}: {label}");
    }
    Ok(())
}

/// Coloured description of an access test result; `None` is an offline environment.
fn describe_status(status: Option<u16>) -> ColoredString {
    match status {
        None => "OK".green(),
        Some(200) => "200 OK".green(),
        Some(401) => "401 No Access".red(),
        Some(code) if code >= 500 => format!("{code} API Down?").yellow(),
        Some(code) => format!("{code} <unknown>").yellow(),
    }
}
