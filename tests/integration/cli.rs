//! Commands run through `Cli` against a temporary configuration

use clap::Parser;
use rally_cli::cli::Cli;
use rally_cli::config::GlobalConfig;
use rally_cli::core::RallyError;
use rally_cli::snapshot::Snapshot;

use crate::common::TestWorkspace;
use crate::supply_chain::ingest_environment;

async fn run(workspace: &TestWorkspace, args: &[&str]) -> anyhow::Result<()> {
    let config_path = workspace.config_path();
    let mut argv = vec!["rally", "--quiet", "--no-progress", "--config"];
    argv.push(config_path.to_str().unwrap());
    argv.extend_from_slice(args);

    let cli = Cli::try_parse_from(argv).unwrap();
    let config = cli.build_config();
    cli.execute_with_config(config).await
}

#[tokio::test]
async fn test_config_commands_edit_the_given_file() {
    let workspace = TestWorkspace::new();

    run(&workspace, &["config", "add-api", "DEV", "https://dev.example.com/api/v2", "secret"]).await.unwrap();
    run(&workspace, &["config", "set-default-env", "DEV"]).await.unwrap();
    run(&workspace, &["config", "show"]).await.unwrap();

    let config = GlobalConfig::load_from(&workspace.config_path()).await.unwrap();
    assert_eq!(config.api("DEV").unwrap().key, "secret");
    assert_eq!(config.default_env.as_deref(), Some("DEV"));
}

#[tokio::test]
async fn test_supply_replay_syncs_into_repodir() {
    let workspace = TestWorkspace::new();
    workspace.write_config().await;

    let snapshot_path = workspace.temp.path().join("dev.json");
    let env = ingest_environment();
    Snapshot::capture(&env.repos(), "DEV").await.unwrap().save(&snapshot_path).await.unwrap();

    run(
        &workspace,
        &["supply", "replay", snapshot_path.to_str().unwrap(), "Ingest Start", "--to", "UAT"],
    )
    .await
    .unwrap();

    let rule = workspace.read_saved("rules/Ingest Start.json");
    assert_eq!(rule["attributes"]["name"], "Ingest Start");
    let preset = workspace.read_saved("presets/Helper Library.json");
    assert_eq!(preset["attributes"]["providerData"], "notify('Email Ops')\n");
}

#[tokio::test]
async fn test_supply_replay_without_repodir_fails() {
    let workspace = TestWorkspace::new();
    let mut config = workspace.write_config().await;
    config.repodir = None;
    config.save_to(&workspace.config_path()).await.unwrap();

    let snapshot_path = workspace.temp.path().join("dev.json");
    Snapshot::capture(&ingest_environment().repos(), "DEV").await.unwrap().save(&snapshot_path).await.unwrap();

    let err = run(&workspace, &["supply", "replay", snapshot_path.to_str().unwrap(), "Ingest", "--to", "UAT"])
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<RallyError>(), Some(RallyError::ConfigError { .. })), "{err:#}");
}

#[tokio::test]
async fn test_listing_requires_an_environment() {
    let workspace = TestWorkspace::new();
    workspace.write_config().await;

    let err = run(&workspace, &["rule", "list"]).await.unwrap_err();
    assert!(err.to_string().contains("No environment supplied"), "{err:#}");

    // The local pseudo-environment lists nothing and needs no API
    run(&workspace, &["preset", "list", "-e", "LOCAL"]).await.unwrap();
}
