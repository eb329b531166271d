//! Capturing an environment and replaying supply chains from the capture

use std::sync::Arc;

use rally_cli::api::ApiClient;
use rally_cli::models::{Collection, Entity};
use rally_cli::repository::Repositories;
use rally_cli::snapshot::Snapshot;
use rally_cli::supply_chain::SupplyChain;
use rally_cli::test_utils::{FakeTransport, fixtures};
use rally_cli::utils::progress::SilentReporter;

use crate::common::TestWorkspace;
use crate::supply_chain::ingest_environment;

fn names<T: Entity>(collection: Option<&Collection<T>>) -> Vec<String> {
    collection.unwrap().names().map(str::to_string).collect()
}

#[tokio::test]
async fn test_replay_matches_online_calculation() {
    let env = ingest_environment();
    let online = env.repos();
    let workspace = TestWorkspace::new();
    let path = workspace.temp.path().join("dev.json");

    Snapshot::capture(&online, "DEV").await.unwrap().save(&path).await.unwrap();
    let mut expected = SupplyChain::new(online.find_rule("DEV", "Ingest Start").await.unwrap());
    expected.calculate(&online, &SilentReporter).await.unwrap();

    // A client without any environment configured cannot reach the API at all
    let offline_transport = Arc::new(FakeTransport::new());
    let offline = Repositories::new(ApiClient::with_transport(fixtures::config(&[]), offline_transport.clone()));
    Snapshot::load(&path).await.unwrap().seed(&offline).unwrap();

    let mut replayed = SupplyChain::new(offline.find_rule("DEV", "Ingest Start").await.unwrap());
    replayed.calculate(&offline, &SilentReporter).await.unwrap();

    assert_eq!(names(replayed.rules()), names(expected.rules()));
    assert_eq!(names(replayed.presets()), names(expected.presets()));
    assert_eq!(replayed.notifications().unwrap().len(), expected.notifications().unwrap().len());
    assert!(offline_transport.requests().is_empty());
}

#[tokio::test]
async fn test_pushed_collections_take_precedence_over_the_api() {
    let env = ingest_environment();
    let repos = env.repos();

    repos.push_rules("DEV", Collection::from_entities([fixtures::rule("x1", "Pushed Rule", None)]));
    let rules = repos.rules("DEV").await.unwrap();

    assert_eq!(rules.names().collect::<Vec<_>>(), vec!["Pushed Rule"]);
    assert!(env.transport.requests().is_empty());
}
