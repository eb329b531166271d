//! Concurrent page fetching through the repositories

use std::sync::Arc;
use std::time::Duration;

use rally_cli::core::{EntityKind, RallyError};
use rally_cli::models::Entity;
use rally_cli::test_utils::fixtures;

use crate::common::ScriptedEnvironment;

fn presets(count: usize) -> Vec<serde_json::Value> {
    (1..=count)
        .map(|i| fixtures::preset_record(&i.to_string(), &format!("Preset {i:02}"), ""))
        .collect()
}

#[tokio::test]
async fn test_pages_arrive_in_order_when_later_pages_finish_first() {
    let env = ScriptedEnvironment::new(2);
    env.collection(EntityKind::Preset, presets(5));
    env.transport.delay(&env.page_url(EntityKind::Preset, 2), Duration::from_millis(300));
    let repos = env.repos();

    let loaded = repos.presets("DEV").await.unwrap();
    let names: Vec<&str> = loaded.names().collect();
    assert_eq!(names, vec!["Preset 01", "Preset 02", "Preset 03", "Preset 04", "Preset 05"]);

    let requests = env.transport.requested_urls();
    assert_eq!(requests.len(), 3, "three pages, three requests: {requests:?}");
}

#[tokio::test]
async fn test_failing_page_fails_the_whole_collection() {
    let env = ScriptedEnvironment::new(2);
    env.collection(EntityKind::Preset, presets(5));
    env.transport.respond(&env.page_url(EntityKind::Preset, 3), 500, "internal error");
    let repos = env.repos();

    let err = repos.presets("DEV").await.unwrap_err();
    let api_error = err.chain().find_map(|e| e.downcast_ref::<RallyError>());
    assert!(matches!(api_error, Some(RallyError::ApiError { status: 500, .. })), "{err:#}");

    // Nothing partial was cached; a healthy retry loads all five
    env.collection(EntityKind::Preset, presets(5));
    assert_eq!(repos.presets("DEV").await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_concurrent_loads_of_one_environment_agree() {
    let env = ScriptedEnvironment::new(20);
    env.collection(EntityKind::Rule, vec![fixtures::RuleFixture::new("1", "Only Rule").build()]);
    env.transport.delay(&env.page_url(EntityKind::Rule, 1), Duration::from_millis(100));
    let repos = Arc::new(env.repos());

    let (a, b) = tokio::join!(repos.rules("DEV"), repos.rules("DEV"));
    let (a, b) = (a.unwrap(), b.unwrap());

    // Both callers fetched, and both got the collection that was stored first
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.find_by_id("1").unwrap().name(), "Only Rule");
    assert_eq!(env.transport.requests().len(), 2);
    assert!(Arc::ptr_eq(&a, &repos.rules("DEV").await.unwrap()));
    assert_eq!(env.transport.requests().len(), 2);
}

#[tokio::test]
async fn test_unconfigured_environment() {
    let env = ScriptedEnvironment::new(20);
    let repos = env.repos();

    let err = repos.rules("PROD").await.unwrap_err();
    let cause = err.chain().find_map(|e| e.downcast_ref::<RallyError>());
    assert!(matches!(cause, Some(RallyError::UnconfiguredEnv { env: name }) if name == "PROD"), "{err:#}");
    assert!(env.transport.requests().is_empty());
}
