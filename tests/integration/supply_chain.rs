//! Calculating and syncing supply chains against a scripted environment

use rally_cli::core::EntityKind;
use rally_cli::models::{Collection, Entity};
use rally_cli::supply_chain::{RepoDirSink, SupplyChain};
use rally_cli::test_utils::fixtures::{self, RuleFixture};
use rally_cli::test_utils::{RecordingReporter, init_test_logging};
use rally_cli::utils::progress::SilentReporter;

use crate::common::{DEV_BASE, ScriptedEnvironment, TestWorkspace};

/// An ingest pipeline spread over two pages per collection.
///
/// - `Ingest Start` runs `Ingest Script`, passes to `Ingest Finish` and notifies
///   `Slack Alerts` on enter
/// - `Ingest Script` calls `Helper Library` and starts `Archive Media` by name
/// - `Helper Library` sends `Email Ops`, but only bound presets are scanned
/// - `Unused Rule`, `Other Preset`, `Email Ops` and `Pager` are not part of the chain
pub fn ingest_environment() -> ScriptedEnvironment {
    let env = ScriptedEnvironment::new(2);
    env.collection(
        EntityKind::Rule,
        vec![
            RuleFixture::new("r0", "Ingest Start")
                .preset("p0")
                .provider("pr1")
                .pass_next("r1")
                .enter_notifications(&["n1"])
                .build(),
            RuleFixture::new("r1", "Ingest Finish").build(),
            RuleFixture::new("r2", "Archive Media").build(),
            RuleFixture::new("r3", "Unused Rule").build(),
        ],
    );
    env.collection(
        EntityKind::Preset,
        vec![
            fixtures::preset_record("p0", "Ingest Script", "pr1"),
            fixtures::preset_record("p1", "Helper Library", "pr1"),
            fixtures::preset_record("p2", "Other Preset", "pr1"),
        ],
    );
    env.collection(EntityKind::Provider, vec![fixtures::named_record("pr1", "SdviEvaluate")]);
    env.collection(
        EntityKind::Notification,
        vec![
            fixtures::named_record("n1", "Slack Alerts"),
            fixtures::named_record("n2", "Email Ops"),
            fixtures::named_record("n3", "Pager"),
        ],
    );
    env.code("p0", "run('Helper Library')\nstart_rule('Archive Media')\n");
    env.code("p1", "notify('Email Ops')\n");
    env.code("p2", "print('unrelated')\n");
    env
}

fn names<T: Entity>(collection: &Collection<T>) -> Vec<String> {
    collection.names().map(str::to_string).collect()
}

#[tokio::test]
async fn test_calculate_over_paged_environment() {
    init_test_logging(None);
    let env = ingest_environment();
    let repos = env.repos();

    let start = repos.find_rule("DEV", "Ingest Start").await.unwrap();
    let mut chain = SupplyChain::new(start);
    let reporter = RecordingReporter::default();
    chain.calculate(&repos, &reporter).await.unwrap();

    assert_eq!(names(chain.rules().unwrap()), vec!["Ingest Start", "Ingest Finish", "Archive Media"]);
    assert_eq!(names(chain.presets().unwrap()), vec!["Helper Library"]);
    let notifications: Vec<&str> = chain.notifications().unwrap().iter().map(|n| n.name()).collect();
    assert_eq!(notifications, vec!["Slack Alerts"]);

    assert_eq!(reporter.visited_rules(), vec!["Ingest Start", "Ingest Finish", "Archive Media"]);
    assert!(reporter.stages().iter().all(|(_, summary)| summary.is_some()));

    // Both pages of the rules were requested exactly once
    let urls = env.transport.requested_urls();
    for page in [1, 2] {
        let url = env.page_url(EntityKind::Rule, page);
        assert_eq!(urls.iter().filter(|u| **u == url).count(), 1, "{url}");
    }
    // Every preset's code was downloaded, including presets outside the chain
    for id in ["p0", "p1", "p2"] {
        let url = format!("{DEV_BASE}/presets/{id}/providerData");
        assert!(urls.contains(&url), "missing download of {id}");
    }
}

#[tokio::test]
async fn test_recalculation_is_stable_and_served_from_cache() {
    let env = ingest_environment();
    let repos = env.repos();
    let start = repos.find_rule("DEV", "Ingest").await.unwrap();

    let mut first = SupplyChain::new(start.clone());
    first.calculate(&repos, &SilentReporter).await.unwrap();
    let requests = env.transport.requests().len();

    let mut second = SupplyChain::new(start);
    second.calculate(&repos, &SilentReporter).await.unwrap();

    assert_eq!(names(first.rules().unwrap()), names(second.rules().unwrap()));
    assert_eq!(names(first.presets().unwrap()), names(second.presets().unwrap()));
    assert_eq!(env.transport.requests().len(), requests, "second run must not hit the API");
}

#[tokio::test]
async fn test_sync_writes_presets_and_rules() {
    let env = ingest_environment();
    let repos = env.repos();
    let workspace = TestWorkspace::new();

    let mut chain = SupplyChain::new(repos.find_rule("DEV", "Ingest Start").await.unwrap());
    chain.calculate(&repos, &SilentReporter).await.unwrap();
    chain.sync_to("UAT", &RepoDirSink::new(workspace.repodir())).await.unwrap();

    let preset = workspace.read_saved("presets/Helper Library.json");
    assert_eq!(preset["attributes"]["providerData"], "notify('Email Ops')\n");
    assert_eq!(preset["relationships"]["providerType"]["data"]["name"], "SdviEvaluate");
    assert!(preset.get("id").is_none());

    let rule = workspace.read_saved("rules/Ingest Start.json");
    assert_eq!(rule["relationships"]["passNext"]["data"]["name"], "Ingest Finish");
    assert_eq!(rule["relationships"]["enterNotifications"]["data"][0]["name"], "Slack Alerts");
    assert!(rule["relationships"]["passNext"]["data"].get("id").is_none());
    assert!(rule["relationships"].get("organization").is_none());

    assert!(workspace.repodir().join("rules/Archive Media.json").exists());
    assert!(!workspace.repodir().join("rules/Unused Rule.json").exists());
    assert!(!workspace.repodir().join("presets/Ingest Script.json").exists());
}

#[tokio::test]
async fn test_failed_code_download_fails_calculation() {
    let env = ingest_environment();
    env.transport.respond(&format!("{DEV_BASE}/presets/p2/providerData"), 500, "boom");
    let repos = env.repos();

    let mut chain = SupplyChain::new(repos.find_rule("DEV", "Ingest Start").await.unwrap());
    let err = chain.calculate(&repos, &SilentReporter).await.unwrap_err();

    assert!(format!("{err:#}").contains("500"), "{err:#}");
    assert!(!chain.is_calculated());
    assert!(chain.rules().is_none());
}

#[tokio::test]
async fn test_unknown_starting_rule() {
    let env = ingest_environment();
    let repos = env.repos();

    let err = repos.find_rule("DEV", "Does Not Exist").await.unwrap_err();
    assert!(err.to_string().contains("Does Not Exist"));
}
