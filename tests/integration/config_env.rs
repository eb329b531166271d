//! Environment variables read by the library
//!
//! These tests mutate process-wide environment variables and therefore run
//! serially.

use rally_cli::config::GlobalConfig;
use rally_cli::utils::progress::is_progress_disabled;
use serial_test::serial;

use crate::common::TestWorkspace;

#[tokio::test]
#[serial]
async fn test_rally_config_overrides_default_path() {
    let workspace = TestWorkspace::new();
    let written = workspace.write_config().await;

    // SAFETY: serialized with every other test that touches the environment
    unsafe { std::env::set_var("RALLY_CONFIG", workspace.config_path()) };
    let loaded = GlobalConfig::load().await;
    let resolved = GlobalConfig::resolve_path(None);
    unsafe { std::env::remove_var("RALLY_CONFIG") };

    let loaded = loaded.unwrap();
    assert_eq!(resolved.unwrap(), workspace.config_path());
    assert_eq!(loaded.repodir, written.repodir);
    assert!(loaded.has_api("DEV"));
}

#[test]
#[serial]
fn test_rally_no_progress_disables_spinners() {
    unsafe { std::env::remove_var("RALLY_NO_PROGRESS") };
    assert!(!is_progress_disabled());

    unsafe { std::env::set_var("RALLY_NO_PROGRESS", "1") };
    let disabled = is_progress_disabled();
    unsafe { std::env::remove_var("RALLY_NO_PROGRESS") };

    assert!(disabled);
}
