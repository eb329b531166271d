//! Integration test suite for Rally Tools
//!
//! End-to-end tests over a scripted Rally environment. No test touches the
//! network: collections and preset code are served by a `FakeTransport`, and CLI
//! tests only run commands that never need a remote (`config`, `supply replay`,
//! local environments).
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: commands run through `Cli` against a temporary config file
//! - **config_env**: `RALLY_CONFIG` and `RALLY_NO_PROGRESS` handling
//! - **pagination**: concurrent page fetching and its failure modes
//! - **snapshot_replay**: capturing an environment and calculating from it offline
//! - **supply_chain**: calculating and syncing supply chains

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod config_env;
mod pagination;
mod snapshot_replay;
mod supply_chain;
