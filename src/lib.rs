//! Rally Tools - supply chain discovery for SDVI Rally
//!
//! A Rally environment (`DEV`, `UAT`, `PROD`, ...) holds workflow rules, the presets
//! whose code those rules run, provider types and notification presets. Rules chain
//! into one another through `passNext`/`errorNext`, and preset code calls other
//! rules and presets by name. This crate finds everything a given rule depends on,
//! its *supply chain*, and writes it to a local repository directory.
//!
//! # Architecture Overview
//!
//! - [`api`] talks to the Rally REST API: an [`ApiClient`](api::ApiClient) over a
//!   pluggable [`Transport`](api::Transport), plus the paginated indexer
//! - [`cache`] memoizes one fetch per key; [`repository`] builds per-environment
//!   entity collections on top of it
//! - [`models`] wraps raw JSON:API records into typed entities with relationship
//!   resolution
//! - [`scanner`] finds entity names quoted in preset code
//! - [`supply_chain`] walks rules, code references and notifications
//! - [`snapshot`] captures an environment for offline replay
//!
//! # Example
//!
//! ```rust,no_run
//! use rally_cli::api::ApiClient;
//! use rally_cli::config::GlobalConfig;
//! use rally_cli::models::Entity;
//! use rally_cli::repository::Repositories;
//! use rally_cli::supply_chain::SupplyChain;
//! use rally_cli::utils::progress::SilentReporter;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let repos = Repositories::new(ApiClient::new(GlobalConfig::load().await?)?);
//! let start = repos.find_rule("DEV", "Ingest").await?;
//!
//! let mut chain = SupplyChain::new(start);
//! chain.calculate(&repos, &SilentReporter).await?;
//! for rule in chain.rules().into_iter().flatten() {
//!     println!("{}", rule.chalk_print(true));
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod models;
pub mod repository;
pub mod scanner;
pub mod snapshot;
pub mod supply_chain;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
