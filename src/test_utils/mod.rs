//! Test utilities for Rally Tools
//!
//! This module provides what tests need to run without a Rally instance:
//! - [`FakeTransport`], a scripted [`Transport`] that records every request
//! - [`RecordingReporter`], a [`ProgressReporter`] that remembers what it was told
//! - `fixtures`, builders for raw records, pages, configurations and collections
//! - [`init_test_logging`] for tracing output in tests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rally_cli::api::ApiClient;
//! use rally_cli::test_utils::{FakeTransport, fixtures};
//!
//! let transport = Arc::new(FakeTransport::new());
//! transport.respond("https://dev.example.com/api/v2/presets/1/providerData", 200, "print(1)");
//! let client = ApiClient::with_transport(fixtures::config(&["DEV"]), transport.clone());
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::sync::{Mutex, Once};
use std::time::Duration;

use anyhow::Result;
use futures::future::BoxFuture;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::api::{ApiRequest, ApiResponse, Transport};
use crate::models::Entity;
use crate::utils::progress::{ProgressReporter, TraversalStep};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` if given, otherwise `RUST_LOG`
/// if set; with neither, no subscriber is installed.
///
/// ```rust,no_run
/// use tracing::Level;
/// use rally_cli::test_utils::init_test_logging;
///
/// init_test_logging(Some(Level::DEBUG));
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// [`Transport`] answering from a script keyed by absolute URL.
///
/// Unscripted URLs answer `404`. Responses can be delayed per URL to exercise
/// ordering and timeouts. Every request is recorded in arrival order.
#[derive(Debug, Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, ApiResponse>>,
    delays: Mutex<HashMap<String, Duration>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    /// Empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `status` and `body`, replacing any earlier script for it.
    pub fn respond(&self, url: &str, status: u16, body: &str) {
        lock(&self.responses).insert(
            url.to_string(),
            ApiResponse {
                status,
                body: body.to_string(),
            },
        );
    }

    /// Hold the answer to `url` back for `delay`.
    pub fn delay(&self, url: &str, delay: Duration) {
        lock(&self.delays).insert(url.to_string(), delay);
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }

    /// URLs requested so far.
    #[must_use]
    pub fn requested_urls(&self) -> Vec<String> {
        lock(&self.requests).iter().map(|r| r.url.clone()).collect()
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse>> {
        Box::pin(async move {
            lock(&self.requests).push(request.clone());
            let delay = lock(&self.delays).get(&request.url).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let response = lock(&self.responses).get(&request.url).cloned();
            Ok(response.unwrap_or_else(|| ApiResponse {
                status: 404,
                body: format!("no scripted response for {}", request.url),
            }))
        })
    }
}

/// [`ProgressReporter`] that records stages and visited rules.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    stages: Mutex<Vec<(String, Option<String>)>>,
    visited: Mutex<Vec<String>>,
}

impl RecordingReporter {
    /// `(stage, summary)` pairs in order; the summary is `None` while unfinished.
    #[must_use]
    pub fn stages(&self) -> Vec<(String, Option<String>)> {
        lock(&self.stages).clone()
    }

    /// Names of the rules the traversal processed, in order.
    #[must_use]
    pub fn visited_rules(&self) -> Vec<String> {
        lock(&self.visited).clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn stage_started(&self, stage: &str) {
        lock(&self.stages).push((stage.to_string(), None));
    }

    fn stage_finished(&self, summary: &str) {
        if let Some(last) = lock(&self.stages).last_mut() {
            last.1 = Some(summary.to_string());
        }
    }

    fn step(&self, step: &TraversalStep<'_>) {
        lock(&self.visited).push(step.rule.name().to_string());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
