//! Common test utilities for Rally Tools integration tests
//!
//! [`ScriptedEnvironment`] serves a whole Rally environment from a
//! [`FakeTransport`]: every collection split into pages the way the API pages them,
//! plus the code body of each preset.

// Not every test file uses every helper
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rally_cli::api::ApiClient;
use rally_cli::config::GlobalConfig;
use rally_cli::core::EntityKind;
use rally_cli::repository::Repositories;
use rally_cli::test_utils::{FakeTransport, fixtures};
use serde_json::Value;
use tempfile::TempDir;

/// API root of the `DEV` fixture environment.
pub const DEV_BASE: &str = "https://dev.example.com/api/v2";

/// A scripted `DEV` environment.
pub struct ScriptedEnvironment {
    pub transport: Arc<FakeTransport>,
    page_size: u32,
}

impl ScriptedEnvironment {
    /// Empty environment answering pages of `page_size` records.
    pub fn new(page_size: u32) -> Self {
        let env = Self {
            transport: Arc::new(FakeTransport::new()),
            page_size,
        };
        for kind in EntityKind::ALL {
            env.collection(kind, Vec::new());
        }
        env
    }

    /// Serve `records` as the collection of `kind`, replacing any earlier script.
    ///
    /// The first page is answered at the URL the repositories request; later pages
    /// at the URLs derived from its `first` link.
    pub fn collection(&self, kind: EntityKind, records: Vec<Value>) {
        let size = self.page_size;
        let pages = u32::try_from(records.len().div_ceil(size as usize)).unwrap().max(1);
        let endpoint = kind.endpoint();

        let mut chunks = records.chunks(size as usize);
        for page in 1..=pages {
            let chunk = chunks.next().map(<[Value]>::to_vec).unwrap_or_default();
            let body = fixtures::page_body(chunk, DEV_BASE, endpoint, page, pages, size);
            self.transport.respond(&self.page_url(kind, page), 200, &body);
        }
    }

    /// URL page `page` of `kind` is requested at.
    pub fn page_url(&self, kind: EntityKind, page: u32) -> String {
        if page == 1 {
            format!("{DEV_BASE}{}", kind.index_path())
        } else {
            format!("{DEV_BASE}{}?page={page}p{}", kind.endpoint(), self.page_size)
        }
    }

    /// Serve the code body of preset `id`.
    pub fn code(&self, id: &str, code: &str) {
        self.transport.respond(&format!("{DEV_BASE}/presets/{id}/providerData"), 200, code);
    }

    /// Repositories reading from this environment.
    pub fn repos(&self) -> Repositories {
        self.repos_with(fixtures::config(&["DEV"]))
    }

    /// Repositories over `config`, reading from this environment.
    pub fn repos_with(&self, config: GlobalConfig) -> Repositories {
        Repositories::new(ApiClient::with_transport(config, self.transport.clone()))
    }
}

/// A temporary directory holding a config file and a repository directory.
pub struct TestWorkspace {
    pub temp: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp.path().join("config.toml")
    }

    pub fn repodir(&self) -> PathBuf {
        self.temp.path().join("repo")
    }

    /// Write a config with `DEV` configured and the repository directory set.
    pub async fn write_config(&self) -> GlobalConfig {
        let mut config = fixtures::config(&["DEV"]);
        config.repodir = Some(self.repodir());
        config.save_to(&self.config_path()).await.unwrap();
        config
    }

    /// Parse the JSON document at `relative` inside the repository directory.
    pub fn read_saved(&self, relative: impl AsRef<Path>) -> Value {
        let path = self.repodir().join(relative);
        let content = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("missing {}: {e}", path.display()));
        serde_json::from_str(&content).unwrap()
    }
}
