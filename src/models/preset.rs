//! Presets: named units of executable code.

use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use super::{Entity, EntityRecord, Provider, RelationshipDescriptor};
use crate::api::ApiClient;
use crate::core::EntityKind;
use crate::repository::{EnvironmentCollections, Repositories};
use crate::scanner;

const PROVIDER_TYPE: RelationshipDescriptor = RelationshipDescriptor::new(
    "providerType",
    "/relationships/providerType/data",
    EntityKind::Provider,
);

/// A preset and, once downloaded, its source code.
///
/// The code is fetched separately from the record and stored at most once; later
/// downloads or [`set_code`](Preset::set_code) calls leave it unchanged.
#[derive(Debug)]
pub struct Preset {
    record: EntityRecord,
    code: OnceLock<String>,
}

/// Relationships of a preset, resolved against its environment.
#[derive(Debug, Clone, Default)]
pub struct ResolvedPreset {
    /// Provider type the preset's code runs on
    pub provider_type: Option<Arc<Provider>>,
}

impl Entity for Preset {
    const KIND: EntityKind = EntityKind::Preset;
    const RELATIONSHIPS: &'static [RelationshipDescriptor] = &[PROVIDER_TYPE];

    fn from_record(record: EntityRecord) -> Self {
        Self {
            record,
            code: OnceLock::new(),
        }
    }

    fn record(&self) -> &EntityRecord {
        &self.record
    }

    /// The cleaned record with the code body under `attributes.providerData`.
    fn snapshot(&self) -> Value {
        let mut data = self.record.cleaned();
        if let (Some(code), Some(object)) = (self.code(), data.as_object_mut()) {
            let attributes = object
                .entry("attributes")
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if let Some(attributes) = attributes.as_object_mut() {
                attributes.insert("providerData".to_string(), Value::String(code.to_string()));
            }
        }
        data
    }
}

impl Preset {
    /// Source code, if it has been downloaded or set.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.get().map(String::as_str)
    }

    /// Store the source code. Returns `false` if code was already present.
    pub fn set_code(&self, code: String) -> bool {
        self.code.set(code).is_ok()
    }

    /// API path the code body is served from.
    ///
    /// The record's `links.providerData` when present, otherwise
    /// `/presets/<id>/providerData`.
    #[must_use]
    pub fn code_path(&self) -> String {
        self.record
            .string_at("/links/providerData")
            .unwrap_or_else(|| format!("/presets/{}/providerData", self.id()))
    }

    /// Fetch the source code from the preset's environment and store it.
    ///
    /// Does nothing for presets from a local environment or whose code is already
    /// present.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails.
    pub async fn download_code(&self, client: &ApiClient) -> Result<()> {
        if self.code.get().is_some() || ApiClient::is_local_env(self.remote()) {
            return Ok(());
        }

        let code = client
            .get_text(self.remote(), &self.code_path())
            .await
            .with_context(|| format!("Failed to download code of {}", self.chalk_print(false)))?;
        debug!("Downloaded {} bytes of code for {}", code.len(), self.name());
        self.set_code(code);
        Ok(())
    }

    /// Candidates that occur literally in the code, in candidate order.
    ///
    /// A preset without code references nothing.
    #[must_use]
    pub fn find_strings_in_code<'c>(&self, candidates: &'c [String]) -> Vec<&'c str> {
        self.code().map_or_else(Vec::new, |code| scanner::find_references(code, candidates))
    }

    /// Resolve the provider type against already loaded collections.
    pub fn resolve_in(&self, collections: &EnvironmentCollections) -> ResolvedPreset {
        ResolvedPreset {
            provider_type: self.record.resolve_one(collections.providers.as_ref(), &PROVIDER_TYPE),
        }
    }

    /// Resolve the provider type, loading the preset's environment if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment's collections cannot be loaded.
    pub async fn resolve(&self, repos: &Repositories) -> Result<ResolvedPreset> {
        let collections = repos.load_all(self.remote()).await?;
        Ok(self.resolve_in(&collections))
    }
}
