//! Offline captures of an environment.
//!
//! A [`Snapshot`] holds the raw records of every collection of one environment plus
//! the downloaded code of each preset. Seeding [`Repositories`] with a snapshot lets
//! a supply chain be calculated again without talking to the API.
//!
//! The file is a single JSON document:
//!
//! ```json
//! {
//!   "remote": "DEV",
//!   "rules": [{"id": "1", "attributes": {"name": "Ingest"}, "relationships": {}}],
//!   "presets": [{"data": {"id": "7", "attributes": {"name": "Transcode"}}, "code": "..."}],
//!   "providers": [],
//!   "notifications": []
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

use crate::models::{Collection, Entity, Notification, Preset, Provider, Rule};
use crate::repository::{EnvironmentCollections, Repositories};

/// Raw records of one environment, with preset code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Environment the records were captured from
    pub remote: String,
    /// Raw workflow rule records
    #[serde(default)]
    pub rules: Vec<Value>,
    /// Preset records, each with its code
    #[serde(default)]
    pub presets: Vec<PresetSnapshot>,
    /// Raw provider type records
    #[serde(default)]
    pub providers: Vec<Value>,
    /// Raw notification preset records
    #[serde(default)]
    pub notifications: Vec<Value>,
}

/// A preset record and its code, if any was downloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetSnapshot {
    /// Raw preset record as returned by the API
    pub data: Value,
    /// Source text, absent when the preset had none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Snapshot {
    /// Capture `env`: load its collections and download every preset's code.
    ///
    /// # Errors
    ///
    /// Returns an error if a collection cannot be loaded or a download fails.
    pub async fn capture(repos: &Repositories, env: &str) -> Result<Self> {
        let collections = repos
            .load_all(env)
            .await
            .with_context(|| format!("Failed to load the {env} environment"))?;
        repos.download_code(&collections.presets).await?;

        let snapshot = Self::from_collections(env, &collections);
        info!(
            "Captured {env}: {} rules, {} presets, {} providers, {} notifications",
            snapshot.rules.len(),
            snapshot.presets.len(),
            snapshot.providers.len(),
            snapshot.notifications.len()
        );
        Ok(snapshot)
    }

    /// Snapshot of already loaded collections.
    #[must_use]
    pub fn from_collections(env: &str, collections: &EnvironmentCollections) -> Self {
        Self {
            remote: env.to_string(),
            rules: raw_records(&collections.rules),
            presets: collections
                .presets
                .iter()
                .map(|preset| PresetSnapshot {
                    data: preset.record().to_value(),
                    code: preset.code().map(str::to_string),
                })
                .collect(),
            providers: raw_records(&collections.providers),
            notifications: raw_records(&collections.notifications),
        }
    }

    /// Read a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a snapshot.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        let snapshot: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;
        debug!("Loaded snapshot of {} from {}", snapshot.remote, path.display());
        Ok(snapshot)
    }

    /// Write the snapshot as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize snapshot")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
        Ok(())
    }

    /// Push every collection into `repos` under the snapshot's environment.
    ///
    /// Later loads of that environment are served from the snapshot without any
    /// request. Preset code is set, so downloads are skipped as well.
    ///
    /// # Errors
    ///
    /// Returns an error if a record has no id.
    pub fn seed(&self, repos: &Repositories) -> Result<()> {
        let env = self.remote.as_str();

        let presets = self
            .presets
            .iter()
            .map(|entry| {
                let preset = Preset::from_value(entry.data.clone(), env)?;
                if let Some(code) = &entry.code {
                    preset.set_code(code.clone());
                }
                Ok(preset)
            })
            .collect::<Result<Vec<_>>>()?;

        repos.push_rules(env, entities::<Rule>(&self.rules, env)?);
        repos.push_presets(env, Collection::from_entities(presets));
        repos.push_providers(env, entities::<Provider>(&self.providers, env)?);
        repos.push_notifications(env, entities::<Notification>(&self.notifications, env)?);
        debug!("Seeded {env} from snapshot");
        Ok(())
    }
}

fn raw_records<T: Entity>(collection: &Collection<T>) -> Vec<Value> {
    collection.iter().map(|entity| entity.record().to_value()).collect()
}

fn entities<T: Entity>(records: &[Value], env: &str) -> Result<Collection<T>> {
    let items = records
        .iter()
        .map(|record| T::from_value(record.clone(), env))
        .collect::<Result<Vec<_>>>()?;
    Ok(Collection::from_entities(items))
}
