//! Destinations a calculated supply chain can be synced to.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use tokio::fs;
use tracing::debug;

use crate::core::EntityKind;
use crate::models::{Entity, Preset, Rule};

/// Persists the entities of a supply chain.
pub trait EntitySink: Send + Sync {
    /// Save one preset on behalf of the `target` environment.
    fn save_preset<'a>(&'a self, preset: &'a Preset, target: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Save one rule on behalf of the `target` environment.
    fn save_rule<'a>(&'a self, rule: &'a Rule, target: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// Writes entities as pretty JSON documents under a repository directory.
///
/// Layout: `<root>/presets/<name>.json` and `<root>/rules/<name>.json`.
#[derive(Debug, Clone)]
pub struct RepoDirSink {
    root: PathBuf,
}

impl RepoDirSink {
    /// Sink writing below `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// The repository directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an entity of `kind` named `name` is written to.
    #[must_use]
    pub fn path_for(&self, kind: EntityKind, name: &str) -> PathBuf {
        self.root.join(kind.directory()).join(format!("{}.json", sanitize_file_name(name)))
    }

    async fn write<T: Entity>(&self, entity: &T, target: &str) -> Result<()> {
        let path = self.path_for(T::KIND, entity.name());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(&entity.snapshot())
            .with_context(|| format!("Failed to serialize {}", entity.name()))?;
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!("Saved {} for {target} to {}", entity.chalk_print(false), path.display());
        Ok(())
    }
}

impl EntitySink for RepoDirSink {
    fn save_preset<'a>(&'a self, preset: &'a Preset, target: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.write(preset, target))
    }

    fn save_rule<'a>(&'a self, rule: &'a Rule, target: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.write(rule, target))
    }
}

/// Make an entity name usable as a file name.
///
/// Path separators, NUL and characters Windows forbids are replaced with `_`; an
/// empty result becomes `_`.
///
/// ```rust
/// use rally_cli::supply_chain::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("Ingest/QC: HD"), "Ingest_QC_ HD");
/// ```
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "_".repeat(cleaned.len().max(1))
    } else {
        cleaned
    }
}
