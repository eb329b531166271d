//! Rally entities and the collections they are kept in.
//!
//! Four entity types take part in a supply chain: [`Rule`], [`Preset`], [`Provider`]
//! and [`Notification`]. Each wraps the raw JSON record the API returned in an
//! [`EntityRecord`] and declares its relationships in a static table of
//! [`RelationshipDescriptor`]s. The shared behaviour (identity, display, the saved
//! document) lives in the [`Entity`] trait.
//!
//! # Modules
//!
//! - `record` - raw records, relationship descriptors and resolution
//! - `collection` - [`Collection`] and the [`Resolver`] lookup trait
//! - `rule`, `preset`, `provider`, `notification` - the entity types

mod collection;
mod notification;
mod preset;
mod provider;
mod record;
mod rule;

pub use collection::{Collection, Resolver};
pub use notification::Notification;
pub use preset::{Preset, ResolvedPreset};
pub use provider::Provider;
pub use record::{EntityRecord, RelationshipDescriptor, value_id};
pub use rule::{ResolvedRule, Rule};

use anyhow::Result;
use colored::Colorize;
use serde_json::Value;

use crate::core::EntityKind;
use crate::repository::EnvironmentCollections;

/// Behaviour shared by every entity type.
pub trait Entity: Send + Sync + std::fmt::Debug + Sized + 'static {
    /// Which kind of entity this is.
    const KIND: EntityKind;

    /// Relationships this type declares, in resolution order.
    const RELATIONSHIPS: &'static [RelationshipDescriptor];

    /// Wrap an already parsed record.
    fn from_record(record: EntityRecord) -> Self;

    /// The underlying record.
    fn record(&self) -> &EntityRecord;

    /// Wrap a raw JSON record fetched from `remote`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record has no usable id.
    fn from_value(data: Value, remote: &str) -> Result<Self> {
        Ok(Self::from_record(EntityRecord::from_value(data, remote)?))
    }

    /// Remote identifier.
    fn id(&self) -> &str {
        self.record().id()
    }

    /// Display name (`attributes.name`).
    fn name(&self) -> &str {
        self.record().name()
    }

    /// Environment this entity was fetched from.
    fn remote(&self) -> &str {
        self.record().remote()
    }

    /// Coloured one-line display, e.g. `R-DEV-123: Rule Name`.
    ///
    /// With `pad` the identifier is right-aligned to ten columns so that list
    /// output lines up.
    fn chalk_print(&self, pad: bool) -> String {
        let id = format!("{}-{}-{}", Self::KIND.prefix(), self.remote(), self.id());
        let id = if pad {
            format!("{id:>10}")
        } else {
            id
        };
        format!("{}: {}", id.green(), self.name().blue())
    }

    /// Relationship references whose id is not present in `collections`.
    ///
    /// Returns `(field, id)` pairs. A dangling reference is not an error; it simply
    /// resolves to nothing.
    fn dangling_references(&self, collections: &EnvironmentCollections) -> Vec<(&'static str, String)> {
        Self::RELATIONSHIPS
            .iter()
            .flat_map(|descriptor| {
                self.record()
                    .reference_ids(descriptor)
                    .into_iter()
                    .filter(|id| !collections.contains(descriptor.target, id))
                    .map(|id| (descriptor.field, id))
            })
            .collect()
    }

    /// Document written when the entity is saved.
    ///
    /// The record with resolved names attached and environment-specific ids and links
    /// removed, see [`EntityRecord::cleaned`].
    fn snapshot(&self) -> Value {
        self.record().cleaned()
    }
}
