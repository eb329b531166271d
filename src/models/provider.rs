//! Provider types.

use super::{Entity, EntityRecord, RelationshipDescriptor};
use crate::core::EntityKind;

/// An execution context type presets and rules run against, e.g. `SdviEvaluate`.
#[derive(Debug)]
pub struct Provider {
    record: EntityRecord,
}

impl Entity for Provider {
    const KIND: EntityKind = EntityKind::Provider;
    const RELATIONSHIPS: &'static [RelationshipDescriptor] = &[];

    fn from_record(record: EntityRecord) -> Self {
        Self {
            record,
        }
    }

    fn record(&self) -> &EntityRecord {
        &self.record
    }
}

impl Provider {
    /// Language the provider's code is written in, if the record says.
    #[must_use]
    pub fn language(&self) -> Option<String> {
        self.record.string_at("/attributes/lang")
    }
}
