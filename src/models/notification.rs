//! Notification presets.

use super::{Entity, EntityRecord, RelationshipDescriptor};
use crate::core::EntityKind;

/// A message preset rules send on enter, pass or error.
#[derive(Debug)]
pub struct Notification {
    record: EntityRecord,
}

impl Entity for Notification {
    const KIND: EntityKind = EntityKind::Notification;
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
