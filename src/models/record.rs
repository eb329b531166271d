//! Raw entity records and relationship resolution.
//!
//! Every Rally entity is kept as the JSON record the API returned
//! (`{id, type, attributes, relationships, links}`), wrapped in an [`EntityRecord`]
//! that extracts the id and name once. Relationships are described per entity type by
//! a static table of [`RelationshipDescriptor`]s mapping a field name to the JSON
//! pointer of its `data` member, so resolution is data-driven instead of hand-written
//! per field.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::core::EntityKind;

use super::collection::Resolver;

/// Static description of one relationship of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipDescriptor {
    /// Relationship name as it appears in `relationships`
    pub field: &'static str,
    /// JSON pointer of the relationship's `data` member inside the record
    pub pointer: &'static str,
    /// Kind of entity the relationship points at
    pub target: EntityKind,
}

impl RelationshipDescriptor {
    /// Descriptor whose pointer is `/relationships/<field>/data`.
    ///
    /// `pointer` must be spelled out because descriptor tables are `const`.
    #[must_use]
    pub const fn new(field: &'static str, pointer: &'static str, target: EntityKind) -> Self {
        Self {
            field,
            pointer,
            target,
        }
    }
}

/// Normalise a JSON id (string or number) to a `String`.
#[must_use]
pub fn value_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// One remote record plus the identity fields extracted from it.
///
/// The record body sits behind a lock because resolution attaches the names of
/// related entities onto the nested reference objects while the entity itself is
/// shared through an `Arc` in a cached collection.
#[derive(Debug)]
pub struct EntityRecord {
    id: String,
    name: String,
    remote: String,
    data: RwLock<Value>,
}

impl EntityRecord {
    /// Wrap a raw record fetched from `remote`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record has no string or numeric `id`.
    pub fn from_value(data: Value, remote: &str) -> Result<Self> {
        let id = data
            .get("id")
            .and_then(value_id)
            .ok_or_else(|| anyhow!("Record from {remote} has no usable id: {data}"))?;
        let name = data
            .pointer("/attributes/name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            id,
            name,
            remote: remote.to_string(),
            data: RwLock::new(data),
        })
    }

    /// Remote identifier, unique within a collection.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `attributes.name`, empty if the record has none.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Environment the record was fetched from.
    #[must_use]
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Copy of the current record body, including any resolved names.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.read().clone()
    }

    /// Look up a string at a JSON pointer inside the record.
    #[must_use]
    pub fn string_at(&self, pointer: &str) -> Option<String> {
        self.read().pointer(pointer).and_then(Value::as_str).map(str::to_string)
    }

    /// Ids referenced by a relationship, in order. Absent or `null` data gives none.
    #[must_use]
    pub fn reference_ids(&self, descriptor: &RelationshipDescriptor) -> Vec<String> {
        let data = self.read();
        match data.pointer(descriptor.pointer) {
            Some(Value::Array(items)) => {
                items.iter().filter_map(|item| item.get("id").and_then(value_id)).collect()
            }
            Some(reference @ Value::Object(_)) => {
                reference.get("id").and_then(value_id).into_iter().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Resolve a relationship against `resolver`, attaching resolved names in place.
    ///
    /// Returns the resolved entities in reference order. References whose id is not
    /// found are skipped (and keep no name); absent or `null` data resolves to an
    /// empty list, never an error.
    pub fn resolve_field<T, R>(&self, resolver: &R, descriptor: &RelationshipDescriptor) -> Vec<Arc<T>>
    where
        R: Resolver<T> + ?Sized,
    {
        let mut data = self.write();
        let Some(field) = data.pointer_mut(descriptor.pointer) else {
            return Vec::new();
        };

        match field {
            Value::Array(items) => {
                items.iter_mut().filter_map(|item| resolve_reference(resolver, item)).collect()
            }
            reference @ Value::Object(_) => {
                resolve_reference(resolver, reference).into_iter().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Resolve a single-valued relationship.
    pub fn resolve_one<T, R>(&self, resolver: &R, descriptor: &RelationshipDescriptor) -> Option<Arc<T>>
    where
        R: Resolver<T> + ?Sized,
    {
        self.resolve_field(resolver, descriptor).into_iter().next()
    }

    /// Record body prepared for saving to disk.
    ///
    /// Relationship ids are environment specific, so they are dropped and only the
    /// attached names are kept. Relationship `links`, the `organization` relationship
    /// and the top-level `id`/`links` are removed as well.
    #[must_use]
    pub fn cleaned(&self) -> Value {
        let mut data = self.to_value();

        if let Some(relationships) = data.get_mut("relationships").and_then(Value::as_object_mut) {
            relationships.remove("organization");
            for relationship in relationships.values_mut() {
                let Some(relationship) = relationship.as_object_mut() else {
                    continue;
                };
                relationship.remove("links");
                match relationship.get_mut("data") {
                    Some(Value::Object(reference)) => {
                        reference.remove("id");
                    }
                    Some(Value::Array(items)) => {
                        for item in items.iter_mut().filter_map(Value::as_object_mut) {
                            item.remove("id");
                        }
                    }
                    _ => {}
                }
            }
        }

        if let Some(object) = data.as_object_mut() {
            object.remove("id");
            object.remove("links");
        }

        data
    }

    // Poisoning is ignored: a panicking writer leaves valid JSON behind.
    fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.data.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Value> {
        self.data.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn resolve_reference<T, R>(resolver: &R, reference: &mut Value) -> Option<Arc<T>>
where
    R: Resolver<T> + ?Sized,
{
    let id = reference.get("id").and_then(value_id)?;
    let (entity, name) = resolver.resolve_id(&id)?;
    if let Some(object) = reference.as_object_mut() {
        object.insert("name".to_string(), Value::String(name));
    }
    Some(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    const PASS_NEXT: RelationshipDescriptor =
        RelationshipDescriptor::new("passNext", "/relationships/passNext/data", EntityKind::Rule);
    const NOTIFS: RelationshipDescriptor = RelationshipDescriptor::new(
        "passNotifications",
        "/relationships/passNotifications/data",
        EntityKind::Notification,
    );

    struct MapResolver(HashMap<String, Arc<String>>);

    impl Resolver<String> for MapResolver {
        fn resolve_id(&self, id: &str) -> Option<(Arc<String>, String)> {
            self.0.get(id).map(|name| (Arc::clone(name), name.as_str().to_string()))
        }
    }

    fn resolver() -> MapResolver {
        let mut map = HashMap::new();
        map.insert("1".to_string(), Arc::new("First".to_string()));
        map.insert("2".to_string(), Arc::new("Second".to_string()));
        MapResolver(map)
    }

    #[test]
    fn test_numeric_ids_are_normalised() {
        let record = EntityRecord::from_value(
            json!({"id": 42, "attributes": {"name": "Rule"}, "relationships": {}}),
            "DEV",
        )
        .unwrap();
        assert_eq!(record.id(), "42");
        assert_eq!(record.name(), "Rule");
        assert_eq!(record.remote(), "DEV");
    }

    #[test]
    fn test_missing_id_is_an_error() {
        assert!(EntityRecord::from_value(json!({"attributes": {"name": "x"}}), "DEV").is_err());
    }

    #[test]
    fn test_resolve_single_attaches_name() {
        let record = EntityRecord::from_value(
            json!({"id": "9", "relationships": {"passNext": {"data": {"id": 2, "type": "workflowRules"}}}}),
            "DEV",
        )
        .unwrap();

        let resolved = record.resolve_one(&resolver(), &PASS_NEXT).unwrap();
        assert_eq!(resolved.as_str(), "Second");
        assert_eq!(
            record.string_at("/relationships/passNext/data/name").as_deref(),
            Some("Second")
        );
    }

    #[test]
    fn test_resolve_null_and_absent_data() {
        let record = EntityRecord::from_value(
            json!({"id": "9", "relationships": {"passNext": {"data": null}}}),
            "DEV",
        )
        .unwrap();
        assert!(record.resolve_one(&resolver(), &PASS_NEXT).is_none());
        assert!(record.resolve_field(&resolver(), &NOTIFS).is_empty());
    }

    #[test]
    fn test_resolve_list_skips_unknown_ids() {
        let record = EntityRecord::from_value(
            json!({"id": "9", "relationships": {"passNotifications": {"data": [{"id": "1"}, {"id": "77"}, {"id": "2"}]}}}),
            "DEV",
        )
        .unwrap();

        let resolved = record.resolve_field(&resolver(), &NOTIFS);
        let names: Vec<&str> = resolved.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert_eq!(record.reference_ids(&NOTIFS), vec!["1", "77", "2"]);
        assert!(record.string_at("/relationships/passNotifications/data/1/name").is_none());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let record = EntityRecord::from_value(
            json!({"id": "9", "relationships": {"passNext": {"data": {"id": "1"}}}}),
            "DEV",
        )
        .unwrap();
        let resolver = resolver();
        let first = record.resolve_one(&resolver, &PASS_NEXT).unwrap();
        let second = record.resolve_one(&resolver, &PASS_NEXT).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(record.string_at("/relationships/passNext/data/name").as_deref(), Some("First"));
    }

    #[test]
    fn test_cleaned_strips_ids_and_links() {
        let record = EntityRecord::from_value(
            json!({
                "id": "9",
                "type": "workflowRules",
                "links": {"self": "https://x/workflowRules/9"},
                "attributes": {"name": "Rule"},
                "relationships": {
                    "organization": {"data": {"id": "org"}},
                    "passNext": {"data": {"id": "1"}, "links": {"self": "l"}},
                    "passNotifications": {"data": [{"id": "1"}, {"id": "2"}]}
                }
            }),
            "DEV",
        )
        .unwrap();
        record.resolve_one(&resolver(), &PASS_NEXT);
        record.resolve_field(&resolver(), &NOTIFS);

        let cleaned = record.cleaned();
        assert_eq!(
            cleaned,
            json!({
                "type": "workflowRules",
                "attributes": {"name": "Rule"},
                "relationships": {
                    "passNext": {"data": {"name": "First"}},
                    "passNotifications": {"data": [{"name": "First"}, {"name": "Second"}]}
                }
            })
        );
    }
}
