//! Ordered, indexed collections of entities.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::Entity;

/// Looks up entities by id on behalf of relationship resolution.
///
/// Returns the entity together with the name to attach onto the reference object.
pub trait Resolver<T> {
    /// Find the entity with `id`, if any.
    fn resolve_id(&self, id: &str) -> Option<(Arc<T>, String)>;
}

/// All entities of one kind from one environment.
///
/// Iteration follows insertion order, which for fetched collections is the remote
/// page order. Ids are unique: when a duplicate id is added the first entity is kept.
#[derive(Debug)]
pub struct Collection<T> {
    items: Vec<Arc<T>>,
    by_id: HashMap<String, usize>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            by_id: self.by_id.clone(),
        }
    }
}

impl<T: Entity> Collection<T> {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from shared entities, dropping duplicate ids.
    #[must_use]
    pub fn from_arcs(items: impl IntoIterator<Item = Arc<T>>) -> Self {
        let mut collection = Self::new();
        for item in items {
            collection.push(item);
        }
        collection
    }

    /// Build a collection from owned entities, dropping duplicate ids.
    #[must_use]
    pub fn from_entities(items: impl IntoIterator<Item = T>) -> Self {
        Self::from_arcs(items.into_iter().map(Arc::new))
    }

    /// Append an entity. Returns `false` (and keeps the existing entity) if its id
    /// is already present.
    pub fn push(&mut self, item: Arc<T>) -> bool {
        if self.by_id.contains_key(item.id()) {
            warn!(
                "Duplicate {} id {} ({}) in {}, keeping the first",
                T::KIND,
                item.id(),
                item.name(),
                item.remote()
            );
            return false;
        }
        self.by_id.insert(item.id().to_string(), self.items.len());
        self.items.push(item);
        true
    }

    /// Entity with the given id.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&Arc<T>> {
        self.by_id.get(id).map(|&index| &self.items[index])
    }

    /// First entity whose name equals `name` exactly.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<T>> {
        self.items.iter().find(|item| item.name() == name)
    }

    /// First entity whose name contains `fragment`.
    #[must_use]
    pub fn find_by_name_contains(&self, fragment: &str) -> Option<&Arc<T>> {
        self.items.iter().find(|item| item.name().contains(fragment))
    }

    /// Whether an entity with `id` is present.
    #[must_use]
    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Entities in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<T>> {
        self.items.iter()
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.name())
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// One coloured display line per entity, as printed by list commands.
    #[must_use]
    pub fn display_lines(&self) -> Vec<String> {
        self.items.iter().map(|item| item.chalk_print(true)).collect()
    }
}

impl<T: Entity> Resolver<T> for Collection<T> {
    fn resolve_id(&self, id: &str) -> Option<(Arc<T>, String)> {
        self.find_by_id(id).map(|item| (Arc::clone(item), item.name().to_string()))
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a Arc<T>;
    type IntoIter = std::slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
