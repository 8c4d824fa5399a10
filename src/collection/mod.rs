//! Keyed, ordered collections of entities
//!
//! A collection keeps its entities in an `im::HashMap` keyed by
//! `EntityKey` plus an `im::Vector` of keys for iteration order. Both are
//! persistent structures, so cloning a collection (and therefore a whole
//! `RootState`) is O(1) and unchanged branches stay shared between
//! snapshots.

use crate::core::{EntityKey, EntityKind, MirrorError, Result};
use crate::entity::Entity;
use im::{HashMap, Vector};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// What happens to an element's position when it is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderPolicy {
    /// The replacement takes the old element's slot.
    #[default]
    Preserve,
    /// The old element is removed and the replacement appended, so every
    /// update moves the element to the end of iteration order.
    MoveToBack,
}

#[derive(Debug, Clone)]
pub struct Collection {
    kind: EntityKind,
    order: Vector<EntityKey>,
    entries: HashMap<EntityKey, Entity>,
}

impl Collection {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            order: Vector::new(),
            entries: HashMap::new(),
        }
    }

    /// Builds a collection from entities in order, rejecting duplicate keys.
    pub fn from_entities(kind: EntityKind, entities: impl IntoIterator<Item = Entity>) -> Result<Self> {
        let mut collection = Self::new(kind);
        for entity in entities {
            collection.push(entity)?;
        }
        Ok(collection)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.order.iter().filter_map(|key| self.entries.get(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> + '_ {
        self.order.iter()
    }

    pub fn get(&self, key: &EntityKey) -> Option<&Entity> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn at(&self, index: usize) -> Option<&Entity> {
        self.order.get(index).and_then(|key| self.entries.get(key))
    }

    pub fn index_of(&self, key: &EntityKey) -> Option<usize> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.order.index_of(key)
    }

    /// First entity, in order, whose raw field (dotted paths allowed)
    /// equals `value`.
    pub fn find_by(&self, field: &str, value: &JsonValue) -> Option<&Entity> {
        self.iter().find(|entity| entity.raw_path(field) == Some(value))
    }

    /// Appends an entity. Keys are unique: pushing a key that is already
    /// present fails with `DuplicateKey` and leaves the collection as is.
    pub fn push(&mut self, entity: Entity) -> Result<()> {
        let key = self.admit(&entity)?;
        if self.entries.contains_key(&key) {
            return Err(MirrorError::DuplicateKey {
                kind: self.kind,
                key: key.to_string(),
            });
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, entity);
        Ok(())
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Entity> {
        if index >= self.order.len() {
            return None;
        }
        let key = self.order.remove(index);
        self.entries.remove(&key)
    }

    /// Removes the entity with `key`. Removing a missing key is a no-op.
    pub fn remove_by_key(&mut self, key: &EntityKey) -> Option<Entity> {
        let index = self.index_of(key)?;
        self.remove_at(index)
    }

    /// Swaps the stored entity sharing `entity`'s key. Returns `false`
    /// without touching the collection when no such entity exists.
    pub fn replace(&mut self, entity: Entity, policy: OrderPolicy) -> Result<bool> {
        let key = self.admit(&entity)?;
        let Some(index) = self.index_of(&key) else {
            return Ok(false);
        };

        match policy {
            OrderPolicy::Preserve => {
                self.entries.insert(key, entity);
            }
            OrderPolicy::MoveToBack => {
                self.order.remove(index);
                self.order.push_back(key.clone());
                self.entries.insert(key, entity);
            }
        }
        Ok(true)
    }

    /// Replaces when the key is present, appends otherwise.
    pub fn upsert(&mut self, entity: Entity, policy: OrderPolicy) -> Result<()> {
        if !self.replace(entity.clone(), policy)? {
            self.push(entity)?;
        }
        Ok(())
    }

    /// Drops the oldest entries until at most `limit` remain. Returns how
    /// many were dropped.
    pub fn truncate_front(&mut self, limit: usize) -> usize {
        let mut dropped = 0;
        while self.order.len() > limit {
            if let Some(key) = self.order.pop_front() {
                self.entries.remove(&key);
                dropped += 1;
            }
        }
        dropped
    }

    /// Raw payload form: an array of each entity's raw attributes.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Array(self.iter().map(Entity::to_json).collect())
    }

    fn admit(&self, entity: &Entity) -> Result<EntityKey> {
        if entity.kind() != self.kind {
            return Err(MirrorError::ValidationError(format!(
                "Cannot store {} in a collection of {}",
                entity.kind(),
                self.kind
            )));
        }
        entity.key().ok_or(MirrorError::MissingKey(self.kind))
    }
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.order == other.order && self.entries == other.entries
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Entity;
    type IntoIter = Box<dyn Iterator<Item = &'a Entity> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn role(id: u64, name: &str) -> Entity {
        Entity::decode(EntityKind::Role, &json!({"id": id, "name": name})).unwrap()
    }

    fn names(collection: &Collection) -> Vec<String> {
        collection
            .iter()
            .map(|e| e.raw("name").and_then(|v| v.as_str()).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn push_rejects_duplicate_keys() {
        let mut roles = Collection::new(EntityKind::Role);
        roles.push(role(1, "admin")).unwrap();

        let err = roles.push(role(1, "again")).unwrap_err();
        assert!(matches!(err, MirrorError::DuplicateKey { .. }));
        assert_eq!(roles.len(), 1);
        assert_eq!(names(&roles), vec!["admin"]);
    }

    #[test]
    fn push_rejects_foreign_kind_and_missing_key() {
        let mut roles = Collection::new(EntityKind::Role);
        let user = Entity::decode(EntityKind::User, &json!({"id": 1})).unwrap();
        assert!(matches!(roles.push(user), Err(MirrorError::ValidationError(_))));

        let keyless = Entity::partial(EntityKind::Role, json!({"name": "x"}).as_object().unwrap().clone());
        assert_eq!(roles.push(keyless), Err(MirrorError::MissingKey(EntityKind::Role)));
    }

    #[test]
    fn find_by_returns_first_match_in_order() {
        let mut roles = Collection::new(EntityKind::Role);
        roles.push(role(1, "mod")).unwrap();
        roles.push(role(2, "mod")).unwrap();

        let found = roles.find_by("name", &json!("mod")).unwrap();
        assert_eq!(found.key(), Some(EntityKey::from(1u64)));
        assert!(roles.find_by("name", &json!("owner")).is_none());
    }

    #[test]
    fn removal_of_missing_key_is_noop() {
        let mut roles = Collection::new(EntityKind::Role);
        roles.push(role(1, "a")).unwrap();

        assert!(roles.remove_by_key(&EntityKey::from(9u64)).is_none());
        assert!(roles.remove_at(5).is_none());
        assert_eq!(roles.len(), 1);

        let removed = roles.remove_by_key(&EntityKey::from(1u64)).unwrap();
        assert_eq!(removed.key(), Some(EntityKey::from(1u64)));
        assert!(roles.is_empty());
    }

    #[test]
    fn replace_honours_order_policy() {
        let mut roles = Collection::new(EntityKind::Role);
        for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
            roles.push(role(id, name)).unwrap();
        }

        let mut preserved = roles.clone();
        assert!(preserved.replace(role(1, "a2"), OrderPolicy::Preserve).unwrap());
        assert_eq!(names(&preserved), vec!["a2", "b", "c"]);

        let mut moved = roles.clone();
        assert!(moved.replace(role(1, "a2"), OrderPolicy::MoveToBack).unwrap());
        assert_eq!(names(&moved), vec!["b", "c", "a2"]);

        assert!(!roles.replace(role(4, "d"), OrderPolicy::Preserve).unwrap());
        assert_eq!(roles.len(), 3);
    }

    #[test]
    fn clones_are_independent_snapshots() {
        let mut roles = Collection::new(EntityKind::Role);
        roles.push(role(1, "a")).unwrap();
        let snapshot = roles.clone();

        roles.upsert(role(2, "b"), OrderPolicy::Preserve).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(roles.len(), 2);
    }

    #[test]
    fn truncate_front_drops_oldest() {
        let mut roles = Collection::new(EntityKind::Role);
        for id in 1..=5 {
            roles.push(role(id, "r")).unwrap();
        }

        assert_eq!(roles.truncate_front(2), 3);
        let keys: Vec<_> = roles.keys().cloned().collect();
        assert_eq!(keys, vec![EntityKey::from(4u64), EntityKey::from(5u64)]);
    }
}
