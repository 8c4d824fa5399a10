//! Computed-attribute resolvers
//!
//! A resolver is registered on a schema under an attribute name and runs
//! the first time `Entity::get` asks for that name. The result is memoized
//! in the entity cache until the same-named raw field is set.

use super::route::render;
use super::{Attribute, Entity};
use crate::collection::{Collection, OrderPolicy};
use crate::core::{EntityKey, EntityKind, MirrorError, Result};
use crate::remote::{Params, RemoteDataSource};
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

/// Parent field copied into each decoded child: `(child_field, parent_path)`.
/// A parent path of `id` reads the parent's key.
pub type Inject = &'static [(&'static str, &'static str)];

#[async_trait]
pub trait AttributeResolver: Send + Sync {
    /// Short label for logs.
    fn describe(&self) -> &'static str;

    async fn resolve(&self, entity: &Entity, remote: &dyn RemoteDataSource) -> Result<Attribute>;

    /// Mirrors a value stored under this resolver's name back into the raw
    /// attributes, for relations whose source of truth is a raw field.
    fn write_back(&self, _attributes: &mut Map<String, JsonValue>, _value: &Attribute) {}
}

/// Synchronous value computed from the entity alone.
pub struct Derived(pub fn(&Entity) -> Result<Attribute>);

#[async_trait]
impl AttributeResolver for Derived {
    fn describe(&self) -> &'static str {
        "derived"
    }

    async fn resolve(&self, entity: &Entity, _remote: &dyn RemoteDataSource) -> Result<Attribute> {
        (self.0)(entity)
    }
}

/// Fetches a list from `route` and decodes it into a collection.
pub struct FetchCollection {
    pub route: &'static str,
    pub kind: EntityKind,
    pub inject: Inject,
}

#[async_trait]
impl AttributeResolver for FetchCollection {
    fn describe(&self) -> &'static str {
        "fetch-collection"
    }

    async fn resolve(&self, entity: &Entity, remote: &dyn RemoteDataSource) -> Result<Attribute> {
        let path = render(self.route, entity)?;
        let response = remote.fetch(&path, &Params::new()).await?;
        let items = list_items(&path, response)?;
        Ok(Attribute::Collection(collect(
            self.kind,
            items.iter(),
            entity,
            self.inject,
        )?))
    }
}

/// Fetches a single object from `route`.
pub struct FetchEntity {
    pub route: &'static str,
    pub kind: EntityKind,
}

#[async_trait]
impl AttributeResolver for FetchEntity {
    fn describe(&self) -> &'static str {
        "fetch-entity"
    }

    async fn resolve(&self, entity: &Entity, remote: &dyn RemoteDataSource) -> Result<Attribute> {
        let path = render(self.route, entity)?;
        let response = remote.fetch(&path, &Params::new()).await?;
        Ok(Entity::from_remote(self.kind, &response)?.into())
    }
}

/// Builds a collection from a raw array field of the same entity. The raw
/// field stays the source of truth: replacing the collection rewrites it.
pub struct RawCollection {
    pub field: &'static str,
    pub kind: EntityKind,
    pub inject: Inject,
}

impl RawCollection {
    pub fn build(&self, entity: &Entity) -> Result<Collection> {
        match entity.raw(self.field) {
            None | Some(JsonValue::Null) => Ok(Collection::new(self.kind)),
            Some(JsonValue::Array(items)) => collect(self.kind, items.iter(), entity, self.inject),
            Some(other) => Err(MirrorError::malformed(format!(
                "{}.{} should be an array, got {}",
                entity.kind(),
                self.field,
                other
            ))),
        }
    }
}

#[async_trait]
impl AttributeResolver for RawCollection {
    fn describe(&self) -> &'static str {
        "raw-collection"
    }

    async fn resolve(&self, entity: &Entity, _remote: &dyn RemoteDataSource) -> Result<Attribute> {
        self.build(entity).map(Attribute::Collection)
    }

    fn write_back(&self, attributes: &mut Map<String, JsonValue>, value: &Attribute) {
        if let Some(collection) = value.as_collection() {
            attributes.insert(self.field.to_string(), collection.to_json());
        }
    }
}

/// Decodes a nested raw object into an entity.
pub struct EmbeddedEntity {
    pub field: &'static str,
    pub kind: EntityKind,
}

#[async_trait]
impl AttributeResolver for EmbeddedEntity {
    fn describe(&self) -> &'static str {
        "embedded-entity"
    }

    async fn resolve(&self, entity: &Entity, _remote: &dyn RemoteDataSource) -> Result<Attribute> {
        match entity.raw(self.field) {
            None | Some(JsonValue::Null) => Ok(Attribute::Missing),
            Some(value) => Ok(Entity::from_remote(self.kind, value)?.into()),
        }
    }
}

/// Fetches a list from `route` and keeps the items whose key appears in
/// the raw id list `ids_field`. Replacing the collection rewrites the id
/// list from the collection keys.
pub struct FilteredFetch {
    pub route: &'static str,
    pub kind: EntityKind,
    pub ids_field: &'static str,
}

#[async_trait]
impl AttributeResolver for FilteredFetch {
    fn describe(&self) -> &'static str {
        "filtered-fetch"
    }

    async fn resolve(&self, entity: &Entity, remote: &dyn RemoteDataSource) -> Result<Attribute> {
        let wanted: Vec<EntityKey> = match entity.raw(self.ids_field) {
            Some(JsonValue::Array(ids)) => ids.iter().filter_map(EntityKey::from_json).collect(),
            _ => Vec::new(),
        };
        if wanted.is_empty() {
            return Ok(Attribute::Collection(Collection::new(self.kind)));
        }

        let path = render(self.route, entity)?;
        let response = remote.fetch(&path, &Params::new()).await?;
        let items = list_items(&path, response)?;
        let kept = items.iter().filter(|item| {
            item.get("id")
                .and_then(EntityKey::from_json)
                .is_some_and(|key| wanted.contains(&key))
        });
        Ok(Attribute::Collection(collect(self.kind, kept, entity, &[])?))
    }

    fn write_back(&self, attributes: &mut Map<String, JsonValue>, value: &Attribute) {
        if let Some(collection) = value.as_collection() {
            let ids = collection.keys().map(EntityKey::to_json).collect();
            attributes.insert(self.ids_field.to_string(), JsonValue::Array(ids));
        }
    }
}

/// An empty remote result (`null`) is an empty list, not an error.
fn list_items(path: &str, response: JsonValue) -> Result<Vec<JsonValue>> {
    match response {
        JsonValue::Array(items) => Ok(items),
        JsonValue::Null => Ok(Vec::new()),
        other => Err(MirrorError::malformed(format!(
            "Expected a list from '{}', got {}",
            path, other
        ))),
    }
}

fn collect<'a>(
    kind: EntityKind,
    items: impl Iterator<Item = &'a JsonValue>,
    parent: &Entity,
    inject: Inject,
) -> Result<Collection> {
    let mut collection = Collection::new(kind);
    for item in items {
        let child = Entity::from_remote(kind, &with_injected(item, parent, inject)?)?;
        collection.upsert(child, OrderPolicy::Preserve)?;
    }
    Ok(collection)
}

/// Copies parent fields into a child payload where the child lacks them.
pub(crate) fn with_injected(item: &JsonValue, parent: &Entity, inject: Inject) -> Result<JsonValue> {
    let mut object = item
        .as_object()
        .cloned()
        .ok_or_else(|| MirrorError::malformed(format!("Expected an object, got {}", item)))?;

    for (child_field, parent_path) in inject {
        if object.contains_key(*child_field) {
            continue;
        }
        let value = if *parent_path == "id" {
            parent.key().map(|key| key.to_json())
        } else {
            parent.raw_path(parent_path).cloned()
        };
        if let Some(value) = value {
            object.insert(child_field.to_string(), value);
        }
    }
    Ok(JsonValue::Object(object))
}
