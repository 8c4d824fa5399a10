//! Entities: raw attributes, computed attributes and remote lifecycle
//!
//! An `Entity` is one mirrored remote object. Its behaviour comes from an
//! `EntitySchema` shared by every entity of the same kind:
//!
//! - `attributes` hold the last authoritative payload; only fillable fields
//!   may be written through `set`
//! - `cache` memoizes computed attributes and holds relations materialized
//!   from the event stream
//! - the schema routes drive `create`/`update`/`delete`/`refresh`
//!
//! Entities have value semantics. Cloning copies raw and cached state, and
//! the reconciliation engine always builds new entities instead of
//! mutating ones a caller may still hold.

mod attribute;
pub mod resolver;
pub mod route;
mod schema;

pub use attribute::Attribute;
pub use route::{Operation, ResourceRoutes};
pub use schema::{Embedded, EntitySchema, EntitySchemaBuilder, PayloadFn, fillable_payload, pick};

use crate::collection::{Collection, OrderPolicy};
use crate::core::{EntityKey, EntityKind, MirrorError, Result, lookup_path};
use crate::parts;
use crate::remote::{Params, RemoteDataSource};
use log::{debug, trace};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct Entity {
    schema: Arc<EntitySchema>,
    attributes: Map<String, JsonValue>,
    cache: Mutex<HashMap<String, Attribute>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One attribute of one live entity.
type Frame = (usize, String);

tokio::task_local! {
    /// Attributes being resolved by the enclosing resolver calls, outermost
    /// first. Sibling futures polled by the same task each see their own
    /// chain.
    static RESOLUTION_CHAIN: Vec<Frame>;
}

impl Entity {
    // ========================================================================
    // Construction
    // ========================================================================

    /// An empty local entity, e.g. a guild about to be created remotely.
    pub fn new(kind: EntityKind) -> Self {
        Self::with_schema(parts::schema_for(kind), Map::new())
    }

    /// Wraps raw attributes without any validation or relation seeding.
    pub fn partial(kind: EntityKind, attributes: Map<String, JsonValue>) -> Self {
        Self::with_schema(parts::schema_for(kind), attributes)
    }

    pub fn with_schema(schema: Arc<EntitySchema>, attributes: Map<String, JsonValue>) -> Self {
        Self {
            schema,
            attributes,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Decodes an authoritative (event stream) payload.
    ///
    /// The payload must be an object carrying the kind's key. Embedded
    /// relations present in the payload are materialized into the cache,
    /// recursively.
    pub fn decode(kind: EntityKind, payload: &JsonValue) -> Result<Self> {
        let attributes = payload.as_object().cloned().ok_or_else(|| {
            MirrorError::malformed(format!("{} payload must be an object, got {}", kind, payload))
        })?;

        let mut entity = Self::partial(kind, attributes);
        if entity.key().is_none() {
            return Err(MirrorError::malformed(format!(
                "{} payload is missing '{}'",
                kind,
                entity.schema.key_path()
            )));
        }
        entity.seed_relations()?;
        Ok(entity)
    }

    /// Decodes a partial payload returned by a remote lookup. No key is
    /// required and nothing is materialized.
    pub fn from_remote(kind: EntityKind, payload: &JsonValue) -> Result<Self> {
        let attributes = payload.as_object().cloned().ok_or_else(|| {
            MirrorError::malformed(format!("{} response must be an object, got {}", kind, payload))
        })?;
        Ok(Self::partial(kind, attributes))
    }

    fn seed_relations(&mut self) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        for relation in schema.embedded() {
            let Some(value) = self.attributes.get(relation.field).cloned() else {
                continue;
            };
            let items = match value {
                JsonValue::Array(items) => items,
                JsonValue::Null => Vec::new(),
                other => {
                    return Err(MirrorError::malformed(format!(
                        "{}.{} should be an array, got {}",
                        self.kind(),
                        relation.field,
                        other
                    )));
                }
            };

            let mut collection = Collection::new(relation.kind);
            for item in &items {
                let child = resolver::with_injected(item, self, relation.inject)?;
                collection.upsert(Entity::decode(relation.kind, &child)?, OrderPolicy::Preserve)?;
            }

            if !relation.keep_raw {
                self.attributes.remove(relation.field);
            }
            self.cache_mut()
                .insert(relation.name.to_string(), Attribute::Collection(collection));
        }
        Ok(())
    }

    // ========================================================================
    // Identity and raw access
    // ========================================================================

    pub fn kind(&self) -> EntityKind {
        self.schema.kind()
    }

    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    pub fn key(&self) -> Option<EntityKey> {
        self.raw_path(self.schema.key_path())
            .and_then(EntityKey::from_json)
    }

    pub fn raw(&self, name: &str) -> Option<&JsonValue> {
        self.attributes.get(name)
    }

    /// Raw lookup through nested objects (`user.id`).
    pub fn raw_path(&self, path: &str) -> Option<&JsonValue> {
        lookup_path(&self.attributes, path)
    }

    pub fn raw_str(&self, name: &str) -> Option<&str> {
        self.raw(name).and_then(JsonValue::as_str)
    }

    pub fn attributes(&self) -> &Map<String, JsonValue> {
        &self.attributes
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.attributes.clone())
    }

    pub(crate) fn ensure_kind(&self, kind: EntityKind, operation: &'static str) -> Result<()> {
        if self.kind() != kind {
            return Err(MirrorError::Unsupported {
                kind: self.kind(),
                operation,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Attribute resolution
    // ========================================================================

    /// Resolves `name`: cached value first, then a registered resolver
    /// (memoized), then the raw field, then `Attribute::Missing`.
    ///
    /// A resolver that re-enters `get` for its own name on the same entity
    /// fails with `RecomputationCycle`.
    ///
    /// # Examples
    ///
    /// ```
    /// use guildmirror::{Entity, EntityKind, InMemoryRemote};
    /// use serde_json::json;
    ///
    /// # tokio_test::block_on(async {
    /// let remote = InMemoryRemote::new();
    /// let guild = Entity::decode(EntityKind::Guild, &json!({"id": 1, "icon": "abc"})).unwrap();
    ///
    /// let icon = guild.get("icon", &remote).await.unwrap();
    /// assert_eq!(icon.as_str(), Some("https://discordapp.com/api/guilds/1/icons/abc.jpg"));
    /// # });
    /// ```
    pub async fn get(&self, name: &str, remote: &dyn RemoteDataSource) -> Result<Attribute> {
        if let Some(hit) = self.cached(name) {
            return Ok(hit);
        }

        let Some(resolver) = self.schema.resolver(name) else {
            return Ok(self.raw(name).cloned().into());
        };

        let frame: Frame = (self as *const Entity as usize, name.to_string());
        let mut chain = RESOLUTION_CHAIN.try_with(|chain| chain.clone()).unwrap_or_default();
        if chain.contains(&frame) {
            return Err(MirrorError::RecomputationCycle(name.to_string()));
        }
        chain.push(frame);

        trace!("resolving {}.{} via {}", self.kind(), name, resolver.describe());
        let value = RESOLUTION_CHAIN
            .scope(chain, resolver.resolve(self, remote))
            .await?;
        lock(&self.cache).insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Resolves several attributes concurrently. Duplicate names are
    /// resolved once.
    pub async fn resolve_all(
        &self,
        names: &[&str],
        remote: &dyn RemoteDataSource,
    ) -> Result<Vec<Attribute>> {
        let mut unique: Vec<&str> = Vec::with_capacity(names.len());
        for name in names {
            if !unique.contains(name) {
                unique.push(name);
            }
        }

        let resolved =
            futures::future::try_join_all(unique.iter().map(|name| self.get(name, remote))).await?;
        let by_name: HashMap<&str, Attribute> = unique.into_iter().zip(resolved).collect();

        Ok(names
            .iter()
            .map(|name| by_name.get(name).cloned().unwrap_or(Attribute::Missing))
            .collect())
    }

    pub fn cached(&self, name: &str) -> Option<Attribute> {
        lock(&self.cache).get(name).cloned()
    }

    pub fn is_cached(&self, name: &str) -> bool {
        lock(&self.cache).contains_key(name)
    }

    fn cache_mut(&mut self) -> &mut HashMap<String, Attribute> {
        self.cache.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes a fillable raw field and evicts the computed attribute of the
    /// same name. Nothing else is invalidated.
    pub fn set(&mut self, name: &str, value: impl Into<JsonValue>) -> Result<()> {
        if !self.schema.is_fillable(name) {
            return Err(MirrorError::NotFillable {
                kind: self.kind(),
                field: name.to_string(),
            });
        }
        self.attributes.insert(name.to_string(), value.into());
        self.cache_mut().remove(name);
        Ok(())
    }

    /// Sets every field of `values`, or none of them if any is not fillable.
    pub fn fill(&mut self, values: Map<String, JsonValue>) -> Result<()> {
        if let Some(field) = values.keys().find(|field| !self.schema.is_fillable(field)) {
            return Err(MirrorError::NotFillable {
                kind: self.kind(),
                field: field.clone(),
            });
        }
        for (name, value) in values {
            self.set(&name, value)?;
        }
        Ok(())
    }

    /// Evicts one computed attribute. Returns whether it was cached.
    pub fn invalidate(&mut self, name: &str) -> bool {
        self.cache_mut().remove(name).is_some()
    }

    pub fn invalidate_all(&mut self) {
        self.cache_mut().clear();
    }

    /// Raw write that bypasses the whitelist and leaves the cache alone.
    pub(crate) fn set_raw(&mut self, name: &str, value: JsonValue) {
        self.attributes.insert(name.to_string(), value);
    }

    pub(crate) fn store_cached(&mut self, name: &str, value: Attribute) {
        self.cache_mut().insert(name.to_string(), value);
    }

    // ========================================================================
    // Relations
    // ========================================================================

    /// Current value of an embedded relation: the materialized collection,
    /// else one built from its backing raw field, else an empty collection.
    /// `None` when `name` is not a relation of this kind.
    pub fn relation(&self, name: &str) -> Option<Collection> {
        let declared = self.schema.relation(name)?;
        if let Some(Attribute::Collection(collection)) = self.cached(name) {
            return Some(collection);
        }
        if declared.keep_raw {
            let built = resolver::RawCollection {
                field: declared.field,
                kind: declared.kind,
                inject: declared.inject,
            }
            .build(self)
            .unwrap_or_else(|_| Collection::new(declared.kind));
            return Some(built);
        }
        Some(Collection::new(declared.kind))
    }

    pub fn has_materialized(&self, name: &str) -> bool {
        matches!(self.cached(name), Some(Attribute::Collection(_)))
    }

    /// A copy of this entity with `collection` stored under `name`. When the
    /// relation is backed by a raw field the raw field is rewritten too.
    pub fn with_relation(&self, name: &str, collection: Collection) -> Entity {
        let mut next = self.clone();
        let value = Attribute::Collection(collection);
        if let Some(resolver) = self.schema.resolver(name) {
            resolver.write_back(&mut next.attributes, &value);
        }
        next.cache_mut().insert(name.to_string(), value);
        next
    }

    /// Copies materialized relations of `previous` that this entity lacks.
    /// Used when an update payload does not carry nested relations.
    pub fn inherit_relations(&mut self, previous: &Entity) {
        let schema = Arc::clone(&self.schema);
        for relation in schema.embedded() {
            if self.has_materialized(relation.name) {
                continue;
            }
            if relation.keep_raw && self.attributes.contains_key(relation.field) {
                continue;
            }
            if let Some(Attribute::Collection(collection)) = previous.cached(relation.name) {
                if relation.keep_raw {
                    self.attributes
                        .insert(relation.field.to_string(), collection.to_json());
                }
                self.cache_mut()
                    .insert(relation.name.to_string(), Attribute::Collection(collection));
            }
        }
    }

    // ========================================================================
    // Remote lifecycle
    // ========================================================================

    fn route(&self, operation: Operation) -> Result<String> {
        let template = self
            .schema
            .routes()
            .template(operation)
            .ok_or(MirrorError::Unsupported {
                kind: self.kind(),
                operation: operation.name(),
            })?;
        route::render(template, self)
    }

    /// Replaces raw attributes with a server response. Cached entries named
    /// like a field of the response are evicted.
    pub(crate) fn absorb(&mut self, response: JsonValue) -> Result<()> {
        let JsonValue::Object(attributes) = response else {
            return Err(MirrorError::malformed(format!(
                "{} response must be an object",
                self.kind()
            )));
        };
        let cache = self.cache.get_mut().unwrap_or_else(PoisonError::into_inner);
        cache.retain(|name, _| !attributes.contains_key(name));
        self.attributes = attributes;
        Ok(())
    }

    /// Merges a partial server response over the raw attributes. Fields the
    /// response leaves out keep their value; cached entries named like a
    /// field of the response are evicted.
    pub(crate) fn merge(&mut self, response: JsonValue) -> Result<()> {
        let JsonValue::Object(fields) = response else {
            return Err(MirrorError::malformed(format!(
                "{} response must be an object",
                self.kind()
            )));
        };
        for (name, value) in fields {
            self.cache_mut().remove(&name);
            self.attributes.insert(name, value);
        }
        Ok(())
    }

    pub async fn create(&mut self, remote: &dyn RemoteDataSource) -> Result<()> {
        let path = self.route(Operation::Create)?;
        let body = (self.schema.creatable())(self)?;
        debug!("creating {} at {}", self.kind(), path);
        let response = remote.create(&path, &Params::new(), Some(&body)).await?;
        if self.schema.fill_after_save() {
            self.absorb(response)?;
        }
        Ok(())
    }

    pub async fn update(&mut self, remote: &dyn RemoteDataSource) -> Result<()> {
        let path = self.route(Operation::Update)?;
        let body = (self.schema.updatable())(self)?;
        debug!("updating {} at {}", self.kind(), path);
        let response = remote.update(&path, &Params::new(), Some(&body)).await?;
        if self.schema.fill_after_save() {
            self.absorb(response)?;
        }
        Ok(())
    }

    /// Deletes remotely. The entity stays wherever it is stored; removal
    /// from the mirror happens when the matching delete event arrives.
    pub async fn delete(&self, remote: &dyn RemoteDataSource) -> Result<()> {
        let path = self.route(Operation::Delete)?;
        debug!("deleting {} at {}", self.kind(), path);
        remote.delete(&path, &Params::new(), None).await?;
        Ok(())
    }

    /// Re-reads the entity through its get route.
    pub async fn refresh(&mut self, remote: &dyn RemoteDataSource) -> Result<()> {
        let path = self.route(Operation::Get)?;
        let response = remote.fetch(&path, &Params::new()).await?;
        self.absorb(response)
    }
}

impl Clone for Entity {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            attributes: self.attributes.clone(),
            cache: Mutex::new(lock(&self.cache).clone()),
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.kind() != other.kind() || self.attributes != other.attributes {
            return false;
        }
        // Never hold both locks: the same nodes are shared across snapshots
        // and may be compared from another thread in the opposite order.
        let mine = lock(&self.cache).clone();
        mine == *lock(&other.cache)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cached: Vec<String> = lock(&self.cache).keys().cloned().collect();
        cached.sort();
        f.debug_struct("Entity")
            .field("kind", &self.kind())
            .field("attributes", &self.attributes)
            .field("cached", &cached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryRemote;
    use serde_json::json;

    #[test]
    fn decode_requires_object_and_key() {
        assert!(matches!(
            Entity::decode(EntityKind::Role, &json!([1, 2])),
            Err(MirrorError::MalformedPayload(_))
        ));
        assert!(matches!(
            Entity::decode(EntityKind::Role, &json!({"name": "x"})),
            Err(MirrorError::MalformedPayload(_))
        ));
    }

    #[test]
    fn set_rejects_non_fillable() {
        let mut user = Entity::decode(EntityKind::User, &json!({"id": 1})).unwrap();
        let err = user.set("email", "a@b.c").unwrap_err();
        assert_eq!(
            err,
            MirrorError::NotFillable {
                kind: EntityKind::User,
                field: "email".to_string()
            }
        );
    }

    #[test]
    fn fill_is_all_or_nothing() {
        let mut user = Entity::decode(EntityKind::User, &json!({"id": 1, "username": "a"})).unwrap();
        let values = json!({"username": "b", "email": "x"}).as_object().unwrap().clone();

        assert!(user.fill(values).is_err());
        assert_eq!(user.raw_str("username"), Some("a"));
    }

    #[tokio::test]
    async fn raw_fallback_and_missing() {
        let remote = InMemoryRemote::new();
        let user = Entity::decode(EntityKind::User, &json!({"id": 1, "username": "a"})).unwrap();

        assert_eq!(user.get("username", &remote).await.unwrap(), Attribute::Value(json!("a")));
        assert!(user.get("nope", &remote).await.unwrap().is_missing());
    }

    #[test]
    fn opposite_comparisons_from_two_threads_finish() {
        let left = Arc::new(
            Entity::decode(EntityKind::Guild, &json!({"id": 1, "roles": [{"id": 2}]})).unwrap(),
        );
        let right = Arc::new(left.as_ref().clone());

        let forward = {
            let (left, right) = (Arc::clone(&left), Arc::clone(&right));
            std::thread::spawn(move || (0..10_000).all(|_| *left == *right))
        };
        let backward = std::thread::spawn(move || (0..10_000).all(|_| *right == *left));

        assert!(forward.join().unwrap());
        assert!(backward.join().unwrap());
    }

    #[test]
    fn clone_does_not_share_cache() {
        let guild = Entity::decode(EntityKind::Guild, &json!({"id": 1, "roles": []})).unwrap();
        let mut copy = guild.clone();
        copy.invalidate_all();

        assert!(guild.is_cached("roles"));
        assert!(!copy.is_cached("roles"));
    }
}
