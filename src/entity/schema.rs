use super::resolver::{AttributeResolver, Inject};
use super::route::ResourceRoutes;
use super::Entity;
use crate::core::{EntityKind, Result};
use serde_json::{Map, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Builds a create/update request body from an entity.
pub type PayloadFn = fn(&Entity) -> Result<JsonValue>;

/// A relation carried inline by event-stream payloads.
///
/// When an authoritative payload contains `field`, the decoder materializes
/// it as a collection cached under `name`. With `keep_raw` the array also
/// stays in the raw attributes (the relation is backed by that field);
/// otherwise it is stripped from raw to avoid two copies drifting apart.
#[derive(Debug, Clone, Copy)]
pub struct Embedded {
    pub name: &'static str,
    pub field: &'static str,
    pub kind: EntityKind,
    pub inject: Inject,
    pub keep_raw: bool,
}

/// Schema descriptor shared by every entity of one kind.
pub struct EntitySchema {
    kind: EntityKind,
    key_path: &'static str,
    fillable: HashSet<&'static str>,
    routes: ResourceRoutes,
    creatable: PayloadFn,
    updatable: PayloadFn,
    fill_after_save: bool,
    resolvers: HashMap<String, Arc<dyn AttributeResolver>>,
    embedded: Vec<Embedded>,
}

impl EntitySchema {
    pub fn builder(kind: EntityKind) -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            schema: EntitySchema {
                kind,
                key_path: "id",
                fillable: HashSet::new(),
                routes: ResourceRoutes::none(),
                creatable: fillable_payload,
                updatable: fillable_payload,
                fill_after_save: true,
                resolvers: HashMap::new(),
                embedded: Vec::new(),
            },
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn key_path(&self) -> &'static str {
        self.key_path
    }

    pub fn is_fillable(&self, field: &str) -> bool {
        self.fillable.contains(field)
    }

    pub fn fillable(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fillable.iter().copied()
    }

    pub fn routes(&self) -> &ResourceRoutes {
        &self.routes
    }

    pub fn creatable(&self) -> PayloadFn {
        self.creatable
    }

    pub fn updatable(&self) -> PayloadFn {
        self.updatable
    }

    pub fn fill_after_save(&self) -> bool {
        self.fill_after_save
    }

    pub fn resolver(&self, name: &str) -> Option<Arc<dyn AttributeResolver>> {
        self.resolvers.get(name).cloned()
    }

    pub fn has_resolver(&self, name: &str) -> bool {
        self.resolvers.contains_key(name)
    }

    pub fn embedded(&self) -> &[Embedded] {
        &self.embedded
    }

    pub fn relation(&self, name: &str) -> Option<&Embedded> {
        self.embedded.iter().find(|relation| relation.name == name)
    }
}

impl fmt::Debug for EntitySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut resolvers: Vec<_> = self.resolvers.keys().collect();
        resolvers.sort();
        f.debug_struct("EntitySchema")
            .field("kind", &self.kind)
            .field("key_path", &self.key_path)
            .field("routes", &self.routes)
            .field("resolvers", &resolvers)
            .finish()
    }
}

pub struct EntitySchemaBuilder {
    schema: EntitySchema,
}

impl EntitySchemaBuilder {
    /// Dotted raw path holding the entity key. Defaults to `id`.
    pub fn key(mut self, path: &'static str) -> Self {
        self.schema.key_path = path;
        self
    }

    pub fn fillable(mut self, fields: &[&'static str]) -> Self {
        self.schema.fillable.extend(fields.iter().copied());
        self
    }

    pub fn routes(mut self, routes: ResourceRoutes) -> Self {
        self.schema.routes = routes;
        self
    }

    pub fn creatable(mut self, payload: PayloadFn) -> Self {
        self.schema.creatable = payload;
        self
    }

    pub fn updatable(mut self, payload: PayloadFn) -> Self {
        self.schema.updatable = payload;
        self
    }

    pub fn fill_after_save(mut self, fill: bool) -> Self {
        self.schema.fill_after_save = fill;
        self
    }

    pub fn resolver(mut self, name: impl Into<String>, resolver: impl AttributeResolver + 'static) -> Self {
        self.schema.resolvers.insert(name.into(), Arc::new(resolver));
        self
    }

    pub fn embed(mut self, relation: Embedded) -> Self {
        self.schema.embedded.push(relation);
        self
    }

    pub fn build(self) -> Arc<EntitySchema> {
        Arc::new(self.schema)
    }
}

/// Default request body: every fillable field currently set.
pub fn fillable_payload(entity: &Entity) -> Result<JsonValue> {
    let schema = entity.schema();
    let mut body = Map::new();
    for field in schema.fillable() {
        if let Some(value) = entity.raw(field) {
            body.insert(field.to_string(), value.clone());
        }
    }
    Ok(JsonValue::Object(body))
}

/// Request body made of exactly `fields`, `null` for unset ones.
pub fn pick(entity: &Entity, fields: &[&str]) -> JsonValue {
    let body = fields
        .iter()
        .map(|field| {
            let value = entity.raw(field).cloned().unwrap_or(JsonValue::Null);
            (field.to_string(), value)
        })
        .collect();
    JsonValue::Object(body)
}
