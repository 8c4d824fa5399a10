use super::Entity;
use crate::collection::Collection;
use serde_json::Value as JsonValue;

/// Result of `Entity::get`.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Value(JsonValue),
    Entity(Box<Entity>),
    Collection(Collection),
    Missing,
}

impl Attribute {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_value(&self) -> Option<&JsonValue> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(JsonValue::as_str)
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn into_collection(self) -> Option<Collection> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn into_entity(self) -> Option<Entity> {
        match self {
            Self::Entity(entity) => Some(*entity),
            _ => None,
        }
    }
}

impl From<JsonValue> for Attribute {
    fn from(value: JsonValue) -> Self {
        Self::Value(value)
    }
}

impl From<Entity> for Attribute {
    fn from(entity: Entity) -> Self {
        Self::Entity(Box::new(entity))
    }
}

impl From<Collection> for Attribute {
    fn from(collection: Collection) -> Self {
        Self::Collection(collection)
    }
}

impl From<Option<JsonValue>> for Attribute {
    fn from(value: Option<JsonValue>) -> Self {
        value.map_or(Self::Missing, Self::Value)
    }
}
