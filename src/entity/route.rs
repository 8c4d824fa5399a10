use super::Entity;
use crate::core::{EntityKey, MirrorError, Result};
use regex::{Captures, Regex};

lazy_static::lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r":([A-Za-z_][A-Za-z0-9_.]*)").unwrap();
}

/// Remote lifecycle operations an entity may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Path templates addressing an entity remotely. `None` means the
/// operation is unsupported for the kind.
///
/// Templates reference raw fields with `:field` (dotted paths allowed);
/// `:id` always resolves to the entity key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceRoutes {
    pub get: Option<&'static str>,
    pub create: Option<&'static str>,
    pub update: Option<&'static str>,
    pub delete: Option<&'static str>,
}

impl ResourceRoutes {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn get(mut self, template: &'static str) -> Self {
        self.get = Some(template);
        self
    }

    pub fn create(mut self, template: &'static str) -> Self {
        self.create = Some(template);
        self
    }

    pub fn update(mut self, template: &'static str) -> Self {
        self.update = Some(template);
        self
    }

    pub fn delete(mut self, template: &'static str) -> Self {
        self.delete = Some(template);
        self
    }

    pub fn template(&self, operation: Operation) -> Option<&'static str> {
        match operation {
            Operation::Get => self.get,
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

/// Substitutes every placeholder in `template` from `entity`.
pub fn render(template: &str, entity: &Entity) -> Result<String> {
    let mut missing = None;
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let variable = &caps[1];
        let value = if variable == "id" {
            entity.key()
        } else {
            entity.raw_path(variable).and_then(EntityKey::from_json)
        };
        match value {
            Some(key) => key.to_string(),
            None => {
                missing.get_or_insert_with(|| variable.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(variable) => Err(MirrorError::ValidationError(format!(
            "Route '{}' needs ':{}' but {} has no value for it",
            template,
            variable,
            entity.kind()
        ))),
        None => Ok(rendered.into_owned()),
    }
}
