//! The logged-in account.

use super::user::avatar_url;
use crate::core::{EntityKind, MirrorError, Result};
use crate::entity::resolver::{Derived, FetchCollection};
use crate::entity::{Attribute, Entity, EntitySchema, ResourceRoutes};
use serde_json::{Map, Value as JsonValue, json};
use std::sync::Arc;

const FILLABLE: &[&str] = &[
    "id",
    "username",
    "password",
    "email",
    "verified",
    "avatar",
    "discriminator",
    "new_password",
    "avatarhash",
];

/// Fields of the client that also describe it as a plain user.
const USER_FIELDS: &[&str] = &["id", "username", "avatar", "discriminator"];

pub(crate) fn schema() -> Arc<EntitySchema> {
    EntitySchema::builder(EntityKind::Client)
        .fillable(FILLABLE)
        .routes(ResourceRoutes::none().update("users/@me"))
        .updatable(updatable)
        .resolver(
            "guilds",
            FetchCollection {
                route: "users/@me/guilds",
                kind: EntityKind::Guild,
                inject: &[],
            },
        )
        .resolver("user", Derived(as_user))
        .resolver("avatar", Derived(avatar_url))
        .resolver(
            "avatar_id",
            Derived(|entity| Ok(entity.raw("avatar").cloned().into())),
        )
        .build()
}

fn as_user(entity: &Entity) -> Result<Attribute> {
    let fields: Map<String, JsonValue> = USER_FIELDS
        .iter()
        .filter_map(|field| Some((field.to_string(), entity.raw(field)?.clone())))
        .collect();
    Ok(Entity::partial(EntityKind::User, fields).into())
}

fn updatable(entity: &Entity) -> Result<JsonValue> {
    let password = match entity.raw_str("password") {
        Some(password) if !password.is_empty() => password,
        _ => {
            return Err(MirrorError::ValidationError(
                "The current password is required to update the profile".to_string(),
            ));
        }
    };

    let field = |name: &str| entity.raw(name).cloned().unwrap_or(JsonValue::Null);
    let mut body = json!({
        "username": field("username"),
        "email": field("email"),
        "password": password,
        "avatar": field("avatarhash"),
    });
    if let (Some(new_password), Some(object)) = (
        entity.raw_str("new_password").filter(|value| !value.is_empty()),
        body.as_object_mut(),
    ) {
        object.insert("new_password".to_string(), json!(new_password));
    }
    Ok(body)
}
