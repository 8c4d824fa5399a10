//! Field access on raw event payloads.

use super::EventKind;
use crate::core::{EntityKey, MirrorError, Result, lookup_path};
use serde_json::{Map, Value as JsonValue};

pub(crate) fn object(event: EventKind, payload: &JsonValue) -> Result<&Map<String, JsonValue>> {
    payload.as_object().ok_or_else(|| {
        MirrorError::malformed(format!("{} payload must be an object, got {}", event, payload))
    })
}

/// Key stored at `path`, failing with `MalformedPayload` when absent.
pub(crate) fn key_at(event: EventKind, payload: &JsonValue, path: &str) -> Result<EntityKey> {
    optional_key(event, payload, path)?
        .ok_or_else(|| MirrorError::malformed(format!("{} payload is missing '{}'", event, path)))
}

pub(crate) fn optional_key(
    event: EventKind,
    payload: &JsonValue,
    path: &str,
) -> Result<Option<EntityKey>> {
    Ok(lookup_path(object(event, payload)?, path).and_then(EntityKey::from_json))
}

/// Payload of `field` (when it is an object) with `guild_id` copied in,
/// else the payload itself. Role events come in both shapes.
pub(crate) fn nested_with_guild(
    event: EventKind,
    payload: &JsonValue,
    field: &str,
) -> Result<JsonValue> {
    let outer = object(event, payload)?;
    let Some(JsonValue::Object(inner)) = outer.get(field) else {
        return Ok(payload.clone());
    };

    let mut inner = inner.clone();
    if let Some(guild_id) = outer.get("guild_id") {
        inner
            .entry("guild_id".to_string())
            .or_insert_with(|| guild_id.clone());
    }
    Ok(JsonValue::Object(inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_role_gets_guild_id() {
        let wrapped = json!({"guild_id": 1, "role": {"id": 5, "name": "a"}});
        let role = nested_with_guild(EventKind::GuildRoleCreate, &wrapped, "role").unwrap();
        assert_eq!(role, json!({"id": 5, "name": "a", "guild_id": 1}));

        let flat = json!({"guild_id": 1, "id": 5});
        assert_eq!(
            nested_with_guild(EventKind::GuildRoleUpdate, &flat, "role").unwrap(),
            flat
        );
    }

    #[test]
    fn missing_key_is_malformed() {
        let err = key_at(EventKind::GuildDelete, &json!({"name": "x"}), "id").unwrap_err();
        assert!(matches!(err, MirrorError::MalformedPayload(_)));
        assert!(key_at(EventKind::GuildDelete, &json!("x"), "id").is_err());
        assert_eq!(
            key_at(EventKind::GuildBanRemove, &json!({"user": {"id": "4"}}), "user.id").unwrap(),
            EntityKey::from(4u64)
        );
    }
}
