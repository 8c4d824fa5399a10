use crate::core::{EntityKind, Result};
use crate::entity::resolver::EmbeddedEntity;
use crate::entity::{Entity, EntitySchema, ResourceRoutes, pick};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

const FILLABLE: &[&str] = &[
    "id",
    "channel_id",
    "content",
    "mentions",
    "author",
    "mention_everyone",
    "timestamp",
    "edited_timestamp",
    "tts",
    "attachments",
    "embeds",
    "nonce",
];

pub(crate) fn schema() -> Arc<EntitySchema> {
    EntitySchema::builder(EntityKind::Message)
        .fillable(FILLABLE)
        .routes(
            ResourceRoutes::none()
                .get("channels/:channel_id/messages/:id")
                .create("channels/:channel_id/messages")
                .update("channels/:channel_id/messages/:id")
                .delete("channels/:channel_id/messages/:id"),
        )
        .creatable(creatable)
        .updatable(|entity| Ok(pick(entity, &["content"])))
        .resolver(
            "author",
            EmbeddedEntity {
                field: "author",
                kind: EntityKind::User,
            },
        )
        .build()
}

fn creatable(entity: &Entity) -> Result<JsonValue> {
    let mut body = json!({
        "content": entity.raw("content").cloned().unwrap_or(JsonValue::Null),
        "tts": entity.raw("tts").cloned().unwrap_or(JsonValue::Bool(false)),
    });
    if let (Some(nonce), Some(object)) = (entity.raw("nonce"), body.as_object_mut()) {
        object.insert("nonce".to_string(), nonce.clone());
    }
    Ok(body)
}
