use crate::core::{EntityKind, Result};
use crate::entity::resolver::{Derived, EmbeddedEntity};
use crate::entity::{Attribute, Entity, EntitySchema, ResourceRoutes};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

const INVITE_BASE: &str = "https://discord.gg";

const FILLABLE: &[&str] = &[
    "code",
    "max_age",
    "guild",
    "revoked",
    "created_at",
    "temporary",
    "uses",
    "max_uses",
    "inviter",
    "xkcdpass",
    "channel",
];

pub(crate) fn schema() -> Arc<EntitySchema> {
    EntitySchema::builder(EntityKind::Invite)
        .key("code")
        .fillable(FILLABLE)
        .routes(
            ResourceRoutes::none()
                .get("invites/:code")
                .create("channels/:channel.id/invites")
                .delete("invite/:code"),
        )
        .creatable(|_| Ok(json!({})))
        .resolver("invite_url", Derived(invite_url))
        .resolver(
            "guild",
            EmbeddedEntity {
                field: "guild",
                kind: EntityKind::Guild,
            },
        )
        .resolver(
            "channel",
            EmbeddedEntity {
                field: "channel",
                kind: EntityKind::Channel,
            },
        )
        .resolver(
            "inviter",
            EmbeddedEntity {
                field: "inviter",
                kind: EntityKind::User,
            },
        )
        .resolver(
            "channel_id",
            Derived(|entity| Ok(entity.raw_path("channel.id").cloned().into())),
        )
        .build()
}

fn invite_url(entity: &Entity) -> Result<Attribute> {
    Ok(match entity.key() {
        Some(code) => Attribute::Value(JsonValue::String(format!("{}/{}", INVITE_BASE, code))),
        None => Attribute::Missing,
    })
}
