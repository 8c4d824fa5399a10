use crate::core::EntityKind;
use crate::entity::{EntitySchema, ResourceRoutes, pick};
use std::sync::Arc;

const FILLABLE: &[&str] = &[
    "id",
    "name",
    "color",
    "managed",
    "hoist",
    "position",
    "permissions",
    "guild_id",
];

pub(crate) fn schema() -> Arc<EntitySchema> {
    EntitySchema::builder(EntityKind::Role)
        .fillable(FILLABLE)
        .routes(
            ResourceRoutes::none()
                .create("guilds/:guild_id/roles")
                .update("guilds/:guild_id/roles/:id")
                .delete("guilds/:guild_id/roles/:id"),
        )
        .creatable(|_| Ok(serde_json::json!({})))
        .updatable(|entity| {
            Ok(pick(
                entity,
                &["name", "color", "hoist", "position", "permissions"],
            ))
        })
        .build()
}
