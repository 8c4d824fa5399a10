use crate::core::EntityKind;
use crate::entity::resolver::EmbeddedEntity;
use crate::entity::{EntitySchema, ResourceRoutes};
use std::sync::Arc;

pub(crate) fn schema() -> Arc<EntitySchema> {
    EntitySchema::builder(EntityKind::Ban)
        .key("user.id")
        .fillable(&["user", "guild_id", "reason"])
        .routes(
            ResourceRoutes::none()
                .create("guilds/:guild_id/bans/:user.id")
                .delete("guilds/:guild_id/bans/:user.id"),
        )
        .creatable(|_| Ok(serde_json::json!({})))
        .resolver(
            "user",
            EmbeddedEntity {
                field: "user",
                kind: EntityKind::User,
            },
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EntityKey;
    use crate::entity::Entity;
    use crate::remote::{InMemoryRemote, RequestMethod};
    use serde_json::json;

    #[tokio::test]
    async fn ban_is_keyed_and_routed_by_user() {
        let remote = InMemoryRemote::new();
        let ban = Entity::decode(
            EntityKind::Ban,
            &json!({"guild_id": 2, "user": {"id": 8, "username": "troll"}, "reason": "spam"}),
        )
        .unwrap();

        assert_eq!(ban.key(), Some(EntityKey::from(8u64)));
        let user = ban.get("user", &remote).await.unwrap().into_entity().unwrap();
        assert_eq!(user.raw_str("username"), Some("troll"));

        ban.delete(&remote).await.unwrap();
        assert_eq!(remote.request_count(RequestMethod::Delete, "guilds/2/bans/8").await, 1);
    }
}
