use super::ASSET_BASE;
use crate::core::{EntityKind, MirrorError, Result};
use crate::entity::resolver::Derived;
use crate::entity::{Attribute, Entity, EntitySchema, ResourceRoutes};
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub(crate) fn schema() -> Arc<EntitySchema> {
    EntitySchema::builder(EntityKind::User)
        .fillable(&["id", "username", "avatar", "discriminator"])
        .routes(ResourceRoutes::none().get("users/:id"))
        .resolver("avatar", Derived(avatar_url))
        .build()
}

/// Avatar link for users and the client, `null` when no avatar is set.
pub(crate) fn avatar_url(entity: &Entity) -> Result<Attribute> {
    let (Some(hash), Some(id)) = (entity.raw_str("avatar"), entity.key()) else {
        return Ok(Attribute::Value(JsonValue::Null));
    };
    if hash.is_empty() {
        return Ok(Attribute::Value(JsonValue::Null));
    }
    Ok(Attribute::Value(JsonValue::String(format!(
        "{}/users/{}/avatars/{}.jpg",
        ASSET_BASE, id, hash
    ))))
}

impl Entity {
    /// Chat mention markup, `<@id>`, for users, members and the client.
    pub fn mention(&self) -> Result<String> {
        match self.kind() {
            EntityKind::User | EntityKind::Member | EntityKind::Client => {}
            kind => {
                return Err(MirrorError::Unsupported {
                    kind,
                    operation: "mention",
                });
            }
        }
        let id = self.key().ok_or(MirrorError::MissingKey(self.kind()))?;
        Ok(format!("<@{}>", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryRemote;
    use serde_json::json;

    #[test]
    fn mention_uses_user_id() {
        let user = Entity::decode(EntityKind::User, &json!({"id": 12})).unwrap();
        assert_eq!(user.mention().unwrap(), "<@12>");

        let member = Entity::decode(EntityKind::Member, &json!({"user": {"id": "13"}})).unwrap();
        assert_eq!(member.mention().unwrap(), "<@13>");

        let role = Entity::decode(EntityKind::Role, &json!({"id": 1})).unwrap();
        assert!(matches!(role.mention(), Err(MirrorError::Unsupported { .. })));
    }

    #[tokio::test]
    async fn avatar_is_a_url_or_null() {
        let remote = InMemoryRemote::new();
        let user = Entity::decode(EntityKind::User, &json!({"id": 12, "avatar": "f00"})).unwrap();
        assert_eq!(
            user.get("avatar", &remote).await.unwrap().as_str(),
            Some("https://discordapp.com/api/users/12/avatars/f00.jpg")
        );

        let plain = Entity::decode(EntityKind::User, &json!({"id": 12})).unwrap();
        assert_eq!(plain.get("avatar", &remote).await.unwrap(), Attribute::Value(JsonValue::Null));
    }
}
