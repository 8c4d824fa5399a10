use crate::core::{EntityKind, Result};
use crate::entity::resolver::{FetchCollection, Inject};
use crate::entity::{Embedded, Entity, EntitySchema, ResourceRoutes, pick};
use crate::remote::RemoteDataSource;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

const FILLABLE: &[&str] = &[
    "id",
    "name",
    "type",
    "topic",
    "guild_id",
    "position",
    "is_private",
    "last_message_id",
    "permission_overwrites",
    "recipient",
];

const CHILD_OF_CHANNEL: Inject = &[("channel_id", "id")];

pub(crate) fn schema() -> Arc<EntitySchema> {
    EntitySchema::builder(EntityKind::Channel)
        .fillable(FILLABLE)
        .routes(
            ResourceRoutes::none()
                .get("channels/:id")
                .create("guilds/:guild_id/channels")
                .update("channels/:id")
                .delete("channels/:id"),
        )
        .creatable(|entity| Ok(pick(entity, &["name", "type"])))
        .updatable(|entity| Ok(pick(entity, &["name", "topic", "position"])))
        .resolver(
            "messages",
            FetchCollection {
                route: "channels/:id/messages",
                kind: EntityKind::Message,
                inject: CHILD_OF_CHANNEL,
            },
        )
        .embed(Embedded {
            name: "messages",
            field: "messages",
            kind: EntityKind::Message,
            inject: CHILD_OF_CHANNEL,
            keep_raw: false,
        })
        .build()
}

impl Entity {
    /// Posts a message to this channel and returns it as the server stored
    /// it. The mirror picks the message up from the matching event.
    pub async fn send_message(
        &self,
        content: impl Into<String>,
        remote: &dyn RemoteDataSource,
    ) -> Result<Entity> {
        self.ensure_kind(EntityKind::Channel, "send_message")?;
        let mut fields = Map::new();
        fields.insert("content".to_string(), JsonValue::String(content.into()));
        if let Some(key) = self.key() {
            fields.insert("channel_id".to_string(), key.to_json());
        }

        let mut message = Entity::partial(EntityKind::Message, fields);
        message.create(remote).await?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EntityKey;
    use crate::remote::{InMemoryRemote, RequestMethod};
    use serde_json::json;

    #[test]
    fn stream_payload_materializes_messages() {
        let channel = Entity::decode(
            EntityKind::Channel,
            &json!({"id": 3, "name": "general", "messages": [{"id": 30, "content": "hi"}]}),
        )
        .unwrap();

        let messages = channel.relation("messages").unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages.at(0).unwrap().raw("channel_id"), Some(&json!(3)));
        assert!(channel.raw("messages").is_none());
    }

    #[tokio::test]
    async fn send_message_posts_to_channel_route() {
        let remote = InMemoryRemote::new();
        remote
            .respond(
                RequestMethod::Create,
                "channels/3/messages",
                json!({"id": 31, "channel_id": 3, "content": "hello"}),
            )
            .await;
        let channel = Entity::decode(EntityKind::Channel, &json!({"id": 3})).unwrap();

        let message = channel.send_message("hello", &remote).await.unwrap();
        assert_eq!(message.key(), Some(EntityKey::from(31u64)));
        assert_eq!(
            remote.requests().await[0].body,
            Some(json!({"content": "hello", "tts": false}))
        );
    }
}
