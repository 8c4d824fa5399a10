use super::handler::{EventHandler, remove_at, replace_at, upsert_at};
use super::{EventKind, payload};
use crate::core::{EntityKey, EntityKind, Result};
use crate::engine::MirrorConfig;
use crate::entity::Entity;
use crate::state::{CollectionPath, RootState};
use log::trace;
use serde_json::Value as JsonValue;

/// `CHANNEL_CREATE`, `CHANNEL_UPDATE`, `CHANNEL_DELETE`.
///
/// Channels without a `guild_id` (private channels) have no place in the
/// guild tree and are ignored.
pub struct ChannelHandler;

impl EventHandler for ChannelHandler {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn can_handle(&self, event: EventKind) -> bool {
        matches!(
            event,
            EventKind::ChannelCreate | EventKind::ChannelUpdate | EventKind::ChannelDelete
        )
    }

    fn reconcile(
        &self,
        event: EventKind,
        payload: &JsonValue,
        state: &RootState,
        config: &MirrorConfig,
    ) -> Result<Option<RootState>> {
        let policy = config.order_policy;
        match event {
            EventKind::ChannelCreate | EventKind::ChannelUpdate => {
                let channel = Entity::decode(EntityKind::Channel, payload)?;
                let Some(guild) = payload::optional_key(event, payload, "guild_id")? else {
                    trace!("{} without guild_id ignored", event);
                    return Ok(None);
                };
                let path = CollectionPath::guild_relation(guild, "channels");
                if event == EventKind::ChannelCreate {
                    upsert_at(state, &path, channel, policy)
                } else {
                    replace_at(state, &path, channel, policy)
                }
            }
            EventKind::ChannelDelete => {
                let key = payload::key_at(event, payload, "id")?;
                let guild = match payload::optional_key(event, payload, "guild_id")? {
                    Some(guild) => guild,
                    None => match state.locate_channel(&key) {
                        Some((guild, _)) => guild,
                        None => return Ok(None),
                    },
                };
                let path = CollectionPath::guild_relation(guild, "channels");
                remove_at(state, &path, &key, policy)
            }
            _ => Ok(None),
        }
    }
}

/// `MESSAGE_CREATE`, `MESSAGE_UPDATE`, `MESSAGE_DELETE`.
///
/// Messages are found through their channel, whichever guild holds it.
/// After a create the channel keeps at most
/// `MirrorConfig::message_cache_limit` messages, dropping the oldest.
pub struct MessageHandler;

impl MessageHandler {
    fn messages_path(state: &RootState, channel: &EntityKey) -> Option<CollectionPath> {
        let (guild, _) = state.locate_channel(channel)?;
        Some(CollectionPath::channel_messages(guild, channel.clone()))
    }
}

impl EventHandler for MessageHandler {
    fn name(&self) -> &'static str {
        "message"
    }

    fn can_handle(&self, event: EventKind) -> bool {
        matches!(
            event,
            EventKind::MessageCreate | EventKind::MessageUpdate | EventKind::MessageDelete
        )
    }

    fn reconcile(
        &self,
        event: EventKind,
        payload: &JsonValue,
        state: &RootState,
        config: &MirrorConfig,
    ) -> Result<Option<RootState>> {
        let policy = config.order_policy;
        let channel = payload::key_at(event, payload, "channel_id")?;
        match event {
            EventKind::MessageCreate => {
                let message = Entity::decode(EntityKind::Message, payload)?;
                let Some(path) = Self::messages_path(state, &channel) else {
                    return Ok(None);
                };
                let limit = config.message_cache_limit;
                state.edit(&path, policy, move |messages| {
                    messages.upsert(message, policy)?;
                    if let Some(limit) = limit {
                        messages.truncate_front(limit);
                    }
                    Ok(true)
                })
            }
            EventKind::MessageUpdate => {
                let message = Entity::decode(EntityKind::Message, payload)?;
                let Some(path) = Self::messages_path(state, &channel) else {
                    return Ok(None);
                };
                replace_at(state, &path, message, policy)
            }
            EventKind::MessageDelete => {
                let key = payload::key_at(event, payload, "id")?;
                let Some(path) = Self::messages_path(state, &channel) else {
                    return Ok(None);
                };
                remove_at(state, &path, &key, policy)
            }
            _ => Ok(None),
        }
    }
}
