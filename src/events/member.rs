use super::handler::{EventHandler, remove_at, replace_at, upsert_at};
use super::{EventKind, payload};
use crate::core::{EntityKind, Result};
use crate::engine::MirrorConfig;
use crate::entity::Entity;
use crate::state::{CollectionPath, RootState};
use serde_json::Value as JsonValue;

/// `GUILD_MEMBER_ADD`, `GUILD_MEMBER_UPDATE`, `GUILD_MEMBER_REMOVE`.
///
/// Members are keyed by `user.id`.
pub struct MemberHandler;

impl EventHandler for MemberHandler {
    fn name(&self) -> &'static str {
        "member"
    }

    fn can_handle(&self, event: EventKind) -> bool {
        matches!(
            event,
            EventKind::GuildMemberAdd | EventKind::GuildMemberUpdate | EventKind::GuildMemberRemove
        )
    }

    fn reconcile(
        &self,
        event: EventKind,
        payload: &JsonValue,
        state: &RootState,
        config: &MirrorConfig,
    ) -> Result<Option<RootState>> {
        let guild = payload::key_at(event, payload, "guild_id")?;
        let path = CollectionPath::guild_relation(guild, "members");
        match event {
            EventKind::GuildMemberAdd => {
                let member = Entity::decode(EntityKind::Member, payload)?;
                upsert_at(state, &path, member, config.order_policy)
            }
            EventKind::GuildMemberUpdate => {
                let member = Entity::decode(EntityKind::Member, payload)?;
                replace_at(state, &path, member, config.order_policy)
            }
            EventKind::GuildMemberRemove => {
                let key = payload::key_at(event, payload, "user.id")?;
                remove_at(state, &path, &key, config.order_policy)
            }
            _ => Ok(None),
        }
    }
}

/// `GUILD_BAN_ADD`, `GUILD_BAN_REMOVE`. Both carry `{guild_id, user}`.
pub struct BanHandler;

impl EventHandler for BanHandler {
    fn name(&self) -> &'static str {
        "ban"
    }

    fn can_handle(&self, event: EventKind) -> bool {
        matches!(event, EventKind::GuildBanAdd | EventKind::GuildBanRemove)
    }

    fn reconcile(
        &self,
        event: EventKind,
        payload: &JsonValue,
        state: &RootState,
        config: &MirrorConfig,
    ) -> Result<Option<RootState>> {
        let guild = payload::key_at(event, payload, "guild_id")?;
        let path = CollectionPath::guild_relation(guild, "bans");
        match event {
            EventKind::GuildBanAdd => {
                let ban = Entity::decode(EntityKind::Ban, payload)?;
                upsert_at(state, &path, ban, config.order_policy)
            }
            EventKind::GuildBanRemove => {
                let key = payload::key_at(event, payload, "user.id")?;
                remove_at(state, &path, &key, config.order_policy)
            }
            _ => Ok(None),
        }
    }
}
