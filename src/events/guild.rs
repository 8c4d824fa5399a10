use super::handler::{EventHandler, remove_at, replace_at, upsert_at};
use super::{EventKind, payload};
use crate::core::{EntityKind, Result};
use crate::engine::MirrorConfig;
use crate::entity::Entity;
use crate::state::{CollectionPath, RootState};
use serde_json::Value as JsonValue;

/// `GUILD_CREATE`, `GUILD_UPDATE`, `GUILD_DELETE`.
pub struct GuildHandler;

impl EventHandler for GuildHandler {
    fn name(&self) -> &'static str {
        "guild"
    }

    fn can_handle(&self, event: EventKind) -> bool {
        matches!(
            event,
            EventKind::GuildCreate | EventKind::GuildUpdate | EventKind::GuildDelete
        )
    }

    fn reconcile(
        &self,
        event: EventKind,
        payload: &JsonValue,
        state: &RootState,
        config: &MirrorConfig,
    ) -> Result<Option<RootState>> {
        let root = CollectionPath::root();
        match event {
            EventKind::GuildCreate => {
                let guild = Entity::decode(EntityKind::Guild, payload)?;
                upsert_at(state, &root, guild, config.order_policy)
            }
            EventKind::GuildUpdate => {
                let guild = Entity::decode(EntityKind::Guild, payload)?;
                replace_at(state, &root, guild, config.order_policy)
            }
            EventKind::GuildDelete => {
                let key = payload::key_at(event, payload, "id")?;
                remove_at(state, &root, &key, config.order_policy)
            }
            _ => Ok(None),
        }
    }
}

/// `GUILD_ROLE_CREATE`, `GUILD_ROLE_UPDATE`, `GUILD_ROLE_DELETE`.
///
/// Create and update accept `{guild_id, role: {..}}` as well as a flat role
/// object carrying `guild_id`. Delete carries `{guild_id, role_id}`.
pub struct RoleHandler;

impl EventHandler for RoleHandler {
    fn name(&self) -> &'static str {
        "role"
    }

    fn can_handle(&self, event: EventKind) -> bool {
        matches!(
            event,
            EventKind::GuildRoleCreate | EventKind::GuildRoleUpdate | EventKind::GuildRoleDelete
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
        let path = CollectionPath::guild_relation(guild, "roles");
        match event {
            EventKind::GuildRoleCreate | EventKind::GuildRoleUpdate => {
                let role = payload::nested_with_guild(event, payload, "role")?;
                let role = Entity::decode(EntityKind::Role, &role)?;
                if event == EventKind::GuildRoleCreate {
                    upsert_at(state, &path, role, config.order_policy)
                } else {
                    replace_at(state, &path, role, config.order_policy)
                }
            }
            EventKind::GuildRoleDelete => {
                let key = payload::key_at(event, payload, "role_id")?;
                remove_at(state, &path, &key, config.order_policy)
            }
            _ => Ok(None),
        }
    }
}
