use crate::core::MirrorError;
use std::fmt;
use std::str::FromStr;

/// Every gateway event the mirror reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    GuildRoleCreate,
    GuildRoleUpdate,
    GuildRoleDelete,
    GuildMemberAdd,
    GuildMemberUpdate,
    GuildMemberRemove,
    GuildBanAdd,
    GuildBanRemove,
    MessageCreate,
    MessageUpdate,
    MessageDelete,
}

const WIRE_NAMES: [(EventKind, &str); 17] = [
    (EventKind::GuildCreate, "GUILD_CREATE"),
    (EventKind::GuildUpdate, "GUILD_UPDATE"),
    (EventKind::GuildDelete, "GUILD_DELETE"),
    (EventKind::ChannelCreate, "CHANNEL_CREATE"),
    (EventKind::ChannelUpdate, "CHANNEL_UPDATE"),
    (EventKind::ChannelDelete, "CHANNEL_DELETE"),
    (EventKind::GuildRoleCreate, "GUILD_ROLE_CREATE"),
    (EventKind::GuildRoleUpdate, "GUILD_ROLE_UPDATE"),
    (EventKind::GuildRoleDelete, "GUILD_ROLE_DELETE"),
    (EventKind::GuildMemberAdd, "GUILD_MEMBER_ADD"),
    (EventKind::GuildMemberUpdate, "GUILD_MEMBER_UPDATE"),
    (EventKind::GuildMemberRemove, "GUILD_MEMBER_REMOVE"),
    (EventKind::GuildBanAdd, "GUILD_BAN_ADD"),
    (EventKind::GuildBanRemove, "GUILD_BAN_REMOVE"),
    (EventKind::MessageCreate, "MESSAGE_CREATE"),
    (EventKind::MessageUpdate, "MESSAGE_UPDATE"),
    (EventKind::MessageDelete, "MESSAGE_DELETE"),
];

impl EventKind {
    pub fn all() -> impl Iterator<Item = EventKind> {
        WIRE_NAMES.iter().map(|(kind, _)| *kind)
    }

    /// Gateway spelling, e.g. `GUILD_MEMBER_ADD`.
    pub fn wire_name(&self) -> &'static str {
        WIRE_NAMES
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, name)| *name)
            .unwrap_or_default()
    }
}

/// Case- and underscore-insensitive form: `GUILD_CREATE` and `GuildCreate`
/// both become `GUILDCREATE`.
fn fold(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

impl FromStr for EventKind {
    type Err = MirrorError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let folded = fold(name);
        WIRE_NAMES
            .iter()
            .find(|(_, wire)| fold(wire) == folded)
            .map(|(kind, _)| *kind)
            .ok_or_else(|| MirrorError::UnknownEvent(name.to_string()))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}
