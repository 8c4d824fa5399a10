use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of remote object kinds the mirror knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Guild,
    Channel,
    Member,
    Role,
    Ban,
    Message,
    User,
    Client,
    Invite,
}

impl EntityKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Guild => "Guild",
            Self::Channel => "Channel",
            Self::Member => "Member",
            Self::Role => "Role",
            Self::Ban => "Ban",
            Self::Message => "Message",
            Self::User => "User",
            Self::Client => "Client",
            Self::Invite => "Invite",
        }
    }

    pub fn all() -> [EntityKind; 9] {
        [
            Self::Guild,
            Self::Channel,
            Self::Member,
            Self::Role,
            Self::Ban,
            Self::Message,
            Self::User,
            Self::Client,
            Self::Invite,
        ]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read a dotted path (`user.id`) out of a JSON object.
pub fn lookup_path<'a>(
    object: &'a serde_json::Map<String, serde_json::Value>,
    path: &str,
) -> Option<&'a serde_json::Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = object.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
