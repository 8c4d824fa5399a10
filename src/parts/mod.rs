//! Schema descriptors for every entity kind, plus kind-specific
//! operations layered on `Entity`.

pub mod ban;
pub mod channel;
pub mod client;
pub mod guild;
pub mod invite;
pub mod member;
pub mod message;
pub mod role;
pub mod user;

pub use member::RoleRef;

use crate::core::EntityKind;
use crate::entity::EntitySchema;
use std::sync::Arc;

/// Base URL for derived asset links (icons, splashes, avatars).
pub const ASSET_BASE: &str = "https://discordapp.com/api";

lazy_static::lazy_static! {
    static ref GUILD: Arc<EntitySchema> = guild::schema();
    static ref CHANNEL: Arc<EntitySchema> = channel::schema();
    static ref MEMBER: Arc<EntitySchema> = member::schema();
    static ref ROLE: Arc<EntitySchema> = role::schema();
    static ref BAN: Arc<EntitySchema> = ban::schema();
    static ref MESSAGE: Arc<EntitySchema> = message::schema();
    static ref USER: Arc<EntitySchema> = user::schema();
    static ref CLIENT: Arc<EntitySchema> = client::schema();
    static ref INVITE: Arc<EntitySchema> = invite::schema();
}

/// Shared schema of `kind`.
pub fn schema_for(kind: EntityKind) -> Arc<EntitySchema> {
    let schema = match kind {
        EntityKind::Guild => &*GUILD,
        EntityKind::Channel => &*CHANNEL,
        EntityKind::Member => &*MEMBER,
        EntityKind::Role => &*ROLE,
        EntityKind::Ban => &*BAN,
        EntityKind::Message => &*MESSAGE,
        EntityKind::User => &*USER,
        EntityKind::Client => &*CLIENT,
        EntityKind::Invite => &*INVITE,
    };
    Arc::clone(schema)
}
