//! Gateway events and their reconciliation into `RootState`
//!
//! Each handler owns one family of events (guilds, roles, channels,
//! messages, members, bans). Handlers are pure: they read the current
//! snapshot and return the next one, so a failing event leaves nothing
//! half-applied.

mod channel;
mod guild;
mod handler;
mod kind;
mod member;
mod payload;

pub use channel::{ChannelHandler, MessageHandler};
pub use guild::{GuildHandler, RoleHandler};
pub use handler::{EventHandler, EventRouter};
pub use kind::EventKind;
pub use member::{BanHandler, MemberHandler};
