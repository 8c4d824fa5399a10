// ============================================================================
// guildmirror Library
// ============================================================================

//! Client-side mirror of guild / channel / member / role / message state:
//! entities with lazily computed attributes, keyed ordered collections, and
//! an engine reconciling gateway events into immutable snapshots.
//!
//! ```
//! use guildmirror::{MirrorConfig, ReconciliationEngine};
//! use serde_json::json;
//!
//! let mut engine = ReconciliationEngine::new(MirrorConfig::default()).unwrap();
//! engine.apply_event("GUILD_CREATE", &json!({"id": 1, "name": "home", "channels": []})).unwrap();
//! engine.apply_event("CHANNEL_CREATE", &json!({"id": 10, "guild_id": 1, "name": "general"})).unwrap();
//!
//! let state = engine.current_state();
//! let guild = state.guilds().at(0).unwrap();
//! assert_eq!(guild.relation("channels").unwrap().len(), 1);
//! ```

pub mod collection;
pub mod core;
pub mod engine;
pub mod entity;
pub mod events;
pub mod parts;
pub mod remote;
pub mod state;

// Re-export main types for convenience
pub use collection::{Collection, OrderPolicy};
pub use core::{EntityKey, EntityKind, MirrorError, Result};
pub use engine::{InboundEvent, MirrorConfig, ReconciliationEngine};
pub use entity::{Attribute, Entity, EntitySchema};
pub use events::{EventHandler, EventKind, EventRouter};
pub use parts::RoleRef;
pub use remote::{InMemoryRemote, RemoteDataSource, RequestMethod};
pub use state::{CollectionPath, RootState};
