use super::{EventKind, channel, guild, member};
use crate::collection::OrderPolicy;
use crate::core::{EntityKey, MirrorError, Result};
use crate::engine::MirrorConfig;
use crate::entity::Entity;
use crate::state::{CollectionPath, RootState};
use serde_json::Value as JsonValue;

/// Reconciles one family of events into the mirror.
///
/// `reconcile` never mutates `state`. It returns the next state, or
/// `None` when the event changes nothing (unknown parent, unknown key).
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_handle(&self, event: EventKind) -> bool;

    fn reconcile(
        &self,
        event: EventKind,
        payload: &JsonValue,
        state: &RootState,
        config: &MirrorConfig,
    ) -> Result<Option<RootState>>;
}

/// Dispatches each event to the first registered handler accepting it.
pub struct EventRouter {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn register(&mut self, handler: Box<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Router covering every `EventKind`.
    pub fn with_default_handlers() -> Self {
        let mut router = Self::new();
        router.register(Box::new(guild::GuildHandler));
        router.register(Box::new(guild::RoleHandler));
        router.register(Box::new(channel::ChannelHandler));
        router.register(Box::new(channel::MessageHandler));
        router.register(Box::new(member::MemberHandler));
        router.register(Box::new(member::BanHandler));
        router
    }

    pub fn dispatch(
        &self,
        event: EventKind,
        payload: &JsonValue,
        state: &RootState,
        config: &MirrorConfig,
    ) -> Result<Option<RootState>> {
        let handler = self
            .handlers
            .iter()
            .find(|handler| handler.can_handle(event))
            .ok_or_else(|| MirrorError::UnknownEvent(event.to_string()))?;
        handler.reconcile(event, payload, state, config)
    }

    pub fn list_handlers(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|handler| handler.name()).collect()
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::with_default_handlers()
    }
}

/// Inserts `entity` into the collection at `path`, replacing an entity
/// with the same key. Relations the replaced entity had materialized carry
/// over when the payload lacks them.
pub(crate) fn upsert_at(
    state: &RootState,
    path: &CollectionPath,
    mut entity: Entity,
    policy: OrderPolicy,
) -> Result<Option<RootState>> {
    state.edit(path, policy, move |collection| {
        if let Some(previous) = entity.key().and_then(|key| collection.get(&key)) {
            entity.inherit_relations(previous);
        }
        collection.upsert(entity, policy)?;
        Ok(true)
    })
}

/// Replaces the entity sharing `entity`'s key. Absent key: no change.
pub(crate) fn replace_at(
    state: &RootState,
    path: &CollectionPath,
    mut entity: Entity,
    policy: OrderPolicy,
) -> Result<Option<RootState>> {
    state.edit(path, policy, move |collection| {
        let Some(previous) = entity.key().and_then(|key| collection.get(&key)) else {
            return Ok(false);
        };
        entity.inherit_relations(previous);
        collection.replace(entity, policy)
    })
}

pub(crate) fn remove_at(
    state: &RootState,
    path: &CollectionPath,
    key: &EntityKey,
    policy: OrderPolicy,
) -> Result<Option<RootState>> {
    state.edit(path, policy, |collection| {
        Ok(collection.remove_by_key(key).is_some())
    })
}
