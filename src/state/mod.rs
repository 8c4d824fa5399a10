//! Immutable mirror snapshots
//!
//! `RootState` is the whole mirrored tree: guilds, and through their
//! relations channels, messages, members, roles and bans. A state is never
//! mutated in place. Every edit goes through [`RootState::edit`], which
//! changes one collection and re-inserts each ancestor on the way back up
//! to the root (bubble-replace), returning a new state.

use crate::collection::{Collection, OrderPolicy};
use crate::core::{EntityKey, EntityKind, MirrorError, Result};
use crate::entity::Entity;

/// Address of one collection in the tree.
///
/// An empty path is the root guild collection. Each step names an entity
/// in the current collection and the relation to descend into.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionPath {
    steps: Vec<(EntityKey, &'static str)>,
}

impl CollectionPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(mut self, key: EntityKey, relation: &'static str) -> Self {
        self.steps.push((key, relation));
        self
    }

    /// `guilds[guild].<relation>`
    pub fn guild_relation(guild: EntityKey, relation: &'static str) -> Self {
        Self::root().child(guild, relation)
    }

    /// `guilds[guild].channels[channel].messages`
    pub fn channel_messages(guild: EntityKey, channel: EntityKey) -> Self {
        Self::root()
            .child(guild, "channels")
            .child(channel, "messages")
    }

    pub fn depth(&self) -> usize {
        self.steps.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RootState {
    guilds: Collection,
}

impl Default for RootState {
    fn default() -> Self {
        Self::new()
    }
}

impl RootState {
    pub fn new() -> Self {
        Self {
            guilds: Collection::new(EntityKind::Guild),
        }
    }

    pub fn guilds(&self) -> &Collection {
        &self.guilds
    }

    pub fn guild(&self, key: &EntityKey) -> Option<&Entity> {
        self.guilds.get(key)
    }

    /// Copy-on-write: a new state holding `guilds`.
    pub fn with_guilds(&self, guilds: Collection) -> Result<Self> {
        if guilds.kind() != EntityKind::Guild {
            return Err(MirrorError::ValidationError(format!(
                "Root collection must hold guilds, got {}",
                guilds.kind()
            )));
        }
        Ok(Self { guilds })
    }

    /// The collection at `path`, if every step exists.
    pub fn collection_at(&self, path: &CollectionPath) -> Option<Collection> {
        let mut current = self.guilds.clone();
        for (key, relation) in &path.steps {
            current = current.get(key)?.relation(relation)?;
        }
        Some(current)
    }

    /// First guild whose channel list holds `channel`.
    pub fn locate_channel(&self, channel: &EntityKey) -> Option<(EntityKey, Entity)> {
        self.guilds.iter().find_map(|guild| {
            let found = guild.relation("channels")?.get(channel)?.clone();
            Some((guild.key()?, found))
        })
    }

    /// Applies `edit` to the collection at `path` and bubbles the result up
    /// to the root.
    ///
    /// `edit` returns whether it changed anything. `Ok(None)` means no new
    /// state: either a step of the path does not exist or the edit was a
    /// no-op. Ancestors are re-inserted into their parents under `policy`.
    pub fn edit<F>(&self, path: &CollectionPath, policy: OrderPolicy, edit: F) -> Result<Option<Self>>
    where
        F: FnOnce(&mut Collection) -> Result<bool>,
    {
        let guilds = edit_at(&self.guilds, &path.steps, policy, edit)?;
        Ok(guilds.map(|guilds| Self { guilds }))
    }

    /// Snapshot as nested JSON, relations included where materialized.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.guilds.iter().map(tree_json).collect())
    }
}

fn edit_at<F>(
    collection: &Collection,
    steps: &[(EntityKey, &'static str)],
    policy: OrderPolicy,
    edit: F,
) -> Result<Option<Collection>>
where
    F: FnOnce(&mut Collection) -> Result<bool>,
{
    let Some(((key, relation), rest)) = steps.split_first() else {
        let mut next = collection.clone();
        return Ok(edit(&mut next)?.then_some(next));
    };

    let Some(parent) = collection.get(key) else {
        return Ok(None);
    };
    let Some(children) = parent.relation(relation) else {
        return Err(MirrorError::ValidationError(format!(
            "{} has no relation '{}'",
            parent.kind(),
            relation
        )));
    };
    let Some(children) = edit_at(&children, rest, policy, edit)? else {
        return Ok(None);
    };

    let mut next = collection.clone();
    next.replace(parent.with_relation(relation, children), policy)?;
    Ok(Some(next))
}

fn tree_json(entity: &Entity) -> serde_json::Value {
    let mut object = entity.attributes().clone();
    for relation in entity.schema().embedded() {
        if !entity.has_materialized(relation.name) {
            continue;
        }
        if let Some(children) = entity.relation(relation.name) {
            let items = children.iter().map(tree_json).collect();
            object.insert(relation.field.to_string(), serde_json::Value::Array(items));
        }
    }
    serde_json::Value::Object(object)
}
