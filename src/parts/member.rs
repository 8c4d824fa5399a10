//! Members: the user-to-guild relationship carrying per-guild roles.

use crate::collection::{Collection, OrderPolicy};
use crate::core::{EntityKey, EntityKind, MirrorError, Result};
use crate::entity::resolver::{Derived, EmbeddedEntity, FilteredFetch};
use crate::entity::route::render;
use crate::entity::{Attribute, Entity, EntitySchema, ResourceRoutes, pick};
use crate::remote::{Params, RemoteDataSource};
use serde_json::{Map, Value as JsonValue, json};
use std::sync::Arc;

const FILLABLE: &[&str] = &[
    "user", "roles", "deaf", "mute", "joined_at", "guild_id", "status", "game", "nick",
];

pub(crate) fn schema() -> Arc<EntitySchema> {
    EntitySchema::builder(EntityKind::Member)
        .key("user.id")
        .fillable(FILLABLE)
        .routes(
            ResourceRoutes::none()
                .update("guilds/:guild_id/members/:id")
                .delete("guilds/:guild_id/members/:id"),
        )
        .fill_after_save(false)
        .updatable(|entity| Ok(pick(entity, &["roles"])))
        .resolver("id", Derived(|entity| Ok(entity.raw_path("user.id").cloned().into())))
        .resolver(
            "username",
            Derived(|entity| Ok(entity.raw_path("user.username").cloned().into())),
        )
        .resolver(
            "user",
            EmbeddedEntity {
                field: "user",
                kind: EntityKind::User,
            },
        )
        .resolver(
            "roles",
            FilteredFetch {
                route: "guilds/:guild_id/roles",
                kind: EntityKind::Role,
                ids_field: "roles",
            },
        )
        .build()
}

/// A role given either by id or as a role entity.
#[derive(Debug, Clone)]
pub enum RoleRef {
    Id(EntityKey),
    Role(Entity),
}

impl From<u64> for RoleRef {
    fn from(id: u64) -> Self {
        Self::Id(EntityKey::from(id))
    }
}

impl From<EntityKey> for RoleRef {
    fn from(key: EntityKey) -> Self {
        Self::Id(key)
    }
}

impl From<Entity> for RoleRef {
    fn from(role: Entity) -> Self {
        Self::Role(role)
    }
}

impl RoleRef {
    fn key(&self) -> Option<EntityKey> {
        match self {
            Self::Id(key) => Some(key.clone()),
            Self::Role(role) => role.key(),
        }
    }

    fn into_entity(self) -> Entity {
        match self {
            Self::Role(role) => role,
            Self::Id(key) => {
                let mut fields = Map::new();
                fields.insert("id".to_string(), key.to_json());
                Entity::partial(EntityKind::Role, fields)
            }
        }
    }
}

impl Entity {
    /// Role ids listed in a member's raw `roles` field.
    pub fn role_ids(&self) -> Vec<EntityKey> {
        match self.raw("roles") {
            Some(JsonValue::Array(ids)) => ids.iter().filter_map(EntityKey::from_json).collect(),
            _ => Vec::new(),
        }
    }

    /// Adds a role locally. Call `update` to push the new role list.
    ///
    /// Adding a role the member already has fails with `DuplicateKey` and
    /// changes nothing.
    pub async fn add_role(
        &mut self,
        role: impl Into<RoleRef>,
        remote: &dyn RemoteDataSource,
    ) -> Result<()> {
        self.ensure_kind(EntityKind::Member, "add_role")?;
        let role = role.into();
        let key = role.key().ok_or(MirrorError::MissingKey(EntityKind::Role))?;

        let mut ids = self.role_ids();
        if ids.contains(&key) {
            return Err(MirrorError::DuplicateKey {
                kind: EntityKind::Role,
                key: key.to_string(),
            });
        }

        let mut roles = self
            .get("roles", remote)
            .await?
            .into_collection()
            .unwrap_or_else(|| Collection::new(EntityKind::Role));
        roles.upsert(role.into_entity(), OrderPolicy::Preserve)?;

        ids.push(key);
        self.set_raw("roles", ids_json(&ids));
        self.store_cached("roles", Attribute::Collection(roles));
        Ok(())
    }

    /// Removes a role locally. Returns whether the member had it.
    pub fn remove_role(&mut self, role: impl Into<RoleRef>) -> Result<bool> {
        self.ensure_kind(EntityKind::Member, "remove_role")?;
        let key = role
            .into()
            .key()
            .ok_or(MirrorError::MissingKey(EntityKind::Role))?;

        let mut ids = self.role_ids();
        let before = ids.len();
        ids.retain(|id| *id != key);
        let removed = ids.len() != before;
        self.set_raw("roles", ids_json(&ids));

        if let Some(Attribute::Collection(mut roles)) = self.cached("roles") {
            roles.remove_by_key(&key);
            self.store_cached("roles", Attribute::Collection(roles));
        }
        Ok(removed)
    }

    /// Removes the member from its guild. Same remote call as `delete`.
    pub async fn kick(&self, remote: &dyn RemoteDataSource) -> Result<()> {
        self.ensure_kind(EntityKind::Member, "kick")?;
        self.delete(remote).await
    }

    /// Moves the member to another voice channel. The server gives no
    /// confirmation beyond a successful response.
    pub async fn move_to(
        &self,
        channel: impl Into<EntityKey>,
        remote: &dyn RemoteDataSource,
    ) -> Result<()> {
        self.ensure_kind(EntityKind::Member, "move_to")?;
        let path = render("guilds/:guild_id/members/:id", self)?;
        let body = json!({ "channel_id": channel.into().to_json() });
        remote.update(&path, &Params::new(), Some(&body)).await?;
        Ok(())
    }
}

fn ids_json(ids: &[EntityKey]) -> JsonValue {
    JsonValue::Array(ids.iter().map(EntityKey::to_json).collect())
}
