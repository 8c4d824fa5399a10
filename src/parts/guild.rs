//! Guilds: the root of every mirrored relation.

use super::ASSET_BASE;
use crate::core::{EntityKey, EntityKind, MirrorError, Result};
use crate::entity::resolver::{Derived, FetchCollection, FetchEntity, Inject, RawCollection};
use crate::entity::route::render;
use crate::entity::{Attribute, Embedded, Entity, EntitySchema, ResourceRoutes, pick};
use crate::remote::{Params, RemoteDataSource};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

pub const REGION_US_WEST: &str = "us-west";
pub const REGION_US_EAST: &str = "us-east";
pub const REGION_SINGAPORE: &str = "singapore";
pub const REGION_LONDON: &str = "london";
pub const REGION_SYDNEY: &str = "sydney";
pub const REGION_AMSTERDAM: &str = "amsterdam";
pub const REGION_DEFAULT: &str = REGION_US_WEST;

pub const REGIONS: [&str; 6] = [
    REGION_US_WEST,
    REGION_US_EAST,
    REGION_LONDON,
    REGION_SINGAPORE,
    REGION_SYDNEY,
    REGION_AMSTERDAM,
];

const FILLABLE: &[&str] = &[
    "id",
    "name",
    "icon",
    "region",
    "owner_id",
    "roles",
    "joined_at",
    "afk_channel_id",
    "afk_timeout",
    "embed_enabled",
    "embed_channel_id",
    "features",
    "splash",
    "emojis",
    "large",
    "verification_level",
];

const CHILD_OF_GUILD: Inject = &[("guild_id", "id")];

pub(crate) fn schema() -> Arc<EntitySchema> {
    EntitySchema::builder(EntityKind::Guild)
        .fillable(FILLABLE)
        .routes(
            ResourceRoutes::none()
                .get("guilds/:id")
                .create("guilds")
                .update("guilds/:id")
                .delete("guilds/:id"),
        )
        .creatable(creatable)
        .updatable(updatable)
        .resolver(
            "channels",
            FetchCollection {
                route: "guilds/:id/channels",
                kind: EntityKind::Channel,
                inject: CHILD_OF_GUILD,
            },
        )
        .resolver(
            "members",
            FetchCollection {
                route: "guilds/:id/members",
                kind: EntityKind::Member,
                inject: CHILD_OF_GUILD,
            },
        )
        .resolver(
            "bans",
            FetchCollection {
                route: "guilds/:id/bans",
                kind: EntityKind::Ban,
                inject: CHILD_OF_GUILD,
            },
        )
        .resolver(
            "roles",
            RawCollection {
                field: "roles",
                kind: EntityKind::Role,
                inject: CHILD_OF_GUILD,
            },
        )
        .resolver(
            "owner",
            FetchEntity {
                route: "users/:owner_id",
                kind: EntityKind::User,
            },
        )
        .resolver("icon", Derived(icon_url))
        .resolver("icon_hash", Derived(icon_hash))
        .resolver("splash", Derived(splash_url))
        .resolver("splash_hash", Derived(splash_hash))
        .embed(Embedded {
            name: "channels",
            field: "channels",
            kind: EntityKind::Channel,
            inject: CHILD_OF_GUILD,
            keep_raw: false,
        })
        .embed(Embedded {
            name: "members",
            field: "members",
            kind: EntityKind::Member,
            inject: CHILD_OF_GUILD,
            keep_raw: false,
        })
        .embed(Embedded {
            name: "roles",
            field: "roles",
            kind: EntityKind::Role,
            inject: CHILD_OF_GUILD,
            keep_raw: true,
        })
        .embed(Embedded {
            name: "bans",
            field: "bans",
            kind: EntityKind::Ban,
            inject: CHILD_OF_GUILD,
            keep_raw: false,
        })
        .build()
}

fn asset_url(entity: &Entity, field: &str, folder: &str) -> Result<Attribute> {
    let (Some(hash), Some(id)) = (entity.raw_str(field), entity.key()) else {
        return Ok(Attribute::Value(JsonValue::Null));
    };
    Ok(Attribute::Value(JsonValue::String(format!(
        "{}/guilds/{}/{}/{}.jpg",
        ASSET_BASE, id, folder, hash
    ))))
}

fn icon_url(entity: &Entity) -> Result<Attribute> {
    asset_url(entity, "icon", "icons")
}

fn icon_hash(entity: &Entity) -> Result<Attribute> {
    Ok(entity.raw("icon").cloned().into())
}

fn splash_url(entity: &Entity) -> Result<Attribute> {
    asset_url(entity, "splash", "splashes")
}

fn splash_hash(entity: &Entity) -> Result<Attribute> {
    Ok(entity.raw("splash").cloned().into())
}

fn creatable(entity: &Entity) -> Result<JsonValue> {
    Ok(json!({
        "name": entity.raw("name").cloned().unwrap_or(JsonValue::Null),
        "region": entity.validate_region(),
    }))
}

fn updatable(entity: &Entity) -> Result<JsonValue> {
    Ok(pick(
        entity,
        &[
            "name",
            "region",
            "logo",
            "splash",
            "verification_level",
            "afk_channel_id",
            "afk_timeout",
        ],
    ))
}

impl Entity {
    /// Region of a guild, falling back to the default when the stored
    /// value is not a known region.
    pub fn validate_region(&self) -> &str {
        match self.raw_str("region") {
            Some(region) if REGIONS.contains(&region) => region,
            _ => REGION_DEFAULT,
        }
    }

    /// Leaves the guild. Same remote call as `delete`.
    pub async fn leave(&self, remote: &dyn RemoteDataSource) -> Result<()> {
        self.ensure_kind(EntityKind::Guild, "leave")?;
        self.delete(remote).await
    }

    /// Hands the guild over to another member. Fails with `RequestFailed`
    /// when the server answers without the new owner in place. The response
    /// is merged, so fields it omits are kept.
    pub async fn transfer_ownership(
        &mut self,
        member: impl Into<EntityKey>,
        remote: &dyn RemoteDataSource,
    ) -> Result<()> {
        self.ensure_kind(EntityKind::Guild, "transfer_ownership")?;
        let member = member.into();
        let path = render("guilds/:id", self)?;
        let body = json!({ "owner_id": member.to_json() });

        let response = remote.update(&path, &Params::new(), Some(&body)).await?;
        let transferred = response
            .get("owner_id")
            .is_some_and(|owner| member.matches(owner));
        if !transferred {
            return Err(MirrorError::request_failed(
                path,
                "ownership was not transferred",
            ));
        }
        self.merge(response)
    }
}
