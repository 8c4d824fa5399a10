use async_trait::async_trait;
use guildmirror::entity::resolver::{AttributeResolver, Derived, FetchEntity};
use guildmirror::remote::Params;
use guildmirror::{
    Attribute, Entity, EntityKey, EntityKind, EntitySchema, InMemoryRemote, MirrorError,
    RemoteDataSource, RequestMethod, Result,
};
use serde_json::{Map, Value as JsonValue, json};

fn guild_with_roles() -> Entity {
    Entity::decode(
        EntityKind::Guild,
        &json!({
            "id": 1,
            "name": "home",
            "roles": [{"id": 5, "name": "everyone", "permissions": 0}],
        }),
    )
    .unwrap()
}

/// Resolves its own attribute again, which can never finish.
struct SelfReferential;

#[async_trait]
impl AttributeResolver for SelfReferential {
    fn describe(&self) -> &'static str {
        "self-referential"
    }

    async fn resolve(&self, entity: &Entity, remote: &dyn RemoteDataSource) -> Result<Attribute> {
        entity.get("loop", remote).await
    }
}

/// Reads another computed attribute and decorates it.
struct Shouting;

#[async_trait]
impl AttributeResolver for Shouting {
    fn describe(&self) -> &'static str {
        "shouting"
    }

    async fn resolve(&self, entity: &Entity, remote: &dyn RemoteDataSource) -> Result<Attribute> {
        let name = entity.get("display", remote).await?;
        let loud = name.as_str().unwrap_or_default().to_uppercase();
        Ok(Attribute::Value(json!(loud)))
    }
}

fn custom_entity() -> Entity {
    let schema = EntitySchema::builder(EntityKind::User)
        .fillable(&["id", "username"])
        .resolver("loop", SelfReferential)
        .resolver("shout", Shouting)
        .resolver(
            "display",
            Derived(|entity| Ok(entity.raw("username").cloned().into())),
        )
        .build();
    let mut fields = Map::new();
    fields.insert("id".to_string(), json!(3));
    fields.insert("username".to_string(), json!("quiet"));
    Entity::with_schema(schema, fields)
}

/// Hands control back to the scheduler before every fetch, like a real
/// network round trip.
struct YieldingRemote(InMemoryRemote);

#[async_trait]
impl RemoteDataSource for YieldingRemote {
    async fn fetch(&self, path: &str, params: &Params) -> Result<JsonValue> {
        tokio::task::yield_now().await;
        self.0.fetch(path, params).await
    }

    async fn create(&self, path: &str, params: &Params, body: Option<&JsonValue>)
    -> Result<JsonValue> {
        self.0.create(path, params, body).await
    }

    async fn update(&self, path: &str, params: &Params, body: Option<&JsonValue>)
    -> Result<JsonValue> {
        self.0.update(path, params, body).await
    }

    async fn delete(&self, path: &str, params: &Params, body: Option<&JsonValue>)
    -> Result<JsonValue> {
        self.0.delete(path, params, body).await
    }
}

/// Username of the fetched owner.
struct OwnerName;

#[async_trait]
impl AttributeResolver for OwnerName {
    fn describe(&self) -> &'static str {
        "owner-name"
    }

    async fn resolve(&self, entity: &Entity, remote: &dyn RemoteDataSource) -> Result<Attribute> {
        let owner = entity.get("owner", remote).await?;
        let name = owner.as_entity().and_then(|owner| owner.raw("username")).cloned();
        Ok(name.into())
    }
}

async fn owned_guild() -> (Entity, YieldingRemote) {
    let remote = InMemoryRemote::new();
    remote
        .respond(RequestMethod::Fetch, "users/42", json!({"id": 42, "username": "boss"}))
        .await;
    let schema = EntitySchema::builder(EntityKind::Guild)
        .fillable(&["id", "owner_id"])
        .resolver(
            "owner",
            FetchEntity {
                route: "users/:owner_id",
                kind: EntityKind::User,
            },
        )
        .resolver("owner_name", OwnerName)
        .build();
    let mut fields = Map::new();
    fields.insert("id".to_string(), json!(1));
    fields.insert("owner_id".to_string(), json!(42));
    (Entity::with_schema(schema, fields), YieldingRemote(remote))
}

#[tokio::test]
async fn test_resolve_all_with_dependent_attribute_in_flight() {
    let (guild, remote) = owned_guild().await;

    let values = guild.resolve_all(&["owner", "owner_name"], &remote).await.unwrap();

    let owner = values[0].as_entity().unwrap();
    assert_eq!(owner.raw_str("username"), Some("boss"));
    assert_eq!(values[1].as_str(), Some("boss"));
    assert!(guild.is_cached("owner"));
    assert!(guild.is_cached("owner_name"));
}

#[tokio::test]
async fn test_concurrent_gets_of_one_attribute_both_succeed() {
    let (guild, remote) = owned_guild().await;

    let (first, second) = tokio::join!(guild.get("owner", &remote), guild.get("owner", &remote));

    assert_eq!(first.unwrap(), second.unwrap());
    assert!(guild.is_cached("owner"));
}

#[tokio::test]
async fn test_set_invalidates_same_named_relation() {
    let remote = InMemoryRemote::new();
    let mut guild = guild_with_roles();

    let roles = guild.get("roles", &remote).await.unwrap().into_collection().unwrap();
    assert_eq!(roles.len(), 1);

    guild
        .set(
            "roles",
            json!([{"id": 5, "name": "everyone"}, {"id": 6, "name": "mods"}]),
        )
        .unwrap();
    let roles = guild.get("roles", &remote).await.unwrap().into_collection().unwrap();
    assert_eq!(roles.len(), 2);
    assert_eq!(roles.get(&EntityKey::from(6u64)).unwrap().raw("guild_id"), Some(&json!(1)));
    assert!(remote.requests().await.is_empty());
}

#[tokio::test]
async fn test_set_leaves_other_cached_attributes_alone() {
    let remote = InMemoryRemote::new();
    let mut guild = guild_with_roles();
    guild.get("roles", &remote).await.unwrap();

    guild.set("name", "renamed").unwrap();
    assert!(guild.is_cached("roles"));
    assert!(!guild.invalidate("name"));

    guild.invalidate_all();
    assert!(!guild.is_cached("roles"));
}

#[tokio::test]
async fn test_add_role_twice_keeps_one_role() {
    let remote = InMemoryRemote::new();
    remote
        .respond(
            RequestMethod::Fetch,
            "guilds/1/roles",
            json!([{"id": 5, "name": "everyone"}, {"id": 6, "name": "mods"}]),
        )
        .await;
    let mut member = Entity::decode(
        EntityKind::Member,
        &json!({"guild_id": 1, "user": {"id": 100}, "roles": [5]}),
    )
    .unwrap();

    member.add_role(6u64, &remote).await.unwrap();
    let err = member.add_role(6u64, &remote).await.unwrap_err();
    assert!(matches!(err, MirrorError::DuplicateKey { .. }));

    let roles = member.get("roles", &remote).await.unwrap().into_collection().unwrap();
    let keys: Vec<_> = roles.keys().cloned().collect();
    assert_eq!(keys, vec![EntityKey::from(5u64), EntityKey::from(6u64)]);
    assert_eq!(remote.request_count(RequestMethod::Fetch, "guilds/1/roles").await, 1);

    member.update(&remote).await.unwrap();
    let sent = remote.requests().await.last().cloned().unwrap();
    assert_eq!(sent.path, "guilds/1/members/100");
    assert_eq!(sent.body, Some(json!({"roles": [5, 6]})));
}

#[tokio::test]
async fn test_add_role_accepts_role_entities() {
    let remote = InMemoryRemote::new();
    let mut member =
        Entity::decode(EntityKind::Member, &json!({"guild_id": 1, "user": {"id": 100}})).unwrap();
    let role = Entity::decode(EntityKind::Role, &json!({"id": 9, "name": "vip"})).unwrap();

    member.add_role(role.clone(), &remote).await.unwrap();
    assert!(matches!(
        member.add_role(role, &remote).await,
        Err(MirrorError::DuplicateKey { .. })
    ));

    let roles = member.get("roles", &remote).await.unwrap().into_collection().unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles.at(0).unwrap().raw_str("name"), Some("vip"));
}

#[tokio::test]
async fn test_resolver_cycle_is_reported() {
    let remote = InMemoryRemote::new();
    let entity = custom_entity();

    let err = entity.get("loop", &remote).await.unwrap_err();
    assert_eq!(err, MirrorError::RecomputationCycle("loop".to_string()));
    // The guard is released: asking again fails the same way instead of
    // hanging or succeeding.
    let again = entity.get("loop", &remote).await.unwrap_err();
    assert_eq!(again, MirrorError::RecomputationCycle("loop".to_string()));
    assert!(!entity.is_cached("loop"));
}

#[tokio::test]
async fn test_resolvers_may_depend_on_other_attributes() {
    let remote = InMemoryRemote::new();
    let entity = custom_entity();

    assert_eq!(entity.get("shout", &remote).await.unwrap().as_str(), Some("QUIET"));
    assert!(entity.is_cached("display"));
    assert!(entity.is_cached("shout"));
}

#[tokio::test]
async fn test_resolve_all_fetches_concurrently_and_memoizes() {
    let remote = InMemoryRemote::new();
    remote
        .respond(RequestMethod::Fetch, "guilds/1/channels", json!([{"id": 10}]))
        .await;
    remote
        .respond(RequestMethod::Fetch, "guilds/1/members", json!([{"user": {"id": 100}}]))
        .await;
    remote.respond(RequestMethod::Fetch, "guilds/1/bans", json!(null)).await;

    let guild = guild_with_roles();
    let values = guild
        .resolve_all(&["channels", "members", "bans", "channels"], &remote)
        .await
        .unwrap();

    assert_eq!(values.len(), 4);
    assert_eq!(values[0], values[3]);
    assert_eq!(values[1].as_collection().unwrap().len(), 1);
    assert!(values[2].as_collection().unwrap().is_empty());
    assert_eq!(remote.request_count(RequestMethod::Fetch, "guilds/1/channels").await, 1);
}

#[tokio::test]
async fn test_remote_failures_surface_as_request_failed() {
    let remote = InMemoryRemote::new();
    remote
        .fail(RequestMethod::Fetch, "guilds/1/channels", "503 Service Unavailable")
        .await;
    let guild = guild_with_roles();

    let err = guild.get("channels", &remote).await.unwrap_err();
    assert!(matches!(err, MirrorError::RequestFailed { ref path, .. } if path == "guilds/1/channels"));
    assert!(!guild.is_cached("channels"));

    // Without owner_id the owner route cannot be rendered.
    assert!(matches!(
        guild.get("owner", &remote).await,
        Err(MirrorError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_owner_is_fetched_from_users_route() {
    let remote = InMemoryRemote::new();
    remote
        .respond(RequestMethod::Fetch, "users/42", json!({"id": 42, "username": "boss"}))
        .await;
    let mut guild = guild_with_roles();
    guild.set("owner_id", 42).unwrap();

    let owner = guild.get("owner", &remote).await.unwrap().into_entity().unwrap();
    assert_eq!(owner.kind(), EntityKind::User);
    assert_eq!(owner.raw_str("username"), Some("boss"));
}

#[tokio::test]
async fn test_refresh_replaces_raw_state() {
    let remote = InMemoryRemote::new();
    remote
        .respond(RequestMethod::Fetch, "channels/10", json!({"id": 10, "name": "renamed"}))
        .await;
    let mut channel =
        Entity::decode(EntityKind::Channel, &json!({"id": 10, "name": "general"})).unwrap();

    channel.refresh(&remote).await.unwrap();
    assert_eq!(channel.raw_str("name"), Some("renamed"));
}

#[tokio::test]
async fn test_unsupported_operations() {
    let remote = InMemoryRemote::new();
    let user = Entity::decode(EntityKind::User, &json!({"id": 1})).unwrap();

    assert!(matches!(
        user.delete(&remote).await,
        Err(MirrorError::Unsupported { kind: EntityKind::User, operation: "delete" })
    ));
    let mut user = user;
    assert!(matches!(
        user.update(&remote).await,
        Err(MirrorError::Unsupported { operation: "update", .. })
    ));
    assert!(remote.requests().await.is_empty());
}

#[tokio::test]
async fn test_delete_does_not_touch_the_collection() {
    let remote = InMemoryRemote::new();
    let guild = Entity::decode(
        EntityKind::Guild,
        &json!({"id": 1, "channels": [{"id": 10}, {"id": 11}]}),
    )
    .unwrap();

    let channels = guild.relation("channels").unwrap();
    channels.get(&EntityKey::from(10u64)).unwrap().delete(&remote).await.unwrap();

    assert_eq!(remote.request_count(RequestMethod::Delete, "channels/10").await, 1);
    assert_eq!(guild.relation("channels").unwrap().len(), 2);
}

#[tokio::test]
async fn test_kick_and_move_member() {
    let remote = InMemoryRemote::new();
    let member = Entity::decode(
        EntityKind::Member,
        &json!({"guild_id": 1, "user": {"id": 100}}),
    )
    .unwrap();

    member.move_to(20u64, &remote).await.unwrap();
    member.kick(&remote).await.unwrap();

    let requests = remote.requests().await;
    assert_eq!(requests[0].method, RequestMethod::Update);
    assert_eq!(requests[0].body, Some(json!({"channel_id": 20})));
    assert_eq!(requests[1].method, RequestMethod::Delete);
    assert_eq!(requests[1].path, "guilds/1/members/100");
}
