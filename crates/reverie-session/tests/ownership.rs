//! Integration tests for claim/release and the ownership invariant.
//!
//! These tests require a live `PostgreSQL` instance. Run with:
//!
//! ```bash
//! docker compose up -d
//! cargo test -p reverie-session -- --ignored
//! docker compose down
//! ```

#![allow(clippy::expect_used, clippy::unwrap_used)]

use reverie_db::{
    NewCharacter, PostgresConfig, PostgresPool, character_store, run_migrations, world_store,
};
use reverie_session::{SessionError, SessionManager};
use reverie_types::{CharacterClass, CharacterId, WorldId};

async fn setup() -> (PostgresPool, SessionManager, WorldId, CharacterId) {
    let config = PostgresConfig::from_env().expect("invalid DB env");
    let pool = PostgresPool::connect(&config)
        .await
        .expect("failed to connect to PostgreSQL -- is Docker running?");
    run_migrations(&pool).await.expect("migrations failed");

    let world = world_store::insert(pool.pool(), "Session World", "")
        .await
        .expect("create world");
    let character = character_store::insert(
        pool.pool(),
        &NewCharacter {
            world_id: world,
            name: "Joss".to_owned(),
            species: "human".to_owned(),
            gender: "male".to_owned(),
            age: 40,
            description: String::new(),
            backstory: String::new(),
            character_class: CharacterClass::Minor,
            area_id: None,
        },
    )
    .await
    .expect("create character");

    let manager = SessionManager::new(pool.clone());
    (pool, manager, world, character)
}

async fn cleanup(pool: &PostgresPool, world: WorldId) {
    world_store::delete(pool.pool(), world)
        .await
        .expect("cleanup");
}

#[tokio::test]
#[ignore = "requires live PostgreSQL (docker compose up -d)"]
async fn ownership_is_exclusive_until_release() {
    let (pool, manager, world, character) = setup().await;

    let first = manager.claim("p1", character).await.expect("p1 claims");
    assert!(manager.validate(&first.token).await.is_some());

    // A second player is rejected while p1 holds the character.
    let contested = manager.claim("p2", character).await;
    assert!(matches!(contested, Err(SessionError::AlreadyOwned { .. })));

    manager.release(character).await.expect("release");

    // After release: owner cleared, session gone, p2 may claim.
    let row = character_store::fetch(pool.pool(), character)
        .await
        .unwrap()
        .expect("character exists");
    assert_eq!(row.owner_id, None);
    assert!(manager.validate(&first.token).await.is_none());

    let second = manager.claim("p2", character).await.expect("p2 claims");
    assert_ne!(second.token, first.token);
    assert!(manager.validate(&second.token).await.is_some());

    cleanup(&pool, world).await;
}

#[tokio::test]
#[ignore = "requires live PostgreSQL (docker compose up -d)"]
async fn claim_is_idempotent_for_the_same_player() {
    let (pool, manager, world, character) = setup().await;

    let first = manager.claim("p1", character).await.expect("first claim");
    let second = manager.claim("p1", character).await.expect("second claim");

    // One live session per character: the repeat claim returns it.
    assert_eq!(first.token, second.token);
    assert!(manager.validate(&first.token).await.is_some());
    assert!(manager.validate(&second.token).await.is_some());

    cleanup(&pool, world).await;
}

#[tokio::test]
#[ignore = "requires live PostgreSQL (docker compose up -d)"]
async fn claim_sets_owner_and_can_control_agrees() {
    let (pool, manager, world, character) = setup().await;

    assert!(!manager.can_control("p1", character).await.expect("query"));

    let session = manager.claim("p1", character).await.expect("claim");
    let row = character_store::fetch(pool.pool(), character)
        .await
        .unwrap()
        .expect("character exists");
    assert_eq!(row.owner_id.as_deref(), Some("p1"));
    assert_eq!(session.player_id, "p1");

    assert!(manager.can_control("p1", character).await.expect("query"));
    assert!(!manager.can_control("p2", character).await.expect("query"));

    cleanup(&pool, world).await;
}

#[tokio::test]
#[ignore = "requires live PostgreSQL (docker compose up -d)"]
async fn claiming_unknown_character_fails() {
    let (pool, manager, world, _character) = setup().await;

    let missing = CharacterId::new(i64::MAX);
    let err = manager.claim("p1", missing).await;
    assert!(matches!(err, Err(SessionError::NotFound { .. })));

    cleanup(&pool, world).await;
}
