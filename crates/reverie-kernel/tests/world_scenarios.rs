//! Integration tests for the kernel mutators and trigger engine.
//!
//! These tests require a live `PostgreSQL` instance. Run with:
//!
//! ```bash
//! docker compose up -d
//! cargo test -p reverie-kernel -- --ignored
//! docker compose down
//! ```
//!
//! All tests are marked `#[ignore]` so they are skipped during normal
//! `cargo test` runs. Each test builds its own world so tests do not
//! interfere with each other.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::too_many_lines)]

use std::collections::BTreeMap;

use reverie_db::{
    NewCharacter, PostgresConfig, PostgresPool, area_store, character_store, item_store,
    run_migrations,
};
use reverie_kernel::{Kernel, KernelError, StateUpdate};
use reverie_types::{
    AreaId, CharacterClass, CharacterId, HAND_LEFT, HAND_RIGHT, ItemId, SpeakKind, Trigger,
    TriggerCondition, TriggerReaction, WorldId,
};

async fn setup() -> Kernel {
    let config = PostgresConfig::from_env().expect("invalid DB env");
    let pool = PostgresPool::connect(&config)
        .await
        .expect("failed to connect to PostgreSQL -- is Docker running?");
    run_migrations(&pool).await.expect("migrations failed");
    Kernel::new(pool)
}

async fn make_world(kernel: &Kernel) -> WorldId {
    kernel
        .create_world("Test World", "a scratch world")
        .await
        .expect("create_world")
}

async fn make_area(kernel: &Kernel, world: WorldId, name: &str) -> AreaId {
    kernel
        .create_area(world, name, "a bare room", 20.0, &BTreeMap::new())
        .await
        .expect("create_area")
}

async fn make_character(
    kernel: &Kernel,
    world: WorldId,
    area: Option<AreaId>,
    class: CharacterClass,
) -> CharacterId {
    kernel
        .create_character(&NewCharacter {
            world_id: world,
            name: "Mara".to_owned(),
            species: "human".to_owned(),
            gender: "female".to_owned(),
            age: 29,
            description: String::new(),
            backstory: String::new(),
            character_class: class,
            area_id: area,
        })
        .await
        .expect("create_character")
}

async fn make_item(kernel: &Kernel, world: WorldId, area: AreaId, name: &str) -> ItemId {
    kernel
        .create_item(world, name, "", &BTreeMap::new(), Some(area))
        .await
        .expect("create_item")
}

// =============================================================================
// Scenario: pickup then drop (round-trip law)
// =============================================================================

#[tokio::test]
#[ignore = "requires live PostgreSQL (docker compose up -d)"]
async fn pickup_then_drop_roundtrip() {
    let kernel = setup().await;
    let world = make_world(&kernel).await;
    let area = make_area(&kernel, world, "Cellar").await;
    let character = make_character(&kernel, world, Some(area), CharacterClass::Minor).await;
    let item = make_item(&kernel, world, area, "Torch").await;

    kernel
        .pickup(character, item, HAND_RIGHT)
        .await
        .expect("pickup");

    let held = item_store::fetch(kernel.db().pool(), item)
        .await
        .unwrap()
        .expect("item exists");
    assert_eq!(held.held_by_character_id, Some(character));
    assert_eq!(held.held_location.as_deref(), Some(HAND_RIGHT));
    assert_eq!(held.current_area_id, None);

    let c = character_store::fetch(kernel.db().pool(), character)
        .await
        .unwrap()
        .expect("character exists");
    let last = c.memory.last().expect("memory entry written");
    assert_eq!(last.action, "picked up Torch");
    assert_eq!(last.result, format!("now holding in {HAND_RIGHT}"));

    kernel.drop(character, item).await.expect("drop");

    let dropped = item_store::fetch(kernel.db().pool(), item)
        .await
        .unwrap()
        .expect("item exists");
    assert_eq!(dropped.current_area_id, Some(area));
    assert_eq!(dropped.held_by_character_id, None);
    assert_eq!(dropped.held_location, None);

    kernel.delete_world(world).await.expect("cleanup");
}

#[tokio::test]
#[ignore = "requires live PostgreSQL (docker compose up -d)"]
async fn pickup_slot_and_location_failures() {
    let kernel = setup().await;
    let world = make_world(&kernel).await;
    let area = make_area(&kernel, world, "Cellar").await;
    let elsewhere = make_area(&kernel, world, "Attic").await;
    let character = make_character(&kernel, world, Some(area), CharacterClass::Minor).await;
    let torch = make_item(&kernel, world, area, "Torch").await;
    let rope = make_item(&kernel, world, area, "Rope").await;
    let lamp = make_item(&kernel, world, area, "Lamp").await;
    let far_item = make_item(&kernel, world, elsewhere, "Lantern").await;

    // NotHere: item lies in another area.
    let err = kernel.pickup(character, far_item, HAND_RIGHT).await;
    assert!(matches!(err, Err(KernelError::NotHere { .. })));

    // Auto-selection prefers the right hand.
    kernel.pickup_auto(character, torch).await.expect("pickup torch");
    let held = item_store::fetch(kernel.db().pool(), torch)
        .await
        .unwrap()
        .expect("torch exists");
    assert_eq!(held.held_location.as_deref(), Some(HAND_RIGHT));

    // SlotOccupied: right hand taken.
    let err = kernel.pickup(character, rope, HAND_RIGHT).await;
    assert!(matches!(err, Err(KernelError::SlotOccupied { .. })));

    // Auto-selection falls back to the left hand.
    kernel.pickup_auto(character, rope).await.expect("pickup rope");
    let held = item_store::fetch(kernel.db().pool(), rope)
        .await
        .unwrap()
        .expect("rope exists");
    assert_eq!(held.held_location.as_deref(), Some(HAND_LEFT));

    // BothHandsFull: no free hand left for auto-selection.
    let err = kernel.pickup_auto(character, lamp).await;
    assert!(matches!(err, Err(KernelError::BothHandsFull { .. })));

    // A pocket never conflicts with the hand slots.
    kernel
        .pickup(character, lamp, "belt pouch")
        .await
        .expect("pickup lamp");

    // NotHolding: dropping someone else's item.
    let err = kernel.drop(character, far_item).await;
    assert!(matches!(err, Err(KernelError::NotHolding { .. })));

    kernel.delete_world(world).await.expect("cleanup");
}

// =============================================================================
// Scenario: secret door keyword trigger
// =============================================================================

#[tokio::test]
#[ignore = "requires live PostgreSQL (docker compose up -d)"]
async fn speech_keyword_opens_secret_exit() {
    let kernel = setup().await;
    let world = make_world(&kernel).await;
    let area = make_area(&kernel, world, "Vault").await;
    let target = make_area(&kernel, world, "Hidden Passage").await;
    let character = make_character(&kernel, world, Some(area), CharacterClass::Minor).await;

    let trigger = Trigger {
        condition: TriggerCondition::Detailed {
            event_type: "character_speech".to_owned(),
            keywords: Some(vec!["open sesame".to_owned()]),
            character_id: None,
            item_id: None,
        },
        reactions: vec![
            TriggerReaction::AddExit {
                direction: "secret".to_owned(),
                target_area_id: target,
            },
            TriggerReaction::ModifyDescription {
                new_description: None,
                append_description: Some("\nA secret passage opens.".to_owned()),
            },
        ],
        one_time: true,
    };
    area_store::update_triggers(kernel.db().pool(), area, &[trigger])
        .await
        .expect("install trigger");

    kernel
        .speak(character, "Open Sesame!", SpeakKind::Speech)
        .await
        .expect("speak");

    let after = area_store::fetch(kernel.db().pool(), area)
        .await
        .unwrap()
        .expect("area exists");
    assert_eq!(after.exits.get("secret"), Some(&target));
    assert!(after.description.ends_with("\nA secret passage opens."));
    assert!(after.triggers.is_empty(), "one-time trigger must be removed");

    kernel.delete_world(world).await.expect("cleanup");
}

#[tokio::test]
#[ignore = "requires live PostgreSQL (docker compose up -d)"]
async fn thoughts_and_actions_fire_no_triggers() {
    let kernel = setup().await;
    let world = make_world(&kernel).await;
    let area = make_area(&kernel, world, "Vault").await;
    let character = make_character(&kernel, world, Some(area), CharacterClass::Minor).await;

    let trigger = Trigger {
        condition: TriggerCondition::Event("character_speech".to_owned()),
        reactions: vec![TriggerReaction::ModifyTemperature {
            temperature: Some(99.0),
            temperature_delta: None,
        }],
        one_time: false,
    };
    area_store::update_triggers(kernel.db().pool(), area, &[trigger])
        .await
        .expect("install trigger");

    kernel
        .speak(character, "open sesame", SpeakKind::Thought)
        .await
        .expect("think");

    let after = area_store::fetch(kernel.db().pool(), area)
        .await
        .unwrap()
        .expect("area exists");
    assert!((after.temperature - 20.0).abs() < f64::EPSILON);

    // The thought still lands in memory.
    let c = character_store::fetch(kernel.db().pool(), character)
        .await
        .unwrap()
        .expect("character exists");
    assert_eq!(c.memory.last().map(|m| m.action.as_str()), Some("thought: open sesame"));

    kernel.delete_world(world).await.expect("cleanup");
}

// =============================================================================
// Scenario: cross-area move fires character_enters on the destination
// =============================================================================

#[tokio::test]
#[ignore = "requires live PostgreSQL (docker compose up -d)"]
async fn move_fires_enter_trigger_on_destination() {
    let kernel = setup().await;
    let world = make_world(&kernel).await;
    let origin = make_area(&kernel, world, "Origin").await;
    let destination = make_area(&kernel, world, "Destination").await;
    let character = make_character(&kernel, world, Some(origin), CharacterClass::Minor).await;

    let trigger = Trigger {
        condition: TriggerCondition::Event("character_enters".to_owned()),
        reactions: vec![TriggerReaction::ModifyTemperature {
            temperature: None,
            temperature_delta: Some(-4.0),
        }],
        one_time: true,
    };
    area_store::update_triggers(kernel.db().pool(), destination, &[trigger])
        .await
        .expect("install trigger");

    kernel
        .move_character(character, destination)
        .await
        .expect("move");

    let c = character_store::fetch(kernel.db().pool(), character)
        .await
        .unwrap()
        .expect("character exists");
    assert_eq!(c.current_area_id, Some(destination));

    let after = area_store::fetch(kernel.db().pool(), destination)
        .await
        .unwrap()
        .expect("area exists");
    assert!((after.temperature - 16.0).abs() < 1e-9);
    assert!(after.triggers.is_empty());

    kernel.delete_world(world).await.expect("cleanup");
}

#[tokio::test]
#[ignore = "requires live PostgreSQL (docker compose up -d)"]
async fn cross_world_move_is_rejected() {
    let kernel = setup().await;
    let world_a = make_world(&kernel).await;
    let world_b = make_world(&kernel).await;
    let home = make_area(&kernel, world_a, "Home").await;
    let foreign = make_area(&kernel, world_b, "Elsewhere").await;
    let character = make_character(&kernel, world_a, Some(home), CharacterClass::Minor).await;

    let err = kernel.move_character(character, foreign).await;
    assert!(matches!(err, Err(KernelError::CrossWorld { .. })));

    // The failed move left the character where it was.
    let c = character_store::fetch(kernel.db().pool(), character)
        .await
        .unwrap()
        .expect("character exists");
    assert_eq!(c.current_area_id, Some(home));

    kernel.delete_world(world_a).await.expect("cleanup");
    kernel.delete_world(world_b).await.expect("cleanup");
}

// =============================================================================
// Trigger non-reentrancy
// =============================================================================

#[tokio::test]
#[ignore = "requires live PostgreSQL (docker compose up -d)"]
async fn reactions_do_not_fire_further_triggers() {
    let kernel = setup().await;
    let world = make_world(&kernel).await;
    let area = make_area(&kernel, world, "Shrine").await;
    let character = make_character(&kernel, world, Some(area), CharacterClass::Minor).await;

    // Trigger 1 spawns an item on speech. Trigger 2 would scorch the room
    // if any item event fired -- reactions must not produce one.
    let triggers = [
        Trigger {
            condition: TriggerCondition::Detailed {
                event_type: "character_speech".to_owned(),
                keywords: Some(vec!["bell".to_owned()]),
                character_id: None,
                item_id: None,
            },
            reactions: vec![TriggerReaction::AddItem {
                item: reverie_types::ItemTemplate {
                    name: "Bronze Bell".to_owned(),
                    description: String::new(),
                    properties: BTreeMap::new(),
                },
            }],
            one_time: false,
        },
        Trigger {
            condition: TriggerCondition::Event("item_picked_up".to_owned()),
            reactions: vec![TriggerReaction::ModifyTemperature {
                temperature: Some(99.0),
                temperature_delta: None,
            }],
            one_time: false,
        },
        Trigger {
            condition: TriggerCondition::Event("item_dropped".to_owned()),
            reactions: vec![TriggerReaction::ModifyTemperature {
                temperature: Some(99.0),
                temperature_delta: None,
            }],
            one_time: false,
        },
    ];
    area_store::update_triggers(kernel.db().pool(), area, &triggers)
        .await
        .expect("install triggers");

    kernel
        .speak(character, "ring the bell", SpeakKind::Speech)
        .await
        .expect("speak");

    let items = item_store::list_in_area(kernel.db().pool(), area)
        .await
        .expect("list items");
    assert_eq!(items.len(), 1, "the bell was spawned");
    assert_eq!(items[0].name, "Bronze Bell");

    let after = area_store::fetch(kernel.db().pool(), area)
        .await
        .unwrap()
        .expect("area exists");
    assert!(
        (after.temperature - 20.0).abs() < f64::EPSILON,
        "reaction must not fire the item triggers"
    );

    kernel.delete_world(world).await.expect("cleanup");
}

// =============================================================================
// Physiology invariants through update_state
// =============================================================================

#[tokio::test]
#[ignore = "requires live PostgreSQL (docker compose up -d)"]
async fn update_state_clamps_and_forces_sleep() {
    let kernel = setup().await;
    let world = make_world(&kernel).await;
    let character = make_character(&kernel, world, None, CharacterClass::Minor).await;

    kernel
        .update_state(
            character,
            &StateUpdate {
                nutrition: Some(150.0),
                hydration: Some(-3.0),
                tiredness: Some(120.0),
                alertness: Some(90.0),
                damage: None,
            },
        )
        .await
        .expect("update_state");

    let c = character_store::fetch(kernel.db().pool(), character)
        .await
        .unwrap()
        .expect("character exists");
    assert!((c.nutrition - 100.0).abs() < f64::EPSILON);
    assert!((c.hydration - 0.0).abs() < f64::EPSILON);
    assert!((c.tiredness - 100.0).abs() < f64::EPSILON);
    assert!(
        (c.alertness - 0.0).abs() < f64::EPSILON,
        "tiredness at ceiling forces sleep"
    );

    kernel.delete_world(world).await.expect("cleanup");
}

// =============================================================================
// Memory bound law
// =============================================================================

#[tokio::test]
#[ignore = "requires live PostgreSQL (docker compose up -d)"]
async fn memory_tail_is_bounded_by_class() {
    let kernel = setup().await;
    let world = make_world(&kernel).await;
    let minor = make_character(&kernel, world, None, CharacterClass::Minor).await;
    let story = make_character(&kernel, world, None, CharacterClass::Story).await;

    for n in 0..8 {
        kernel
            .append_memory(minor, &format!("event {n}"), "done")
            .await
            .expect("append");
        kernel
            .append_memory(story, &format!("event {n}"), "done")
            .await
            .expect("append");
    }

    let minor_row = character_store::fetch(kernel.db().pool(), minor)
        .await
        .unwrap()
        .expect("minor exists");
    assert_eq!(minor_row.memory.len(), 3);
    assert_eq!(minor_row.memory.last().map(|m| m.action.as_str()), Some("event 7"));

    let story_row = character_store::fetch(kernel.db().pool(), story)
        .await
        .unwrap()
        .expect("story exists");
    assert_eq!(story_row.memory.len(), 5);
    assert_eq!(story_row.memory.first().map(|m| m.action.as_str()), Some("event 3"));

    kernel.delete_world(world).await.expect("cleanup");
}
