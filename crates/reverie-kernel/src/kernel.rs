//! The kernel: sole writer of world state.
//!
//! Every mutator refetches its rows inside a single transaction, commits,
//! and only then hands the resulting event to the trigger engine. Callers
//! never pass snapshots in -- ids only. On any failure the transaction
//! rolls back and a typed [`KernelError`] is returned; transient
//! serialization conflicts are retried a bounded number of times.
//!
//! Movement deliberately does not consult the source area's exits: exit
//! gating is caller policy (the scheduler's action validator, a player
//! command), which is what lets narrator- and trigger-driven teleports go
//! through the same code path.

use std::collections::BTreeMap;

use chrono::Utc;
use reverie_db::{
    DbError, NewCharacter, PostgresPool, area_store, character_store, item_store, world_store,
};
use reverie_types::{
    AreaId, CharacterId, DamageEntry, HAND_LEFT, HAND_RIGHT, Item, ItemId, MemoryEntry,
    SpeakKind, WorldEvent, WorldId, clamp_percent,
};
use serde::Deserialize;

use crate::error::{KernelError, MAX_TX_ATTEMPTS};
use crate::memory::push_capped;
use crate::trigger;

/// A partial physiology update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateUpdate {
    /// New nutrition percentage.
    pub nutrition: Option<f64>,
    /// New hydration percentage.
    pub hydration: Option<f64>,
    /// New tiredness percentage.
    pub tiredness: Option<f64>,
    /// New alertness percentage.
    pub alertness: Option<f64>,
    /// Replacement damage list.
    pub damage: Option<Vec<DamageEntry>>,
}

/// Run a transactional operation, retrying bounded times on serialization
/// conflicts and surfacing [`KernelError::Conflict`] when the budget runs
/// out.
async fn with_retries<T, F, Fut>(op: F) -> Result<T, KernelError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, KernelError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        match op().await {
            Err(e) if e.is_retryable() => {
                if attempt >= MAX_TX_ATTEMPTS {
                    return Err(KernelError::Conflict { attempts: attempt });
                }
                tracing::debug!(attempt, "transaction conflict, retrying");
            }
            other => return other,
        }
    }
}

/// Choose a free hand from a character's held items, right preferred.
fn free_hand(character: CharacterId, held: &[Item]) -> Result<&'static str, KernelError> {
    let occupied = |slot: &str| {
        held.iter()
            .any(|item| item.held_location.as_deref() == Some(slot))
    };
    if !occupied(HAND_RIGHT) {
        Ok(HAND_RIGHT)
    } else if !occupied(HAND_LEFT) {
        Ok(HAND_LEFT)
    } else {
        Err(KernelError::BothHandsFull { character })
    }
}

/// The invariant-preserving mutator layer over persistent world state.
#[derive(Clone)]
pub struct Kernel {
    db: PostgresPool,
}

impl Kernel {
    /// Wrap a connected pool.
    pub const fn new(db: PostgresPool) -> Self {
        Self { db }
    }

    /// The underlying pool, for read-only store access.
    pub const fn db(&self) -> &PostgresPool {
        &self.db
    }

    /// Hand a committed event to the trigger engine.
    ///
    /// Trigger failures never undo the committed mutation; they are logged
    /// and dropped.
    async fn dispatch(&self, event: WorldEvent) {
        if let Err(e) = trigger::fire(&self.db, &event).await {
            tracing::warn!(error = %e, event = ?event, "trigger layer failed");
        }
    }

    // -----------------------------------------------------------------------
    // Movement
    // -----------------------------------------------------------------------

    /// Move a character to an area and fire `character_enters` there.
    ///
    /// # Errors
    ///
    /// `NotFound` if either id is absent; `CrossWorld` if the area belongs
    /// to a different world.
    pub async fn move_character(
        &self,
        character_id: CharacterId,
        target_area_id: AreaId,
    ) -> Result<(), KernelError> {
        let event =
            with_retries(|| self.move_character_tx(character_id, target_area_id)).await?;
        self.dispatch(event).await;
        Ok(())
    }

    async fn move_character_tx(
        &self,
        character_id: CharacterId,
        target_area_id: AreaId,
    ) -> Result<WorldEvent, KernelError> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let character = character_store::fetch(&mut *tx, character_id)
            .await?
            .ok_or(KernelError::NotFound {
                entity: "character",
                id: character_id.into_inner(),
            })?;
        let area = area_store::fetch(&mut *tx, target_area_id)
            .await?
            .ok_or(KernelError::NotFound {
                entity: "area",
                id: target_area_id.into_inner(),
            })?;
        if character.world_id != area.world_id {
            return Err(KernelError::CrossWorld {
                context: format!(
                    "character {} is in world {}, area {} in world {}",
                    character.id, character.world_id, area.id, area.world_id
                ),
            });
        }

        character_store::update_area(&mut *tx, character_id, Some(target_area_id)).await?;
        tx.commit().await.map_err(DbError::from)?;

        tracing::info!(
            character_id = %character_id,
            area_id = %target_area_id,
            "character moved"
        );
        Ok(WorldEvent::CharacterEnters {
            area_id: target_area_id,
            character_id,
        })
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    /// Pick up an item from the character's area into a named holding
    /// slot.
    ///
    /// # Errors
    ///
    /// `NotFound` on bad ids; `NoArea` if the character stands nowhere;
    /// `NotHere` if the item is not on the floor of that area;
    /// `SlotOccupied` if a hand slot already carries something.
    pub async fn pickup(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
        hold_location: &str,
    ) -> Result<(), KernelError> {
        if hold_location.trim().is_empty() {
            return Err(KernelError::Validation {
                message: "hold location must not be empty".to_owned(),
            });
        }
        let event =
            with_retries(|| self.pickup_tx(character_id, item_id, Some(hold_location))).await?;
        self.dispatch(event).await;
        Ok(())
    }

    /// Pick up an item into a free hand, right preferred.
    ///
    /// # Errors
    ///
    /// As [`Kernel::pickup`], except `BothHandsFull` replaces
    /// `SlotOccupied` when neither hand is free.
    pub async fn pickup_auto(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
    ) -> Result<(), KernelError> {
        let event = with_retries(|| self.pickup_tx(character_id, item_id, None)).await?;
        self.dispatch(event).await;
        Ok(())
    }

    async fn pickup_tx(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
        hold_location: Option<&str>,
    ) -> Result<WorldEvent, KernelError> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let mut character = character_store::fetch(&mut *tx, character_id)
            .await?
            .ok_or(KernelError::NotFound {
                entity: "character",
                id: character_id.into_inner(),
            })?;
        let item = item_store::fetch(&mut *tx, item_id)
            .await?
            .ok_or(KernelError::NotFound {
                entity: "item",
                id: item_id.into_inner(),
            })?;

        let area_id = character
            .current_area_id
            .ok_or(KernelError::NoArea {
                character: character_id,
            })?;
        if item.current_area_id != Some(area_id) {
            return Err(KernelError::NotHere { item: item_id });
        }

        // Only the two hands are exclusive slots; pockets and the like may
        // carry any number of items. Without a requested slot, a free hand
        // is chosen, right preferred.
        let held = item_store::list_held_by(&mut *tx, character_id).await?;
        let hold_location = match hold_location {
            Some(location) => {
                if (location == HAND_RIGHT || location == HAND_LEFT)
                    && held
                        .iter()
                        .any(|held_item| held_item.held_location.as_deref() == Some(location))
                {
                    return Err(KernelError::SlotOccupied {
                        location: location.to_owned(),
                    });
                }
                location
            }
            None => free_hand(character_id, &held)?,
        };

        item_store::set_held(&mut *tx, item_id, character_id, hold_location).await?;

        push_capped(
            &mut character.memory,
            MemoryEntry::new(
                format!("picked up {}", item.name),
                format!("now holding in {hold_location}"),
                Utc::now(),
            ),
            character.character_class.memory_cap(),
        );
        character_store::update_memory(&mut *tx, character_id, &character.memory).await?;

        tx.commit().await.map_err(DbError::from)?;

        tracing::info!(
            character_id = %character_id,
            item_id = %item_id,
            hold_location,
            "item picked up"
        );
        Ok(WorldEvent::ItemPickedUp {
            area_id,
            character_id,
            item_id,
        })
    }

    /// Drop a held item onto the floor of the character's area.
    ///
    /// # Errors
    ///
    /// `NotFound` on bad ids; `NotHolding` if the character does not hold
    /// the item; `NoArea` if the character stands nowhere.
    pub async fn drop(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
    ) -> Result<(), KernelError> {
        let event = with_retries(|| self.drop_tx(character_id, item_id)).await?;
        self.dispatch(event).await;
        Ok(())
    }

    async fn drop_tx(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
    ) -> Result<WorldEvent, KernelError> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let mut character = character_store::fetch(&mut *tx, character_id)
            .await?
            .ok_or(KernelError::NotFound {
                entity: "character",
                id: character_id.into_inner(),
            })?;
        let item = item_store::fetch(&mut *tx, item_id)
            .await?
            .ok_or(KernelError::NotFound {
                entity: "item",
                id: item_id.into_inner(),
            })?;

        if item.held_by_character_id != Some(character_id) {
            return Err(KernelError::NotHolding {
                item: item_id,
                character: character_id,
            });
        }
        let area_id = character
            .current_area_id
            .ok_or(KernelError::NoArea {
                character: character_id,
            })?;

        item_store::set_area(&mut *tx, item_id, area_id).await?;

        push_capped(
            &mut character.memory,
            MemoryEntry::new(
                format!("dropped {}", item.name),
                "no longer holding it",
                Utc::now(),
            ),
            character.character_class.memory_cap(),
        );
        character_store::update_memory(&mut *tx, character_id, &character.memory).await?;

        tx.commit().await.map_err(DbError::from)?;

        tracing::info!(character_id = %character_id, item_id = %item_id, "item dropped");
        Ok(WorldEvent::ItemDropped {
            area_id,
            character_id,
            item_id,
        })
    }

    // -----------------------------------------------------------------------
    // Physiology, speech, memory
    // -----------------------------------------------------------------------

    /// Apply a partial physiology update. Percentages are clamped; setting
    /// tiredness at (or leaving it at) the ceiling forces alertness to 0.
    /// Emits no trigger events.
    ///
    /// # Errors
    ///
    /// `NotFound` if the character id is absent.
    pub async fn update_state(
        &self,
        character_id: CharacterId,
        update: &StateUpdate,
    ) -> Result<(), KernelError> {
        with_retries(|| self.update_state_tx(character_id, update)).await
    }

    async fn update_state_tx(
        &self,
        character_id: CharacterId,
        update: &StateUpdate,
    ) -> Result<(), KernelError> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let mut character = character_store::fetch(&mut *tx, character_id)
            .await?
            .ok_or(KernelError::NotFound {
                entity: "character",
                id: character_id.into_inner(),
            })?;

        if let Some(nutrition) = update.nutrition {
            character.nutrition = clamp_percent(nutrition);
        }
        if let Some(hydration) = update.hydration {
            character.hydration = clamp_percent(hydration);
        }
        if let Some(tiredness) = update.tiredness {
            character.tiredness = clamp_percent(tiredness);
        }
        if let Some(alertness) = update.alertness {
            character.alertness = clamp_percent(alertness);
        }
        if let Some(damage) = &update.damage {
            character.damage = damage
                .iter()
                .map(|entry| DamageEntry {
                    part: entry.part.clone(),
                    kind: entry.kind.clone(),
                    severity: clamp_percent(entry.severity),
                })
                .collect();
        }

        // Exhaustion invariant: at the tiredness ceiling the character
        // cannot stay awake, whatever the caller asked for.
        if character.tiredness >= 100.0 {
            character.alertness = 0.0;
        }

        character_store::update_vitals(
            &mut *tx,
            character_id,
            character.nutrition,
            character.hydration,
            character.tiredness,
            character.alertness,
            &character.damage,
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    /// Record a character expressing itself. Speech in an area fires
    /// `character_speech`; actions and thoughts only touch memory.
    ///
    /// # Errors
    ///
    /// `NotFound` if the character id is absent.
    pub async fn speak(
        &self,
        character_id: CharacterId,
        text: &str,
        kind: SpeakKind,
    ) -> Result<(), KernelError> {
        let event = with_retries(|| self.speak_tx(character_id, text, kind)).await?;
        if let Some(event) = event {
            self.dispatch(event).await;
        }
        Ok(())
    }

    async fn speak_tx(
        &self,
        character_id: CharacterId,
        text: &str,
        kind: SpeakKind,
    ) -> Result<Option<WorldEvent>, KernelError> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let mut character = character_store::fetch(&mut *tx, character_id)
            .await?
            .ok_or(KernelError::NotFound {
                entity: "character",
                id: character_id.into_inner(),
            })?;

        push_capped(
            &mut character.memory,
            MemoryEntry::new(
                format!("{}: {text}", kind.as_str()),
                "communicated",
                Utc::now(),
            ),
            character.character_class.memory_cap(),
        );
        character_store::update_memory(&mut *tx, character_id, &character.memory).await?;

        tx.commit().await.map_err(DbError::from)?;

        let event = match (kind, character.current_area_id) {
            (SpeakKind::Speech, Some(area_id)) => Some(WorldEvent::CharacterSpeech {
                area_id,
                character_id,
                text: text.to_owned(),
            }),
            _ => None,
        };
        Ok(event)
    }

    /// Append a memory entry, enforcing the class tail cap.
    ///
    /// # Errors
    ///
    /// `NotFound` if the character id is absent.
    pub async fn append_memory(
        &self,
        character_id: CharacterId,
        action: &str,
        result: &str,
    ) -> Result<(), KernelError> {
        with_retries(|| self.append_memory_tx(character_id, action, result)).await
    }

    async fn append_memory_tx(
        &self,
        character_id: CharacterId,
        action: &str,
        result: &str,
    ) -> Result<(), KernelError> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let mut character = character_store::fetch(&mut *tx, character_id)
            .await?
            .ok_or(KernelError::NotFound {
                entity: "character",
                id: character_id.into_inner(),
            })?;

        push_capped(
            &mut character.memory,
            MemoryEntry::new(action, result, Utc::now()),
            character.character_class.memory_cap(),
        );
        character_store::update_memory(&mut *tx, character_id, &character.memory).await?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Create a world.
    ///
    /// # Errors
    ///
    /// `Validation` on an empty name.
    pub async fn create_world(
        &self,
        name: &str,
        description: &str,
    ) -> Result<WorldId, KernelError> {
        if name.trim().is_empty() {
            return Err(KernelError::Validation {
                message: "world name must not be empty".to_owned(),
            });
        }
        let id = world_store::insert(self.db.pool(), name, description).await?;
        tracing::info!(world_id = %id, name, "world created");
        Ok(id)
    }

    /// Delete a world; all owned rows cascade. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Database failures only.
    pub async fn delete_world(&self, world_id: WorldId) -> Result<bool, KernelError> {
        let deleted = world_store::delete(self.db.pool(), world_id).await?;
        if deleted {
            tracing::info!(world_id = %world_id, "world deleted");
        }
        Ok(deleted)
    }

    /// Create an area. Exit targets are not validated (dangling exits are
    /// tolerated on read).
    ///
    /// # Errors
    ///
    /// `NotFound` if the world is absent; `Validation` on an empty name.
    pub async fn create_area(
        &self,
        world_id: WorldId,
        name: &str,
        description: &str,
        temperature: f64,
        exits: &BTreeMap<String, AreaId>,
    ) -> Result<AreaId, KernelError> {
        if name.trim().is_empty() {
            return Err(KernelError::Validation {
                message: "area name must not be empty".to_owned(),
            });
        }
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        world_store::fetch(&mut *tx, world_id)
            .await?
            .ok_or(KernelError::NotFound {
                entity: "world",
                id: world_id.into_inner(),
            })?;
        let lowercased: BTreeMap<String, AreaId> = exits
            .iter()
            .map(|(direction, target)| (direction.to_lowercase(), *target))
            .collect();
        let id =
            area_store::insert(&mut *tx, world_id, name, description, temperature, &lowercased)
                .await?;
        tx.commit().await.map_err(DbError::from)?;
        tracing::info!(area_id = %id, world_id = %world_id, name, "area created");
        Ok(id)
    }

    /// Create an item, optionally placed in an area of the same world.
    ///
    /// # Errors
    ///
    /// `NotFound` on bad ids; `CrossWorld` if the area belongs elsewhere;
    /// `Validation` on an empty name.
    pub async fn create_item(
        &self,
        world_id: WorldId,
        name: &str,
        description: &str,
        properties: &BTreeMap<String, serde_json::Value>,
        area_id: Option<AreaId>,
    ) -> Result<ItemId, KernelError> {
        if name.trim().is_empty() {
            return Err(KernelError::Validation {
                message: "item name must not be empty".to_owned(),
            });
        }
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        world_store::fetch(&mut *tx, world_id)
            .await?
            .ok_or(KernelError::NotFound {
                entity: "world",
                id: world_id.into_inner(),
            })?;
        if let Some(area_id) = area_id {
            let area = area_store::fetch(&mut *tx, area_id)
                .await?
                .ok_or(KernelError::NotFound {
                    entity: "area",
                    id: area_id.into_inner(),
                })?;
            if area.world_id != world_id {
                return Err(KernelError::CrossWorld {
                    context: format!(
                        "item world {world_id} does not match area {} world {}",
                        area.id, area.world_id
                    ),
                });
            }
        }
        let id =
            item_store::insert(&mut *tx, world_id, name, description, properties, area_id)
                .await?;
        tx.commit().await.map_err(DbError::from)?;
        tracing::info!(item_id = %id, world_id = %world_id, name, "item created");
        Ok(id)
    }

    /// Create a character.
    ///
    /// # Errors
    ///
    /// `NotFound` on bad ids; `CrossWorld` if the starting area belongs to
    /// another world; `Validation` on an empty name.
    pub async fn create_character(&self, new: &NewCharacter) -> Result<CharacterId, KernelError> {
        if new.name.trim().is_empty() {
            return Err(KernelError::Validation {
                message: "character name must not be empty".to_owned(),
            });
        }
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        world_store::fetch(&mut *tx, new.world_id)
            .await?
            .ok_or(KernelError::NotFound {
                entity: "world",
                id: new.world_id.into_inner(),
            })?;
        if let Some(area_id) = new.area_id {
            let area = area_store::fetch(&mut *tx, area_id)
                .await?
                .ok_or(KernelError::NotFound {
                    entity: "area",
                    id: area_id.into_inner(),
                })?;
            if area.world_id != new.world_id {
                return Err(KernelError::CrossWorld {
                    context: format!(
                        "character world {} does not match area {} world {}",
                        new.world_id, area.id, area.world_id
                    ),
                });
            }
        }
        let id = character_store::insert(&mut *tx, new).await?;
        tx.commit().await.map_err(DbError::from)?;
        tracing::info!(character_id = %id, world_id = %new.world_id, name = new.name, "character created");
        Ok(id)
    }

    /// Delete a character. Held items fall to "held by nobody" via the
    /// schema's `ON DELETE SET NULL`; the session layer is responsible for
    /// releasing any live session first. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Database failures only.
    pub async fn delete_character(&self, character_id: CharacterId) -> Result<bool, KernelError> {
        let deleted = character_store::delete(self.db.pool(), character_id).await?;
        if deleted {
            tracing::info!(character_id = %character_id, "character deleted");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held_item(id: i64, location: &str) -> Item {
        Item {
            id: ItemId::new(id),
            world_id: WorldId::new(1),
            name: "Thing".to_owned(),
            description: String::new(),
            properties: BTreeMap::new(),
            current_area_id: None,
            held_by_character_id: Some(CharacterId::new(20)),
            held_location: Some(location.to_owned()),
        }
    }

    #[test]
    fn right_hand_preferred() {
        let held: [Item; 0] = [];
        assert_eq!(free_hand(CharacterId::new(20), &held).ok(), Some(HAND_RIGHT));
    }

    #[test]
    fn left_hand_when_right_is_full() {
        let held = [held_item(1, HAND_RIGHT)];
        assert_eq!(free_hand(CharacterId::new(20), &held).ok(), Some(HAND_LEFT));
    }

    #[test]
    fn both_hands_full_fails() {
        let held = [held_item(1, HAND_RIGHT), held_item(2, HAND_LEFT)];
        assert!(matches!(
            free_hand(CharacterId::new(20), &held),
            Err(KernelError::BothHandsFull { character }) if character == CharacterId::new(20)
        ));
    }

    #[test]
    fn pocketed_items_do_not_block_hands() {
        let held = [held_item(1, "belt pouch")];
        assert_eq!(free_hand(CharacterId::new(20), &held).ok(), Some(HAND_RIGHT));
    }
}
