//! The trigger engine: a small interpreter over serialized trigger records.
//!
//! When a kernel mutator commits, it hands the resulting [`WorldEvent`] to
//! [`fire`]. The engine loads the event's area, collects every matching
//! trigger in declared order, executes their reactions, and removes fired
//! one-time triggers. All writes land in one transaction.
//!
//! Reactions emit no events: a firing trigger's reactions form a single
//! quiescent layer, so a reaction that would itself satisfy a trigger in
//! the same area does not fire it. This keeps the engine non-reentrant.

use std::collections::BTreeMap;

use reverie_db::{DbError, PostgresPool, area_store, item_store};
use reverie_types::{AreaId, Trigger, TriggerCondition, TriggerReaction, WorldEvent};

use crate::error::KernelError;

/// Whether a trigger condition matches a kernel event.
///
/// A bare string matches on event type alone. A detailed condition also
/// requires: every keyword check (speech events only, case-insensitive
/// substring), and equality on `character_id` / `item_id` when present.
pub fn condition_matches(condition: &TriggerCondition, event: &WorldEvent) -> bool {
    match condition {
        TriggerCondition::Event(event_type) => event_type == event.event_type().as_str(),
        TriggerCondition::Detailed {
            event_type,
            keywords,
            character_id,
            item_id,
        } => {
            if event_type != event.event_type().as_str() {
                return false;
            }
            if let Some(keywords) = keywords
                && let WorldEvent::CharacterSpeech { text, .. } = event
            {
                let spoken = text.to_lowercase();
                if !keywords
                    .iter()
                    .any(|keyword| spoken.contains(&keyword.to_lowercase()))
                {
                    return false;
                }
            }
            if let Some(required) = character_id
                && *required != event.character_id()
            {
                return false;
            }
            if let Some(required) = item_id
                && Some(*required) != event.item_id()
            {
                return false;
            }
            true
        }
    }
}

/// Working copy of the area fields that reactions rewrite locally before
/// a single flush at the end of the firing pass.
struct LocalEffects {
    exits: BTreeMap<String, AreaId>,
    description: String,
    temperature: f64,
    exits_dirty: bool,
    description_dirty: bool,
    temperature_dirty: bool,
}

/// Apply a reaction that only touches area-local state. Returns `false`
/// for item reactions, which need database access.
fn apply_local(reaction: &TriggerReaction, fx: &mut LocalEffects) -> bool {
    match reaction {
        TriggerReaction::AddExit {
            direction,
            target_area_id,
        } => {
            fx.exits.insert(direction.to_lowercase(), *target_area_id);
            fx.exits_dirty = true;
            true
        }
        TriggerReaction::RemoveExit { direction } => {
            if fx.exits.remove(&direction.to_lowercase()).is_some() {
                fx.exits_dirty = true;
            }
            true
        }
        TriggerReaction::ModifyDescription {
            new_description,
            append_description,
        } => {
            if let Some(replacement) = new_description {
                fx.description = replacement.clone();
                fx.description_dirty = true;
            }
            if let Some(suffix) = append_description {
                fx.description.push_str(suffix);
                fx.description_dirty = true;
            }
            true
        }
        TriggerReaction::AppendDescription { append_description } => {
            fx.description.push_str(append_description);
            fx.description_dirty = true;
            true
        }
        TriggerReaction::ModifyTemperature {
            temperature,
            temperature_delta,
        } => {
            if let Some(absolute) = temperature {
                fx.temperature = *absolute;
            } else if let Some(delta) = temperature_delta {
                fx.temperature += *delta;
            }
            fx.temperature_dirty = true;
            true
        }
        TriggerReaction::AddItem { .. } | TriggerReaction::RemoveItem { .. } => false,
    }
}

/// Match `event` against its area's triggers and execute the reactions.
///
/// Matches are collected first, then reactions run in declared order;
/// fired one-time triggers are removed afterwards. The whole pass commits
/// in one transaction. An unknown area (e.g. deleted between commit and
/// dispatch) is a no-op.
///
/// # Errors
///
/// Returns [`KernelError`] if a database operation fails; in that case no
/// reaction of this pass is persisted.
pub async fn fire(db: &PostgresPool, event: &WorldEvent) -> Result<(), KernelError> {
    let Some(area) = area_store::fetch(db.pool(), event.area_id()).await? else {
        return Ok(());
    };

    let matched: Vec<bool> = area
        .triggers
        .iter()
        .map(|trigger| condition_matches(&trigger.condition, event))
        .collect();
    if !matched.iter().any(|m| *m) {
        return Ok(());
    }

    let reactions: Vec<TriggerReaction> = area
        .triggers
        .iter()
        .zip(&matched)
        .filter(|(_, hit)| **hit)
        .flat_map(|(trigger, _)| trigger.reactions.iter().cloned())
        .collect();

    let mut fx = LocalEffects {
        exits: area.exits.clone(),
        description: area.description.clone(),
        temperature: area.temperature,
        exits_dirty: false,
        description_dirty: false,
        temperature_dirty: false,
    };

    let mut tx = db.pool().begin().await.map_err(DbError::from)?;

    for reaction in &reactions {
        if apply_local(reaction, &mut fx) {
            continue;
        }
        match reaction {
            TriggerReaction::AddItem { item } => {
                item_store::insert(
                    &mut *tx,
                    area.world_id,
                    &item.name,
                    &item.description,
                    &item.properties,
                    Some(area.id),
                )
                .await?;
            }
            TriggerReaction::RemoveItem { item_id } => {
                match item_store::fetch(&mut *tx, *item_id).await? {
                    Some(item) if item.world_id == area.world_id => {
                        item_store::delete(&mut *tx, *item_id).await?;
                    }
                    _ => {
                        tracing::debug!(
                            item_id = %item_id,
                            area_id = %area.id,
                            "remove_item skipped: unknown or foreign item"
                        );
                    }
                }
            }
            _ => {}
        }
    }

    let remaining: Vec<Trigger> = area
        .triggers
        .iter()
        .zip(&matched)
        .filter(|(trigger, hit)| !(**hit && trigger.one_time))
        .map(|(trigger, _)| trigger.clone())
        .collect();
    let triggers_dirty = remaining.len() != area.triggers.len();

    if fx.exits_dirty {
        area_store::update_exits(&mut *tx, area.id, &fx.exits).await?;
    }
    if fx.description_dirty {
        area_store::update_description(&mut *tx, area.id, &fx.description).await?;
    }
    if fx.temperature_dirty {
        area_store::update_temperature(&mut *tx, area.id, fx.temperature).await?;
    }
    if triggers_dirty {
        area_store::update_triggers(&mut *tx, area.id, &remaining).await?;
    }

    tx.commit().await.map_err(DbError::from)?;

    tracing::info!(
        area_id = %area.id,
        event_type = event.event_type().as_str(),
        reactions = reactions.len(),
        "triggers fired"
    );
    Ok(())
}
