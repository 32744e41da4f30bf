//! Validating and executing parsed actions against world state.
//!
//! This is where caller-side policy lives: the `move` action resolves its
//! direction through the current area's exits (unlike the kernel, which
//! moves unconditionally), `pickup` matches item names by substring and
//! lets the kernel choose a free hand, and `drop` matches over held
//! items.

use reverie_db::{area_store, item_store};
use reverie_kernel::{Kernel, StateUpdate};
use reverie_types::{Character, CharacterAction, Item, SpeakKind};

use crate::error::ExecuteError;

/// Find the first item whose name contains `fragment`, case-insensitively.
fn find_by_fragment<'a>(items: &'a [Item], fragment: &str) -> Option<&'a Item> {
    let needle = fragment.to_lowercase();
    items
        .iter()
        .find(|item| item.name.to_lowercase().contains(&needle))
}

/// Execute one parsed action for a character.
///
/// Reads are performed fresh here (not reused from the prompt context) so
/// the action validates against the world as it is now.
///
/// # Errors
///
/// Returns [`ExecuteError`] when validation fails or the kernel rejects
/// the mutation; the cycle counts these and moves on.
pub async fn execute(
    kernel: &Kernel,
    character: &Character,
    action: &CharacterAction,
) -> Result<(), ExecuteError> {
    match action {
        CharacterAction::Move { direction } => {
            let area_id = character.current_area_id.ok_or(ExecuteError::NoArea)?;
            let area = area_store::fetch(kernel.db().pool(), area_id)
                .await?
                .ok_or(ExecuteError::NoArea)?;
            let label = direction.to_lowercase();
            let target = area
                .exits
                .get(&label)
                .copied()
                .ok_or_else(|| ExecuteError::NoExit(label))?;
            kernel.move_character(character.id, target).await?;
            Ok(())
        }
        CharacterAction::Speak { text } => {
            kernel.speak(character.id, text, SpeakKind::Speech).await?;
            Ok(())
        }
        CharacterAction::Pickup { item } => {
            let area_id = character.current_area_id.ok_or(ExecuteError::NoArea)?;
            let floor = item_store::list_in_area(kernel.db().pool(), area_id).await?;
            let target = find_by_fragment(&floor, item)
                .ok_or_else(|| ExecuteError::NoMatchingItem(item.clone()))?;
            kernel.pickup_auto(character.id, target.id).await?;
            Ok(())
        }
        CharacterAction::Drop { item } => {
            let inventory = item_store::list_held_by(kernel.db().pool(), character.id).await?;
            let target = find_by_fragment(&inventory, item)
                .ok_or_else(|| ExecuteError::NotHoldingMatch(item.clone()))?;
            kernel.drop(character.id, target.id).await?;
            Ok(())
        }
        CharacterAction::Wait => {
            kernel
                .append_memory(character.id, "waited", "time passed")
                .await?;
            Ok(())
        }
        CharacterAction::Sleep => {
            let update = StateUpdate {
                alertness: Some(0.0),
                ..StateUpdate::default()
            };
            kernel.update_state(character.id, &update).await?;
            Ok(())
        }
    }
}
