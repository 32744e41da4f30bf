//! Kernel events delivered to the trigger engine after commit.

use serde::{Deserialize, Serialize};

use crate::enums::EventType;
use crate::ids::{AreaId, CharacterId, ItemId};

/// A state change announced by a kernel mutator.
///
/// Events are emitted after the mutating transaction commits and are
/// consumed synchronously by the trigger engine of the event's area.
/// Trigger reactions themselves emit no events (single quiescent layer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorldEvent {
    /// A character arrived in an area (movement or teleport).
    CharacterEnters {
        /// The area entered.
        area_id: AreaId,
        /// The arriving character.
        character_id: CharacterId,
    },
    /// A character spoke aloud.
    CharacterSpeech {
        /// The area the speech was heard in.
        area_id: AreaId,
        /// The speaker.
        character_id: CharacterId,
        /// The spoken text.
        text: String,
    },
    /// An item left the area floor for a character's holding slot.
    ItemPickedUp {
        /// The area the item was taken from.
        area_id: AreaId,
        /// The new holder.
        character_id: CharacterId,
        /// The item.
        item_id: ItemId,
    },
    /// An item was returned to the area floor.
    ItemDropped {
        /// The area the item landed in.
        area_id: AreaId,
        /// The previous holder.
        character_id: CharacterId,
        /// The item.
        item_id: ItemId,
    },
}

impl WorldEvent {
    /// The area whose triggers this event is matched against.
    pub const fn area_id(&self) -> AreaId {
        match self {
            Self::CharacterEnters { area_id, .. }
            | Self::CharacterSpeech { area_id, .. }
            | Self::ItemPickedUp { area_id, .. }
            | Self::ItemDropped { area_id, .. } => *area_id,
        }
    }

    /// The character involved in the event.
    pub const fn character_id(&self) -> CharacterId {
        match self {
            Self::CharacterEnters { character_id, .. }
            | Self::CharacterSpeech { character_id, .. }
            | Self::ItemPickedUp { character_id, .. }
            | Self::ItemDropped { character_id, .. } => *character_id,
        }
    }

    /// The item involved, for pickup/drop events.
    pub const fn item_id(&self) -> Option<ItemId> {
        match self {
            Self::ItemPickedUp { item_id, .. } | Self::ItemDropped { item_id, .. } => {
                Some(*item_id)
            }
            Self::CharacterEnters { .. } | Self::CharacterSpeech { .. } => None,
        }
    }

    /// The typed tag matched against trigger conditions.
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::CharacterEnters { .. } => EventType::CharacterEnters,
            Self::CharacterSpeech { .. } => EventType::CharacterSpeech,
            Self::ItemPickedUp { .. } => EventType::ItemPickedUp,
            Self::ItemDropped { .. } => EventType::ItemDropped,
        }
    }
}
