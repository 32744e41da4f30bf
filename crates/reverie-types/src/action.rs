//! Action shapes accepted from the language model.
//!
//! The scheduler parses a model response into one of these variants before
//! validating it against world state and executing it through the kernel.

use serde::{Deserialize, Serialize};

/// A single action chosen by a character's model for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum CharacterAction {
    /// Walk through an exit of the current area.
    Move {
        /// Direction label, resolved case-insensitively against the exits.
        direction: String,
    },
    /// Say something aloud.
    Speak {
        /// The spoken text.
        text: String,
    },
    /// Pick up an item from the current area.
    Pickup {
        /// Item name fragment, matched case-insensitively.
        item: String,
    },
    /// Drop a held item.
    Drop {
        /// Item name fragment, matched against held items.
        item: String,
    },
    /// Do nothing this cycle.
    Wait,
    /// Go to sleep (alertness drops to zero).
    Sleep,
}

impl CharacterAction {
    /// Short tag for logging and statistics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Speak { .. } => "speak",
            Self::Pickup { .. } => "pickup",
            Self::Drop { .. } => "drop",
            Self::Wait => "wait",
            Self::Sleep => "sleep",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_deserialization() {
        let action: Result<CharacterAction, _> =
            serde_json::from_str(r#"{"action": "move", "direction": "north"}"#);
        assert_eq!(
            action.ok(),
            Some(CharacterAction::Move {
                direction: "north".to_owned()
            })
        );
    }

    #[test]
    fn unit_variants_need_no_fields() {
        let action: Result<CharacterAction, _> = serde_json::from_str(r#"{"action": "wait"}"#);
        assert_eq!(action.ok(), Some(CharacterAction::Wait));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let action: Result<CharacterAction, _> =
            serde_json::from_str(r#"{"action": "teleport", "direction": "up"}"#);
        assert!(action.is_err());
    }

    #[test]
    fn kind_labels() {
        assert_eq!(CharacterAction::Sleep.kind(), "sleep");
        assert_eq!(
            CharacterAction::Pickup {
                item: "torch".to_owned()
            }
            .kind(),
            "pickup"
        );
    }
}
