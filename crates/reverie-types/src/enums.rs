//! Enumeration types shared across the Reverie workspace.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Character class
// ---------------------------------------------------------------------------

/// Narrative weight of a character, controlling memory depth and which
/// language-model tier decides its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterClass {
    /// Background character: short memory, small model.
    Minor,
    /// Protagonist-grade character: longer memory, larger model.
    Story,
}

impl CharacterClass {
    /// Maximum number of memory entries retained for this class.
    pub const fn memory_cap(self) -> usize {
        match self {
            Self::Minor => 3,
            Self::Story => 5,
        }
    }

    /// The database text representation (`characters.character_class`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Story => "story",
        }
    }

    /// Parse the database text representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "minor" => Some(Self::Minor),
            "story" => Some(Self::Story),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Speech kinds
// ---------------------------------------------------------------------------

/// How a character expresses itself via the `speak` operation.
///
/// Only `Speech` is audible to the world (and to area triggers); actions
/// and thoughts are recorded in the speaker's own memory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakKind {
    /// Spoken aloud; fires `character_speech` when the speaker has an area.
    Speech,
    /// A described physical action.
    Action,
    /// An internal thought.
    Thought,
}

impl SpeakKind {
    /// The label used when rendering memory entries (`"speech: <text>"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Speech => "speech",
            Self::Action => "action",
            Self::Thought => "thought",
        }
    }

    /// Parse the wire representation used by `character_speak`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "speech" => Some(Self::Speech),
            "action" => Some(Self::Action),
            "thought" => Some(Self::Thought),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Kernel event types
// ---------------------------------------------------------------------------

/// The type tag of a kernel event, as referenced by trigger conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A character entered an area.
    CharacterEnters,
    /// A character spoke aloud in an area.
    CharacterSpeech,
    /// An item was picked up from an area.
    ItemPickedUp,
    /// An item was dropped into an area.
    ItemDropped,
}

impl EventType {
    /// The snake_case tag stored in trigger condition records.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CharacterEnters => "character_enters",
            Self::CharacterSpeech => "character_speech",
            Self::ItemPickedUp => "item_picked_up",
            Self::ItemDropped => "item_dropped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_cap_by_class() {
        assert_eq!(CharacterClass::Minor.memory_cap(), 3);
        assert_eq!(CharacterClass::Story.memory_cap(), 5);
    }

    #[test]
    fn character_class_roundtrip() {
        for class in [CharacterClass::Minor, CharacterClass::Story] {
            assert_eq!(CharacterClass::parse(class.as_str()), Some(class));
        }
        assert_eq!(CharacterClass::parse("narrator"), None);
    }

    #[test]
    fn character_class_serde_is_lowercase() {
        let json = serde_json::to_string(&CharacterClass::Story).ok();
        assert_eq!(json.as_deref(), Some("\"story\""));
    }

    #[test]
    fn speak_kind_parse() {
        assert_eq!(SpeakKind::parse("speech"), Some(SpeakKind::Speech));
        assert_eq!(SpeakKind::parse("thought"), Some(SpeakKind::Thought));
        assert_eq!(SpeakKind::parse("shout"), None);
    }

    #[test]
    fn event_type_tags() {
        assert_eq!(EventType::CharacterEnters.as_str(), "character_enters");
        assert_eq!(EventType::ItemPickedUp.as_str(), "item_picked_up");
    }

    #[test]
    fn event_type_serde_matches_tag() {
        let json = serde_json::to_string(&EventType::CharacterSpeech).ok();
        assert_eq!(json.as_deref(), Some("\"character_speech\""));
    }
}
