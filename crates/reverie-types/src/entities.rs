//! Core entity structs: worlds, areas, characters, items, writing styles.
//!
//! These are the domain representations produced by the persistence layer
//! after decoding JSON-valued columns. All percentage stats are `f64`
//! clamped to `[0.0, 100.0]` by every writer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::CharacterClass;
use crate::ids::{AreaId, CharacterId, ItemId, StyleId, WorldId};
use crate::trigger::Trigger;

/// Alertness at or above this value means the character is awake.
pub const AWAKE_THRESHOLD: f64 = 20.0;

/// The two mandatory holding slots every character has.
pub const HAND_RIGHT: &str = "right hand";
/// See [`HAND_RIGHT`].
pub const HAND_LEFT: &str = "left hand";

/// Clamp a percentage stat into the `[0, 100]` range.
pub fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Named container owning all areas, characters, items, and styles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// Database key.
    pub id: WorldId,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
}

// ---------------------------------------------------------------------------
// Area
// ---------------------------------------------------------------------------

/// A location in a world: a room with exits, environmental state, and
/// reactive triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    /// Database key.
    pub id: AreaId,
    /// Owning world.
    pub world_id: WorldId,
    /// Display name.
    pub name: String,
    /// Free-text description (triggers may rewrite or append to it).
    pub description: String,
    /// Ambient temperature in degrees Celsius.
    pub temperature: f64,
    /// Direction label (lowercased free-form string) to destination area.
    ///
    /// Destinations are expected to live in the same world but this is not
    /// enforced on write; dangling ids are tolerated on read.
    pub exits: BTreeMap<String, AreaId>,
    /// Ordered trigger records evaluated against kernel events.
    pub triggers: Vec<Trigger>,
}

// ---------------------------------------------------------------------------
// Character
// ---------------------------------------------------------------------------

/// One remembered event: what the character did and what came of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// What happened, from the character's perspective.
    pub action: String,
    /// The outcome.
    pub result: String,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
}

impl MemoryEntry {
    /// Create an entry stamped with the given time.
    pub fn new(
        action: impl Into<String>,
        result: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            action: action.into(),
            result: result.into(),
            timestamp,
        }
    }
}

/// An injury on a named body part. Severity is a percentage that decays
/// over time; zeroed entries are dropped by the physiology tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageEntry {
    /// Body part, e.g. `"left arm"`.
    pub part: String,
    /// Kind of injury, e.g. `"bruise"`, `"burn"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Severity percentage in `[0, 100]`.
    pub severity: f64,
}

/// An autonomous agent: identity, psychology, physiology, location,
/// and controllability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Database key.
    pub id: CharacterId,
    /// Owning world.
    pub world_id: WorldId,
    /// Display name.
    pub name: String,
    /// Species, free text.
    pub species: String,
    /// Gender, free text.
    pub gender: String,
    /// Age in years.
    pub age: u32,
    /// Physical description.
    pub description: String,
    /// Backstory used when building the agent's context.
    pub backstory: String,
    /// Short phrases the character likes.
    pub likes: Vec<String>,
    /// Short phrases the character dislikes.
    pub dislikes: Vec<String>,
    /// Topics the character is drawn to.
    pub interests: Vec<String>,
    /// Things the character holds true.
    pub beliefs: Vec<String>,
    /// A standing internal conflict, or empty.
    pub internal_conflict: String,
    /// Recent events, tail-capped by [`CharacterClass::memory_cap`].
    pub memory: Vec<MemoryEntry>,
    /// Satiety percentage.
    pub nutrition: f64,
    /// Hydration percentage.
    pub hydration: f64,
    /// Fatigue percentage; crossing 100 forces sleep.
    pub tiredness: f64,
    /// Wakefulness percentage; below [`AWAKE_THRESHOLD`] means asleep.
    pub alertness: f64,
    /// Current injuries.
    pub damage: Vec<DamageEntry>,
    /// The area the character stands in, if any.
    pub current_area_id: Option<AreaId>,
    /// Opaque player identifier when claimed, else `None`.
    pub owner_id: Option<String>,
    /// Narrative weight (memory depth, model tier).
    pub character_class: CharacterClass,
}

impl Character {
    /// Whether the character is awake (`alertness >= 20`).
    pub fn is_awake(&self) -> bool {
        self.alertness >= AWAKE_THRESHOLD
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// An object in the world. Exactly one of `current_area_id` and
/// `held_by_character_id` is set; `held_location` accompanies the latter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Database key.
    pub id: ItemId,
    /// Owning world.
    pub world_id: WorldId,
    /// Display name, matched by substring in scheduler actions.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Free-form key/value properties.
    pub properties: BTreeMap<String, serde_json::Value>,
    /// The area the item lies in, when not held.
    pub current_area_id: Option<AreaId>,
    /// The holder, when carried.
    pub held_by_character_id: Option<CharacterId>,
    /// Where on the holder the item rides (`"right hand"`, a pocket label).
    pub held_location: Option<String>,
}

impl Item {
    /// Whether this item is held by `character` at `location`.
    pub fn held_in(&self, character: CharacterId, location: &str) -> bool {
        self.held_by_character_id == Some(character)
            && self.held_location.as_deref() == Some(location)
    }
}

// ---------------------------------------------------------------------------
// Writing style
// ---------------------------------------------------------------------------

/// One-per-world prose configuration. Read-only from the core's
/// perspective; the narrator consumes it downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritingStyle {
    /// Database key.
    pub id: StyleId,
    /// Owning world.
    pub world_id: WorldId,
    /// Narrative tone, e.g. `"wry, melancholic"`.
    pub tone: String,
    /// Pacing guidance.
    pub pacing: String,
    /// Recurring themes.
    pub themes: Vec<String>,
    /// A sample passage in the target voice.
    pub example_passage: String,
}
