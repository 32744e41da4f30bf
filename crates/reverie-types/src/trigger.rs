//! Trigger records stored on areas.
//!
//! Triggers are serialized data, not code: a condition matched against
//! kernel events and an ordered list of reaction records interpreted by the
//! trigger engine. The variants here define the on-disk JSON shape; the
//! matching and execution semantics live in `reverie-kernel`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{AreaId, CharacterId, ItemId};

/// A condition/reaction pair attached to an area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// When the trigger fires.
    pub condition: TriggerCondition,
    /// What happens, executed in declared order.
    pub reactions: Vec<TriggerReaction>,
    /// One-shot triggers are removed from the area after firing.
    #[serde(default)]
    pub one_time: bool,
}

/// The condition half of a trigger.
///
/// Serialized either as a bare event-type string (`"character_enters"`)
/// or as an object carrying optional narrowing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerCondition {
    /// Matches any event of the named type.
    Event(String),
    /// Matches events of the named type that also satisfy every present
    /// narrowing field.
    Detailed {
        /// Event type tag, e.g. `"character_speech"`.
        #[serde(rename = "type")]
        event_type: String,
        /// For speech events: at least one keyword must appear
        /// (case-insensitive substring) in the spoken text.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        keywords: Option<Vec<String>>,
        /// The event's character must equal this id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        character_id: Option<CharacterId>,
        /// The event's item must equal this id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_id: Option<ItemId>,
    },
}

/// Template for an item created by an `add_item` reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTemplate {
    /// Display name of the spawned item.
    pub name: String,
    /// Description, empty when omitted.
    #[serde(default)]
    pub description: String,
    /// Free-form properties.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// The reaction half of a trigger, tagged by `type`.
///
/// `AppendDescription` duplicates the append form of `ModifyDescription`;
/// both spellings occur in stored worlds and both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerReaction {
    /// Create a new item in the firing area.
    AddItem {
        /// Template for the created item.
        item: ItemTemplate,
    },
    /// Delete an item by id. Skipped silently if the item does not exist
    /// or belongs to another world.
    RemoveItem {
        /// The item to remove.
        item_id: ItemId,
    },
    /// Add or overwrite an exit on the firing area.
    AddExit {
        /// Direction label (stored lowercased).
        direction: String,
        /// Destination area.
        target_area_id: AreaId,
    },
    /// Remove an exit from the firing area.
    RemoveExit {
        /// Direction label to drop.
        direction: String,
    },
    /// Replace or extend the area description. Exactly one of the two
    /// fields is expected; when both are present, replacement runs first.
    ModifyDescription {
        /// Full replacement text.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_description: Option<String>,
        /// Text appended to the existing description.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        append_description: Option<String>,
    },
    /// Compatibility alias for the append form of `ModifyDescription`.
    AppendDescription {
        /// Text appended to the existing description.
        append_description: String,
    },
    /// Set or shift the area temperature. Absolute `temperature` wins when
    /// both fields are present.
    ModifyTemperature {
        /// Absolute temperature in degrees Celsius.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        temperature: Option<f64>,
        /// Added to the current temperature.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        temperature_delta: Option<f64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_string_condition_deserializes() {
        let cond: TriggerCondition =
            serde_json::from_str("\"character_enters\"").unwrap_or(TriggerCondition::Event(
                String::new(),
            ));
        assert_eq!(cond, TriggerCondition::Event("character_enters".to_owned()));
    }

    #[test]
    fn detailed_condition_deserializes() {
        let raw = r#"{"type": "character_speech", "keywords": ["open sesame"]}"#;
        let cond: Result<TriggerCondition, _> = serde_json::from_str(raw);
        assert!(matches!(
            cond,
            Ok(TriggerCondition::Detailed { ref event_type, keywords: Some(ref kw), .. })
                if event_type == "character_speech" && kw.len() == 1
        ));
    }

    #[test]
    fn reaction_tags_are_snake_case() {
        let raw = r#"{"type": "add_exit", "direction": "secret", "target_area_id": 42}"#;
        let reaction: Result<TriggerReaction, _> = serde_json::from_str(raw);
        assert!(matches!(
            reaction,
            Ok(TriggerReaction::AddExit { ref direction, target_area_id })
                if direction == "secret" && target_area_id == AreaId::new(42)
        ));
    }

    #[test]
    fn standalone_append_description_is_accepted() {
        let raw = r#"{"type": "append_description", "append_description": "\nA draft."}"#;
        let reaction: Result<TriggerReaction, _> = serde_json::from_str(raw);
        assert!(matches!(
            reaction,
            Ok(TriggerReaction::AppendDescription { ref append_description })
                if append_description == "\nA draft."
        ));
    }

    #[test]
    fn add_item_template_defaults() {
        let raw = r#"{"type": "add_item", "item": {"name": "Rusty Key"}}"#;
        let reaction: Result<TriggerReaction, _> = serde_json::from_str(raw);
        assert!(matches!(
            reaction,
            Ok(TriggerReaction::AddItem { ref item })
                if item.name == "Rusty Key" && item.description.is_empty()
        ));
    }

    #[test]
    fn one_time_defaults_to_false() {
        let raw = r#"{"condition": "item_dropped", "reactions": []}"#;
        let trigger: Result<Trigger, _> = serde_json::from_str(raw);
        assert!(matches!(trigger, Ok(ref t) if !t.one_time));
    }

    #[test]
    fn trigger_roundtrip() {
        let trigger = Trigger {
            condition: TriggerCondition::Detailed {
                event_type: "item_picked_up".to_owned(),
                keywords: None,
                character_id: Some(CharacterId::new(3)),
                item_id: None,
            },
            reactions: vec![TriggerReaction::ModifyTemperature {
                temperature: None,
                temperature_delta: Some(-4.0),
            }],
            one_time: true,
        };
        let json = serde_json::to_value(&trigger).unwrap_or_default();
        let back: Result<Trigger, _> = serde_json::from_value(json);
        assert_eq!(back.ok(), Some(trigger));
    }
}
