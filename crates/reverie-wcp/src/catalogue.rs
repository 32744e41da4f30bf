//! The WCP tool catalogue.
//!
//! Every tool is a name, a one-line description, and a JSON schema for
//! its parameters. Name prefixes route to handler families: `world_*`,
//! `area_*`, `character_*`, `item_*`.

use serde::Serialize;
use serde_json::{Value, json};

/// One catalogue entry, as returned by `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    /// Tool name, e.g. `character_move`.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// JSON schema of the parameters object.
    pub input_schema: Value,
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// The full tool inventory.
pub fn catalogue() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "world_list",
            description: "List every world",
            input_schema: schema(json!({}), &[]),
        },
        ToolDef {
            name: "world_get",
            description: "Fetch a world by id",
            input_schema: schema(json!({"world_id": {"type": "integer"}}), &["world_id"]),
        },
        ToolDef {
            name: "world_create",
            description: "Create a world",
            input_schema: schema(
                json!({"name": {"type": "string"}, "description": {"type": "string"}}),
                &["name"],
            ),
        },
        ToolDef {
            name: "world_delete",
            description: "Delete a world and everything it owns",
            input_schema: schema(json!({"world_id": {"type": "integer"}}), &["world_id"]),
        },
        ToolDef {
            name: "world_get_writing_style",
            description: "Fetch the writing style configured for a world",
            input_schema: schema(json!({"world_id": {"type": "integer"}}), &["world_id"]),
        },
        ToolDef {
            name: "area_list",
            description: "List the areas of a world",
            input_schema: schema(json!({"world_id": {"type": "integer"}}), &["world_id"]),
        },
        ToolDef {
            name: "area_get",
            description: "Fetch an area with its characters and items",
            input_schema: schema(json!({"area_id": {"type": "integer"}}), &["area_id"]),
        },
        ToolDef {
            name: "area_get_characters",
            description: "List the characters standing in an area",
            input_schema: schema(json!({"area_id": {"type": "integer"}}), &["area_id"]),
        },
        ToolDef {
            name: "area_get_items",
            description: "List the items lying in an area",
            input_schema: schema(json!({"area_id": {"type": "integer"}}), &["area_id"]),
        },
        ToolDef {
            name: "area_create",
            description: "Create an area in a world",
            input_schema: schema(
                json!({
                    "world_id": {"type": "integer"},
                    "name": {"type": "string"},
                    "description": {"type": "string"},
                    "temperature": {"type": "number"},
                    "exits": {"type": "object", "additionalProperties": {"type": "integer"}},
                }),
                &["world_id", "name"],
            ),
        },
        ToolDef {
            name: "character_get",
            description: "Fetch a character with its inventory",
            input_schema: schema(
                json!({"character_id": {"type": "integer"}}),
                &["character_id"],
            ),
        },
        ToolDef {
            name: "character_create",
            description: "Create a character",
            input_schema: schema(
                json!({
                    "world_id": {"type": "integer"},
                    "name": {"type": "string"},
                    "species": {"type": "string"},
                    "gender": {"type": "string"},
                    "age": {"type": "integer"},
                    "description": {"type": "string"},
                    "backstory": {"type": "string"},
                    "character_class": {"type": "string", "enum": ["story", "minor"]},
                    "area_id": {"type": "integer"},
                }),
                &["world_id", "name"],
            ),
        },
        ToolDef {
            name: "character_delete",
            description: "Delete a character, releasing any session",
            input_schema: schema(
                json!({
                    "character_id": {"type": "integer"},
                    "session_token": {"type": "string"},
                }),
                &["character_id", "session_token"],
            ),
        },
        ToolDef {
            name: "character_list_awake",
            description: "List the awake characters of a world",
            input_schema: schema(json!({"world_id": {"type": "integer"}}), &["world_id"]),
        },
        ToolDef {
            name: "character_move",
            description: "Move a character to an area (no exit gating)",
            input_schema: schema(
                json!({
                    "character_id": {"type": "integer"},
                    "area_id": {"type": "integer"},
                    "session_token": {"type": "string"},
                }),
                &["character_id", "area_id", "session_token"],
            ),
        },
        ToolDef {
            name: "character_speak",
            description: "Record speech, an action, or a thought",
            input_schema: schema(
                json!({
                    "character_id": {"type": "integer"},
                    "text": {"type": "string"},
                    "action_type": {"type": "string", "enum": ["speech", "action", "thought"]},
                    "session_token": {"type": "string"},
                }),
                &["character_id", "text", "action_type", "session_token"],
            ),
        },
        ToolDef {
            name: "character_update_state",
            description: "Apply a partial physiology update",
            input_schema: schema(
                json!({
                    "character_id": {"type": "integer"},
                    "nutrition": {"type": "number"},
                    "hydration": {"type": "number"},
                    "tiredness": {"type": "number"},
                    "alertness": {"type": "number"},
                    "damage": {"type": "array"},
                    "session_token": {"type": "string"},
                }),
                &["character_id", "session_token"],
            ),
        },
        ToolDef {
            name: "character_get_inventory",
            description: "List the items a character holds",
            input_schema: schema(
                json!({"character_id": {"type": "integer"}}),
                &["character_id"],
            ),
        },
        ToolDef {
            name: "character_add_memory",
            description: "Append a memory entry (tail-capped by class)",
            input_schema: schema(
                json!({
                    "character_id": {"type": "integer"},
                    "action": {"type": "string"},
                    "result": {"type": "string"},
                    "session_token": {"type": "string"},
                }),
                &["character_id", "action", "result", "session_token"],
            ),
        },
        ToolDef {
            name: "character_claim",
            description: "Claim a character for a player; returns a session token",
            input_schema: schema(
                json!({
                    "player_id": {"type": "string"},
                    "character_id": {"type": "integer"},
                }),
                &["player_id", "character_id"],
            ),
        },
        ToolDef {
            name: "character_release",
            description: "Release a character and drop its sessions",
            input_schema: schema(
                json!({
                    "character_id": {"type": "integer"},
                    "session_token": {"type": "string"},
                }),
                &["character_id", "session_token"],
            ),
        },
        ToolDef {
            name: "item_get",
            description: "Fetch an item by id",
            input_schema: schema(json!({"item_id": {"type": "integer"}}), &["item_id"]),
        },
        ToolDef {
            name: "item_create",
            description: "Create an item, optionally placed in an area",
            input_schema: schema(
                json!({
                    "world_id": {"type": "integer"},
                    "name": {"type": "string"},
                    "description": {"type": "string"},
                    "properties": {"type": "object"},
                    "area_id": {"type": "integer"},
                }),
                &["world_id", "name"],
            ),
        },
        ToolDef {
            name: "item_pickup",
            description: "Pick an item up; a free hand is chosen when no slot is named",
            input_schema: schema(
                json!({
                    "character_id": {"type": "integer"},
                    "item_id": {"type": "integer"},
                    "location": {"type": "string"},
                    "session_token": {"type": "string"},
                }),
                &["character_id", "item_id", "session_token"],
            ),
        },
        ToolDef {
            name: "item_drop",
            description: "Drop a held item into the character's area",
            input_schema: schema(
                json!({
                    "character_id": {"type": "integer"},
                    "item_id": {"type": "integer"},
                    "session_token": {"type": "string"},
                }),
                &["character_id", "item_id", "session_token"],
            ),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_prefix_routed() {
        let tools = catalogue();
        let mut seen = std::collections::BTreeSet::new();
        for tool in &tools {
            assert!(seen.insert(tool.name), "duplicate tool: {}", tool.name);
            assert!(
                tool.name.starts_with("world_")
                    || tool.name.starts_with("area_")
                    || tool.name.starts_with("character_")
                    || tool.name.starts_with("item_"),
                "unrouted tool name: {}",
                tool.name
            );
        }
    }

    #[test]
    fn every_tool_has_an_object_schema() {
        for tool in catalogue() {
            assert_eq!(
                tool.input_schema.get("type").and_then(Value::as_str),
                Some("object"),
                "{} schema is not an object",
                tool.name
            );
        }
    }

    #[test]
    fn required_fields_exist_in_properties() {
        for tool in catalogue() {
            let properties = tool.input_schema.get("properties").cloned().unwrap_or_default();
            let required = tool
                .input_schema
                .get("required")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for field in required {
                let name = field.as_str().unwrap_or("");
                assert!(
                    properties.get(name).is_some(),
                    "{}: required field '{name}' missing from properties",
                    tool.name
                );
            }
        }
    }
}
