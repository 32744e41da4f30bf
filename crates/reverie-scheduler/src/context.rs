//! Prompt construction for a character's turn.
//!
//! A pure function of the character's current state, its area, and its
//! inventory. Sections appear in a fixed order: identity, physical state,
//! inventory, location, memory, and the JSON instruction footer. The
//! system prompt enumerates the action shapes and forbids any non-JSON
//! output.

use std::fmt::Write as _;

use reverie_llm::Prompt;
use reverie_types::{Area, Character, CharacterClass, HAND_LEFT, HAND_RIGHT, Item};

/// Everything the prompt builder needs, read fresh at the start of the
/// character's turn.
pub struct TurnContext<'a> {
    /// The acting character.
    pub character: &'a Character,
    /// The character's area, when it has one.
    pub area: Option<&'a Area>,
    /// Other characters in the area (the builder drops the actor itself).
    pub occupants: &'a [Character],
    /// Items lying in the area.
    pub area_items: &'a [Item],
    /// Items the character holds.
    pub inventory: &'a [Item],
}

/// Build the full prompt pair for one turn.
pub fn build_prompt(ctx: &TurnContext<'_>) -> Prompt {
    Prompt {
        system: system_prompt(ctx.character.character_class),
        user: user_prompt(ctx),
    }
}

/// The fixed system prompt for a character class.
///
/// Both variants enumerate the six action shapes; the story variant adds
/// a one-line narrative emphasis.
pub fn system_prompt(class: CharacterClass) -> String {
    let mut prompt = String::from(
        "You are a character in a living world. Each turn you choose exactly one action \
         and answer with a single JSON object, nothing else.\n\
         Possible actions:\n\
         {\"action\": \"move\", \"direction\": \"<exit label>\"}\n\
         {\"action\": \"speak\", \"text\": \"<what you say>\"}\n\
         {\"action\": \"pickup\", \"item\": \"<item name>\"}\n\
         {\"action\": \"drop\", \"item\": \"<item name>\"}\n\
         {\"action\": \"wait\"}\n\
         {\"action\": \"sleep\"}\n\
         Never write prose, explanations, or anything outside the JSON object.",
    );
    if class == CharacterClass::Story {
        prompt.push_str(
            "\nYou carry the story: act with intention and let your choices reveal who you are.",
        );
    }
    prompt
}

fn user_prompt(ctx: &TurnContext<'_>) -> String {
    let mut out = String::new();
    identity_section(&mut out, ctx.character);
    physical_section(&mut out, ctx.character);
    inventory_section(&mut out, ctx.inventory);
    location_section(&mut out, ctx);
    memory_section(&mut out, ctx.character);
    out.push_str("Answer with a single JSON object describing your next action.");
    out
}

fn identity_section(out: &mut String, character: &Character) {
    let _ = writeln!(
        out,
        "You are {}, a {}-year-old {} {}.",
        character.name, character.age, character.gender, character.species
    );
    if !character.description.is_empty() {
        let _ = writeln!(out, "{}", character.description);
    }
    if !character.backstory.is_empty() {
        let _ = writeln!(out, "Backstory: {}", character.backstory);
    }
    if !character.interests.is_empty() {
        let _ = writeln!(out, "Interests: {}", character.interests.join(", "));
    }
    if !character.likes.is_empty() {
        let _ = writeln!(out, "Likes: {}", character.likes.join(", "));
    }
    if !character.dislikes.is_empty() {
        let _ = writeln!(out, "Dislikes: {}", character.dislikes.join(", "));
    }
    if !character.beliefs.is_empty() {
        let _ = writeln!(out, "Beliefs: {}", character.beliefs.join(", "));
    }
    if !character.internal_conflict.is_empty() {
        let _ = writeln!(out, "Internal conflict: {}", character.internal_conflict);
    }
    out.push('\n');
}

fn physical_section(out: &mut String, character: &Character) {
    out.push_str("Physical state:\n");
    let _ = writeln!(
        out,
        "- Nutrition: {:.0}%{}",
        character.nutrition,
        hunger_note(character.nutrition)
    );
    let _ = writeln!(
        out,
        "- Hydration: {:.0}%{}",
        character.hydration,
        thirst_note(character.hydration)
    );
    let _ = writeln!(
        out,
        "- Tiredness: {:.0}%{}",
        character.tiredness,
        tiredness_note(character.tiredness)
    );
    let _ = writeln!(
        out,
        "- Alertness: {:.0}%{}",
        character.alertness,
        alertness_note(character.alertness)
    );
    if !character.damage.is_empty() {
        let injuries: Vec<String> = character
            .damage
            .iter()
            .map(|d| format!("{} ({}, {:.0}%)", d.part, d.kind, d.severity))
            .collect();
        let _ = writeln!(out, "- Injuries: {}", injuries.join(", "));
    }
    out.push('\n');
}

fn hunger_note(nutrition: f64) -> &'static str {
    if nutrition < 30.0 {
        " (very hungry)"
    } else if nutrition < 60.0 {
        " (somewhat hungry)"
    } else {
        ""
    }
}

fn thirst_note(hydration: f64) -> &'static str {
    if hydration < 30.0 {
        " (very thirsty)"
    } else if hydration < 60.0 {
        " (somewhat thirsty)"
    } else {
        ""
    }
}

fn tiredness_note(tiredness: f64) -> &'static str {
    if tiredness > 80.0 {
        " (extremely tired)"
    } else if tiredness > 60.0 {
        " (tired)"
    } else {
        ""
    }
}

fn alertness_note(alertness: f64) -> &'static str {
    if alertness < 20.0 {
        " (asleep)"
    } else if alertness < 50.0 {
        " (drowsy)"
    } else {
        ""
    }
}

fn inventory_section(out: &mut String, inventory: &[Item]) {
    out.push_str("Inventory:\n");
    let in_slot = |slot: &str| {
        inventory
            .iter()
            .find(|item| item.held_location.as_deref() == Some(slot))
            .map_or("empty", |item| item.name.as_str())
    };
    let _ = writeln!(out, "- Right hand: {}", in_slot(HAND_RIGHT));
    let _ = writeln!(out, "- Left hand: {}", in_slot(HAND_LEFT));

    let elsewhere: Vec<String> = inventory
        .iter()
        .filter(|item| {
            !matches!(item.held_location.as_deref(), Some(HAND_RIGHT) | Some(HAND_LEFT))
        })
        .map(|item| {
            let location = item.held_location.as_deref().unwrap_or("somewhere");
            format!("{} (in {location})", item.name)
        })
        .collect();
    if !elsewhere.is_empty() {
        let _ = writeln!(out, "- Also carrying: {}", elsewhere.join(", "));
    }
    out.push('\n');
}

fn location_section(out: &mut String, ctx: &TurnContext<'_>) {
    let Some(area) = ctx.area else {
        out.push_str("You are not currently in any specific location.\n\n");
        return;
    };

    let _ = writeln!(out, "Location: {}", area.name);
    if !area.description.is_empty() {
        let _ = writeln!(out, "{}", area.description);
    }
    let _ = writeln!(out, "Temperature: {:.1} C", area.temperature);

    if area.exits.is_empty() {
        out.push_str("There are no visible exits.\n");
    } else {
        let exits: Vec<String> = area
            .exits
            .iter()
            .map(|(direction, target)| format!("{direction} (to area {target})"))
            .collect();
        let _ = writeln!(out, "Exits: {}", exits.join(", "));
    }

    let others: Vec<&str> = ctx
        .occupants
        .iter()
        .filter(|other| other.id != ctx.character.id)
        .map(|other| other.name.as_str())
        .collect();
    if !others.is_empty() {
        let _ = writeln!(out, "Also here: {}", others.join(", "));
    }

    if !ctx.area_items.is_empty() {
        let items: Vec<&str> = ctx.area_items.iter().map(|item| item.name.as_str()).collect();
        let _ = writeln!(out, "Items here: {}", items.join(", "));
    }
    out.push('\n');
}

fn memory_section(out: &mut String, character: &Character) {
    if character.memory.is_empty() {
        return;
    }
    out.push_str("Recent memory:\n");
    for entry in &character.memory {
        let _ = writeln!(out, "- {} \u{2192} {}", entry.action, entry.result);
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use reverie_types::{
        AreaId, CharacterId, DamageEntry, ItemId, MemoryEntry, WorldId,
    };

    use super::*;

    fn test_character() -> Character {
        Character {
            id: CharacterId::new(20),
            world_id: WorldId::new(1),
            name: "Mara".to_owned(),
            species: "human".to_owned(),
            gender: "female".to_owned(),
            age: 29,
            description: "Weathered and quick-eyed.".to_owned(),
            backstory: "Raised on the coast.".to_owned(),
            likes: vec!["rain".to_owned()],
            dislikes: Vec::new(),
            interests: vec!["maps".to_owned()],
            beliefs: Vec::new(),
            internal_conflict: String::new(),
            memory: vec![MemoryEntry::new("waited", "time passed", Utc::now())],
            nutrition: 55.0,
            hydration: 25.0,
            tiredness: 85.0,
            alertness: 45.0,
            damage: vec![DamageEntry {
                part: "left arm".to_owned(),
                kind: "bruise".to_owned(),
                severity: 12.0,
            }],
            current_area_id: Some(AreaId::new(10)),
            owner_id: None,
            character_class: CharacterClass::Minor,
        }
    }

    fn test_area() -> Area {
        let mut exits = BTreeMap::new();
        exits.insert("north".to_owned(), AreaId::new(11));
        Area {
            id: AreaId::new(10),
            world_id: WorldId::new(1),
            name: "Quay".to_owned(),
            description: "Salt wind over stone.".to_owned(),
            temperature: 12.5,
            exits,
            triggers: Vec::new(),
        }
    }

    fn torch(held_location: Option<&str>) -> Item {
        Item {
            id: ItemId::new(30),
            world_id: WorldId::new(1),
            name: "Torch".to_owned(),
            description: String::new(),
            properties: BTreeMap::new(),
            current_area_id: held_location.is_none().then(|| AreaId::new(10)),
            held_by_character_id: held_location.is_some().then(|| CharacterId::new(20)),
            held_location: held_location.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn sections_appear_in_order() {
        let character = test_character();
        let area = test_area();
        let ctx = TurnContext {
            character: &character,
            area: Some(&area),
            occupants: &[],
            area_items: &[],
            inventory: &[],
        };
        let prompt = build_prompt(&ctx);

        let identity = prompt.user.find("You are Mara").unwrap_or(usize::MAX);
        let physical = prompt.user.find("Physical state:").unwrap_or(usize::MAX);
        let inventory = prompt.user.find("Inventory:").unwrap_or(usize::MAX);
        let location = prompt.user.find("Location: Quay").unwrap_or(usize::MAX);
        let memory = prompt.user.find("Recent memory:").unwrap_or(usize::MAX);
        let footer = prompt.user.find("single JSON object").unwrap_or(usize::MAX);
        assert!(identity < physical);
        assert!(physical < inventory);
        assert!(inventory < location);
        assert!(location < memory);
        assert!(memory < footer);
    }

    #[test]
    fn qualitative_notes_follow_thresholds() {
        let character = test_character();
        let ctx = TurnContext {
            character: &character,
            area: None,
            occupants: &[],
            area_items: &[],
            inventory: &[],
        };
        let prompt = build_prompt(&ctx);
        assert!(prompt.user.contains("(somewhat hungry)"));
        assert!(prompt.user.contains("(very thirsty)"));
        assert!(prompt.user.contains("(extremely tired)"));
        assert!(prompt.user.contains("(drowsy)"));
        assert!(prompt.user.contains("left arm (bruise, 12%)"));
    }

    #[test]
    fn empty_identity_fields_are_omitted() {
        let mut character = test_character();
        character.beliefs.clear();
        character.internal_conflict.clear();
        let ctx = TurnContext {
            character: &character,
            area: None,
            occupants: &[],
            area_items: &[],
            inventory: &[],
        };
        let prompt = build_prompt(&ctx);
        assert!(!prompt.user.contains("Beliefs:"));
        assert!(!prompt.user.contains("Internal conflict:"));
    }

    #[test]
    fn hands_render_held_items_or_empty() {
        let character = test_character();
        let held = [torch(Some(HAND_RIGHT))];
        let ctx = TurnContext {
            character: &character,
            area: None,
            occupants: &[],
            area_items: &[],
            inventory: &held,
        };
        let prompt = build_prompt(&ctx);
        assert!(prompt.user.contains("Right hand: Torch"));
        assert!(prompt.user.contains("Left hand: empty"));
    }

    #[test]
    fn pocketed_items_listed_separately() {
        let character = test_character();
        let held = [torch(Some("belt pouch"))];
        let ctx = TurnContext {
            character: &character,
            area: None,
            occupants: &[],
            area_items: &[],
            inventory: &held,
        };
        let prompt = build_prompt(&ctx);
        assert!(prompt.user.contains("Also carrying: Torch (in belt pouch)"));
    }

    #[test]
    fn no_area_renders_placeholder() {
        let mut character = test_character();
        character.current_area_id = None;
        let ctx = TurnContext {
            character: &character,
            area: None,
            occupants: &[],
            area_items: &[],
            inventory: &[],
        };
        let prompt = build_prompt(&ctx);
        assert!(prompt
            .user
            .contains("not currently in any specific location"));
    }

    #[test]
    fn exits_render_direction_and_target() {
        let character = test_character();
        let area = test_area();
        let ctx = TurnContext {
            character: &character,
            area: Some(&area),
            occupants: &[],
            area_items: &[],
            inventory: &[],
        };
        let prompt = build_prompt(&ctx);
        assert!(prompt.user.contains("north (to area 11)"));
    }

    #[test]
    fn occupants_exclude_self() {
        let character = test_character();
        let area = test_area();
        let mut other = test_character();
        other.id = CharacterId::new(21);
        other.name = "Joss".to_owned();
        let occupants = [character.clone(), other];
        let ctx = TurnContext {
            character: &character,
            area: Some(&area),
            occupants: &occupants,
            area_items: &[],
            inventory: &[],
        };
        let prompt = build_prompt(&ctx);
        assert!(prompt.user.contains("Also here: Joss"));
        assert!(!prompt.user.contains("Also here: Mara"));
    }

    #[test]
    fn memory_renders_action_arrow_result() {
        let character = test_character();
        let ctx = TurnContext {
            character: &character,
            area: None,
            occupants: &[],
            area_items: &[],
            inventory: &[],
        };
        let prompt = build_prompt(&ctx);
        assert!(prompt.user.contains("waited \u{2192} time passed"));
    }

    #[test]
    fn story_system_prompt_adds_narrative_line() {
        let minor = system_prompt(CharacterClass::Minor);
        let story = system_prompt(CharacterClass::Story);
        assert!(story.len() > minor.len());
        assert!(story.contains("carry the story"));
        assert!(!minor.contains("carry the story"));
        for prompt in [&minor, &story] {
            assert!(prompt.contains("\"move\""));
            assert!(prompt.contains("\"sleep\""));
        }
    }
}
