//! Parsing model responses into typed actions.
//!
//! The model is instructed to answer with a single small JSON object, and
//! generation stops at the closing brace -- so the brace itself is often
//! missing. The parser extracts the first `{...}` from the raw text,
//! repairs a truncated tail, and validates the `action` field against the
//! six known shapes.

use reverie_types::CharacterAction;

use crate::error::ParseError;

/// Action tags the scheduler understands.
const KNOWN_ACTIONS: &[&str] = &["move", "speak", "pickup", "drop", "wait", "sleep"];

/// Parse a raw model response into a [`CharacterAction`].
///
/// # Errors
///
/// Returns [`ParseError`] describing why the response was unusable;
/// callers count and log these, they are never surfaced over RPC.
pub fn parse_action(raw: &str) -> Result<CharacterAction, ParseError> {
    let candidate = extract_object(raw).ok_or(ParseError::NoJson)?;
    let value = parse_with_repair(&candidate)?;

    let action = value
        .get("action")
        .and_then(serde_json::Value::as_str)
        .ok_or(ParseError::MissingAction)?;

    if !KNOWN_ACTIONS.contains(&action) {
        return Err(ParseError::UnknownAction(action.to_owned()));
    }
    let action = action.to_owned();

    serde_json::from_value(value).map_err(|e| ParseError::BadShape {
        action,
        message: e.to_string(),
    })
}

/// Extract the first brace-delimited object from `raw`.
///
/// Scans with a depth counter that respects string literals and escapes.
/// When the object is unterminated (stop-string truncation), the rest of
/// the text is returned for repair.
fn extract_object(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let tail = &raw[start..];

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in tail.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth = depth.saturating_add(1),
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return tail.get(..=offset).map(ToOwned::to_owned);
                }
            }
            _ => {}
        }
    }
    // Unterminated: hand back everything from the opening brace.
    Some(tail.to_owned())
}

/// Parse a candidate object, repairing a truncated tail if needed.
fn parse_with_repair(candidate: &str) -> Result<serde_json::Value, ParseError> {
    if let Ok(value) = serde_json::from_str(candidate) {
        return Ok(value);
    }
    // Missing closing brace (generation stopped at "}").
    let repaired = format!("{candidate}}}");
    if let Ok(value) = serde_json::from_str(&repaired) {
        return Ok(value);
    }
    // Unterminated string value as well.
    let repaired = format!("{candidate}\"}}");
    serde_json::from_str(&repaired)
        .map_err(|e| ParseError::Invalid(e.to_string()))
}
