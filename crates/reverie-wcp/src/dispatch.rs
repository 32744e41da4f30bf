//! Request dispatch: envelope handling, authorization, and tool handlers.
//!
//! Tool names route by prefix to a handler family. Handler failures are
//! caught and reported inside the `tools/call` result; only protocol
//! failures (bad JSON, unknown method, malformed envelope) use the
//! JSON-RPC error object. Every call runs under a 30-second deadline.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reverie_db::{
    NewCharacter, area_store, character_store, item_store, style_store, world_store,
};
use reverie_kernel::{Kernel, KernelError, StateUpdate};
use reverie_session::SessionManager;
use reverie_types::{AreaId, CharacterClass, CharacterId, ItemId, SpeakKind, WorldId};
use serde_json::{Value, json};

use crate::catalogue::catalogue;
use crate::error::{WcpError, codes};
use crate::protocol::{
    INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, Request, Response,
    tool_content, tool_error,
};

/// Per-request deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tools that mutate a specific character and therefore require a
/// controlling session when invoked over the remote transport.
const CONTROLLED_TOOLS: &[&str] = &[
    "character_move",
    "character_speak",
    "character_update_state",
    "character_add_memory",
    "character_delete",
    "character_release",
    "item_pickup",
    "item_drop",
];

/// The WCP server state shared by both transports.
pub struct WcpServer {
    kernel: Kernel,
    sessions: Arc<SessionManager>,
}

impl WcpServer {
    /// Create a server over the kernel and session manager.
    pub const fn new(kernel: Kernel, sessions: Arc<SessionManager>) -> Self {
        Self { kernel, sessions }
    }

    /// Handle one wire line and produce the wire response.
    ///
    /// `remote` marks calls arriving over the websocket transport, which
    /// are subject to the session authorization policy; stdio callers are
    /// trusted local automation.
    pub async fn handle_line(&self, raw: &str, remote: bool) -> String {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                return Response::err(Value::Null, PARSE_ERROR, format!("parse error: {e}"))
                    .to_wire();
            }
        };
        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Response::err(
                    Value::Null,
                    INVALID_REQUEST,
                    format!("invalid request: {e}"),
                )
                .to_wire();
            }
        };
        self.handle_request(request, remote).await.to_wire()
    }

    /// Handle a decoded request envelope.
    pub async fn handle_request(&self, request: Request, remote: bool) -> Response {
        match request.method.as_str() {
            "initialize" => Response::ok(
                request.id,
                json!({
                    "server": "reverie",
                    "version": env!("CARGO_PKG_VERSION"),
                    "protocol": "wcp",
                }),
            ),
            "tools/list" => Response::ok(request.id, json!({ "tools": catalogue() })),
            "tools/call" => {
                let Some(name) = request.params.get("name").and_then(Value::as_str) else {
                    return Response::err(
                        request.id,
                        INVALID_PARAMS,
                        "tools/call requires a tool name".to_owned(),
                    );
                };
                let arguments = request
                    .params
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| json!({}));

                let outcome = tokio::time::timeout(
                    REQUEST_TIMEOUT,
                    self.call_tool(name, &arguments, remote),
                )
                .await;
                let result = match outcome {
                    Ok(Ok(payload)) => tool_content(payload),
                    Ok(Err(e)) => {
                        tracing::warn!(tool = name, error = %e, "tool call failed");
                        tool_error(e.code(), &e.to_string())
                    }
                    Err(_) => {
                        tracing::warn!(tool = name, "tool call timed out");
                        tool_error(codes::TIMEOUT, "request timed out")
                    }
                };
                Response::ok(request.id, result)
            }
            other => Response::err(
                request.id,
                METHOD_NOT_FOUND,
                format!("unknown method: {other}"),
            ),
        }
    }

    /// Authorization policy for remote callers.
    async fn authorize(&self, name: &str, args: &Value) -> Result<(), WcpError> {
        if !CONTROLLED_TOOLS.contains(&name) {
            return Ok(());
        }
        let token = args
            .get("session_token")
            .and_then(Value::as_str)
            .ok_or_else(|| WcpError::Unauthorized("session token required".to_owned()))?;
        let session = self
            .sessions
            .validate(token)
            .await
            .ok_or_else(|| {
                WcpError::Unauthorized("invalid or expired session token".to_owned())
            })?;
        let character_id = CharacterId::new(require_i64(args, "character_id")?);
        let controls = session.character_id == character_id
            && self
                .sessions
                .can_control(&session.player_id, character_id)
                .await?;
        if !controls {
            return Err(WcpError::Unauthorized(
                "caller does not control this character".to_owned(),
            ));
        }
        Ok(())
    }

    /// Route a tool call by name prefix.
    async fn call_tool(
        &self,
        name: &str,
        args: &Value,
        remote: bool,
    ) -> Result<Value, WcpError> {
        if remote {
            self.authorize(name, args).await?;
        }

        if let Some(rest) = name.strip_prefix("world_") {
            self.world_tool(rest, args).await
        } else if let Some(rest) = name.strip_prefix("area_") {
            self.area_tool(rest, args).await
        } else if let Some(rest) = name.strip_prefix("character_") {
            self.character_tool(rest, args).await
        } else if let Some(rest) = name.strip_prefix("item_") {
            self.item_tool(rest, args).await
        } else {
            Err(WcpError::Validation(format!("unknown tool: {name}")))
        }
    }

    async fn world_tool(&self, name: &str, args: &Value) -> Result<Value, WcpError> {
        let pool = self.kernel.db().pool();
        match name {
            "list" => {
                let worlds = world_store::list(pool).await?;
                Ok(json!({ "worlds": worlds }))
            }
            "get" => {
                let id = WorldId::new(require_i64(args, "world_id")?);
                let world = world_store::fetch(pool, id)
                    .await?
                    .ok_or(KernelError::NotFound {
                        entity: "world",
                        id: id.into_inner(),
                    })?;
                Ok(json!({ "world": world }))
            }
            "create" => {
                let name = require_str(args, "name")?;
                let description = optional_str(args, "description").unwrap_or_default();
                let id = self.kernel.create_world(name, &description).await?;
                Ok(json!({ "world_id": id }))
            }
            "delete" => {
                let id = WorldId::new(require_i64(args, "world_id")?);
                if !self.kernel.delete_world(id).await? {
                    return Err(KernelError::NotFound {
                        entity: "world",
                        id: id.into_inner(),
                    }
                    .into());
                }
                Ok(json!({ "deleted": true }))
            }
            "get_writing_style" => {
                let id = WorldId::new(require_i64(args, "world_id")?);
                let style = style_store::fetch_for_world(pool, id)
                    .await?
                    .ok_or(KernelError::NotFound {
                        entity: "writing_style",
                        id: id.into_inner(),
                    })?;
                Ok(json!({ "writing_style": style }))
            }
            other => Err(WcpError::Validation(format!("unknown tool: world_{other}"))),
        }
    }

    async fn area_tool(&self, name: &str, args: &Value) -> Result<Value, WcpError> {
        let pool = self.kernel.db().pool();
        match name {
            "list" => {
                let world_id = WorldId::new(require_i64(args, "world_id")?);
                let areas = area_store::list_for_world(pool, world_id).await?;
                Ok(json!({ "areas": areas }))
            }
            "get" => {
                let id = AreaId::new(require_i64(args, "area_id")?);
                let area = area_store::fetch(pool, id)
                    .await?
                    .ok_or(KernelError::NotFound {
                        entity: "area",
                        id: id.into_inner(),
                    })?;
                let characters = character_store::list_in_area(pool, id).await?;
                let items = item_store::list_in_area(pool, id).await?;
                Ok(json!({ "area": area, "characters": characters, "items": items }))
            }
            "get_characters" => {
                let id = AreaId::new(require_i64(args, "area_id")?);
                let characters = character_store::list_in_area(pool, id).await?;
                Ok(json!({ "characters": characters }))
            }
            "get_items" => {
                let id = AreaId::new(require_i64(args, "area_id")?);
                let items = item_store::list_in_area(pool, id).await?;
                Ok(json!({ "items": items }))
            }
            "create" => {
                let world_id = WorldId::new(require_i64(args, "world_id")?);
                let name = require_str(args, "name")?;
                let description = optional_str(args, "description").unwrap_or_default();
                let temperature = optional_f64(args, "temperature")?.unwrap_or(20.0);
                let exits: BTreeMap<String, AreaId> = match args.get("exits") {
                    Some(value) if !value.is_null() => serde_json::from_value(value.clone())
                        .map_err(|e| {
                            WcpError::Validation(format!("invalid exits map: {e}"))
                        })?,
                    _ => BTreeMap::new(),
                };
                let id = self
                    .kernel
                    .create_area(world_id, name, &description, temperature, &exits)
                    .await?;
                Ok(json!({ "area_id": id }))
            }
            other => Err(WcpError::Validation(format!("unknown tool: area_{other}"))),
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn character_tool(&self, name: &str, args: &Value) -> Result<Value, WcpError> {
        let pool = self.kernel.db().pool();
        match name {
            "get" => {
                let id = CharacterId::new(require_i64(args, "character_id")?);
                let character = character_store::fetch(pool, id)
                    .await?
                    .ok_or(KernelError::NotFound {
                        entity: "character",
                        id: id.into_inner(),
                    })?;
                let inventory = item_store::list_held_by(pool, id).await?;
                Ok(json!({ "character": character, "inventory": inventory }))
            }
            "create" => {
                let class_raw = optional_str(args, "character_class");
                let character_class = match class_raw.as_deref() {
                    Some(raw) => CharacterClass::parse(raw).ok_or_else(|| {
                        WcpError::Validation(format!("unknown character_class: {raw}"))
                    })?,
                    None => CharacterClass::Minor,
                };
                let age = optional_i64(args, "age")?.unwrap_or(0);
                let new = NewCharacter {
                    world_id: WorldId::new(require_i64(args, "world_id")?),
                    name: require_str(args, "name")?.to_owned(),
                    species: optional_str(args, "species")
                        .unwrap_or_else(|| "human".to_owned()),
                    gender: optional_str(args, "gender").unwrap_or_default(),
                    age: u32::try_from(age)
                        .map_err(|_| WcpError::Validation("age must be >= 0".to_owned()))?,
                    description: optional_str(args, "description").unwrap_or_default(),
                    backstory: optional_str(args, "backstory").unwrap_or_default(),
                    character_class,
                    area_id: optional_i64(args, "area_id")?.map(AreaId::new),
                };
                let id = self.kernel.create_character(&new).await?;
                Ok(json!({ "character_id": id }))
            }
            "delete" => {
                let id = CharacterId::new(require_i64(args, "character_id")?);
                self.sessions.release(id).await?;
                if !self.kernel.delete_character(id).await? {
                    return Err(KernelError::NotFound {
                        entity: "character",
                        id: id.into_inner(),
                    }
                    .into());
                }
                Ok(json!({ "deleted": true }))
            }
            "list_awake" => {
                let world_id = WorldId::new(require_i64(args, "world_id")?);
                let characters = character_store::list_awake(pool, world_id).await?;
                Ok(json!({ "characters": characters }))
            }
            "move" => {
                let character_id = CharacterId::new(require_i64(args, "character_id")?);
                let area_id = AreaId::new(require_i64(args, "area_id")?);
                self.kernel.move_character(character_id, area_id).await?;
                Ok(json!({ "moved": true, "area_id": area_id }))
            }
            "speak" => {
                let character_id = CharacterId::new(require_i64(args, "character_id")?);
                let text = require_str(args, "text")?;
                let kind_raw = require_str(args, "action_type")?;
                let kind = SpeakKind::parse(kind_raw).ok_or_else(|| {
                    WcpError::Validation(format!("unknown action_type: {kind_raw}"))
                })?;
                self.kernel.speak(character_id, text, kind).await?;
                Ok(json!({ "spoken": true }))
            }
            "update_state" => {
                let character_id = CharacterId::new(require_i64(args, "character_id")?);
                let damage = match args.get("damage") {
                    Some(value) if !value.is_null() => Some(
                        serde_json::from_value(value.clone()).map_err(|e| {
                            WcpError::Validation(format!("invalid damage list: {e}"))
                        })?,
                    ),
                    _ => None,
                };
                let update = StateUpdate {
                    nutrition: optional_f64(args, "nutrition")?,
                    hydration: optional_f64(args, "hydration")?,
                    tiredness: optional_f64(args, "tiredness")?,
                    alertness: optional_f64(args, "alertness")?,
                    damage,
                };
                self.kernel.update_state(character_id, &update).await?;
                let character = character_store::fetch(pool, character_id)
                    .await?
                    .ok_or(KernelError::NotFound {
                        entity: "character",
                        id: character_id.into_inner(),
                    })?;
                Ok(json!({ "character": character }))
            }
            "get_inventory" => {
                let id = CharacterId::new(require_i64(args, "character_id")?);
                let items = item_store::list_held_by(pool, id).await?;
                Ok(json!({ "items": items }))
            }
            "add_memory" => {
                let id = CharacterId::new(require_i64(args, "character_id")?);
                let action = require_str(args, "action")?;
                let result = require_str(args, "result")?;
                self.kernel.append_memory(id, action, result).await?;
                Ok(json!({ "added": true }))
            }
            "claim" => {
                let player_id = require_str(args, "player_id")?;
                let character_id = CharacterId::new(require_i64(args, "character_id")?);
                let session = self.sessions.claim(player_id, character_id).await?;
                Ok(json!({ "token": session.token, "character_id": session.character_id }))
            }
            "release" => {
                let id = CharacterId::new(require_i64(args, "character_id")?);
                self.sessions.release(id).await?;
                Ok(json!({ "released": true }))
            }
            other => Err(WcpError::Validation(format!(
                "unknown tool: character_{other}"
            ))),
        }
    }

    async fn item_tool(&self, name: &str, args: &Value) -> Result<Value, WcpError> {
        let pool = self.kernel.db().pool();
        match name {
            "get" => {
                let id = ItemId::new(require_i64(args, "item_id")?);
                let item = item_store::fetch(pool, id)
                    .await?
                    .ok_or(KernelError::NotFound {
                        entity: "item",
                        id: id.into_inner(),
                    })?;
                Ok(json!({ "item": item }))
            }
            "create" => {
                let world_id = WorldId::new(require_i64(args, "world_id")?);
                let name = require_str(args, "name")?;
                let description = optional_str(args, "description").unwrap_or_default();
                let properties: BTreeMap<String, Value> = match args.get("properties") {
                    Some(value) if !value.is_null() => serde_json::from_value(value.clone())
                        .map_err(|e| {
                            WcpError::Validation(format!("invalid properties map: {e}"))
                        })?,
                    _ => BTreeMap::new(),
                };
                let area_id = optional_i64(args, "area_id")?.map(AreaId::new);
                let id = self
                    .kernel
                    .create_item(world_id, name, &description, &properties, area_id)
                    .await?;
                Ok(json!({ "item_id": id }))
            }
            "pickup" => {
                let character_id = CharacterId::new(require_i64(args, "character_id")?);
                let item_id = ItemId::new(require_i64(args, "item_id")?);
                // With no slot named, the kernel picks a free hand and
                // surfaces BothHandsFull when neither is.
                match optional_str(args, "location") {
                    Some(location) => {
                        self.kernel.pickup(character_id, item_id, &location).await?;
                    }
                    None => {
                        self.kernel.pickup_auto(character_id, item_id).await?;
                    }
                }
                Ok(json!({ "picked_up": true }))
            }
            "drop" => {
                let character_id = CharacterId::new(require_i64(args, "character_id")?);
                let item_id = ItemId::new(require_i64(args, "item_id")?);
                self.kernel.drop(character_id, item_id).await?;
                Ok(json!({ "dropped": true }))
            }
            other => Err(WcpError::Validation(format!("unknown tool: item_{other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter helpers
// ---------------------------------------------------------------------------

fn require_i64(args: &Value, key: &str) -> Result<i64, WcpError> {
    args.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| WcpError::Validation(format!("missing or non-integer '{key}'")))
}

fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, WcpError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| WcpError::Validation(format!("missing or non-string '{key}'")))
}

fn optional_str(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

fn optional_i64(args: &Value, key: &str) -> Result<Option<i64>, WcpError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| WcpError::Validation(format!("'{key}' must be an integer"))),
    }
}

fn optional_f64(args: &Value, key: &str) -> Result<Option<f64>, WcpError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| WcpError::Validation(format!("'{key}' must be a number"))),
    }
}
