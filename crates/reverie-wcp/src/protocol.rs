//! JSON-RPC 2.0-shaped request/response framing.
//!
//! Both transports carry the same envelopes: a request
//! `{id, method, params}` and a response `{id, result}` or
//! `{id, error: {code, message}}`. Protocol-level failures use the
//! standard negative codes; tool handler failures are reported inside the
//! `tools/call` result as `{isError: true, code, content}` so a failed
//! tool call is still a successful RPC exchange.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The envelope was not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;

/// A decoded request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    /// Request id, echoed back in the response. `null` when absent.
    #[serde(default)]
    pub id: Value,
    /// Method name: `initialize`, `tools/list`, or `tools/call`.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

/// The error half of a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Negative protocol code or positive application code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

/// A response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// The request id this answers.
    pub id: Value,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    /// A success response.
    pub const fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// A failure response.
    pub const fn err(id: Value, code: i64, message: String) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorObject { code, message }),
        }
    }

    /// Serialize to the wire string. Serialization of these shapes cannot
    /// fail; a defensive fallback covers the impossible case.
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"id":null,"error":{{"code":{INVALID_REQUEST},"message":"response serialization failed"}}}}"#
            )
        })
    }
}

/// A successful tool invocation result: `{content: <payload>}`.
pub fn tool_content(payload: Value) -> Value {
    serde_json::json!({ "content": payload })
}

/// A failed tool invocation result:
/// `{isError: true, code, content: <message>}`.
pub fn tool_error(code: i64, message: &str) -> Value {
    serde_json::json!({ "isError": true, "code": code, "content": message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_decodes_minimal_envelope() {
        let request: Result<Request, _> =
            serde_json::from_str(r#"{"id": 1, "method": "tools/list"}"#);
        assert!(matches!(
            request,
            Ok(ref r) if r.method == "tools/list" && r.id == serde_json::json!(1)
        ));
    }

    #[test]
    fn request_tolerates_jsonrpc_field() {
        let request: Result<Request, _> = serde_json::from_str(
            r#"{"jsonrpc": "2.0", "id": "a", "method": "initialize", "params": {}}"#,
        );
        assert!(request.is_ok());
    }

    #[test]
    fn response_omits_absent_halves() {
        let ok = Response::ok(serde_json::json!(1), serde_json::json!({"x": 1}));
        let wire = ok.to_wire();
        assert!(wire.contains("\"result\""));
        assert!(!wire.contains("\"error\""));

        let err = Response::err(serde_json::json!(1), METHOD_NOT_FOUND, "nope".to_owned());
        let wire = err.to_wire();
        assert!(wire.contains("\"error\""));
        assert!(!wire.contains("\"result\""));
    }

    #[test]
    fn tool_error_shape() {
        let value = tool_error(1002, "character not found: 7");
        assert_eq!(value["isError"], serde_json::json!(true));
        assert_eq!(value["code"], serde_json::json!(1002));
    }
}
