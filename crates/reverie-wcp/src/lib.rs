//! World Control Protocol: the RPC surface of the Reverie simulator.
//!
//! A catalogue of named tools over JSON-RPC 2.0-shaped envelopes, served
//! on two interchangeable transports: newline-delimited stdio for local
//! automation and a websocket endpoint for remote clients. Remote callers
//! must hold a controlling session for character-mutating tools.
//!
//! # Modules
//!
//! - [`protocol`] -- Envelopes, protocol codes, tool result shapes
//! - [`catalogue`] -- The tool inventory with parameter schemas
//! - [`dispatch`] -- Envelope handling, authorization, tool handlers
//! - [`stdio`] / [`ws`] -- The two transports
//! - [`error`] -- Application error codes

pub mod catalogue;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod stdio;
pub mod ws;

pub use catalogue::{ToolDef, catalogue};
pub use dispatch::WcpServer;
pub use error::{WcpError, codes};
pub use protocol::{Request, Response};
pub use stdio::run_stdio;
pub use ws::{TransportError, run_websocket};
