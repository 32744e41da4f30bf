//! Session and ownership layer for the Reverie simulator.
//!
//! Single-owner claims over characters, bearer-token sessions with a
//! 24-hour lifetime, and an hourly expiry sweep. The map is process-local
//! by design; see `SessionStore` for the scaling caveat.
//!
//! # Modules
//!
//! - [`store`] -- The pure in-memory token map and expiry rules
//! - [`manager`] -- Claim/validate/release over the map plus ownership
//!   writes to the character table

pub mod manager;
pub mod store;

pub use manager::{SessionError, SessionManager};
pub use store::{SESSION_TTL_HOURS, Session, SessionStore, generate_token};
