//! The in-memory session map.
//!
//! Pure bookkeeping over `token -> Session`, with no database coupling so
//! the expiry and lookup rules are testable in isolation. Sessions live in
//! process memory only; horizontal scaling would require externalising
//! this map.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use reverie_types::CharacterId;
use serde::Serialize;

/// Sessions expire this long after creation, regardless of activity.
pub const SESSION_TTL_HOURS: i64 = 24;

/// A live player session bound to one character.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Opaque bearer token (128 bits, hex).
    pub token: String,
    /// The owning player.
    pub player_id: String,
    /// The controlled character.
    pub character_id: CharacterId,
    /// Creation time; the 24-hour lifetime counts from here.
    pub created_at: DateTime<Utc>,
    /// Last successful validation.
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Whether the session has outlived its 24-hour window at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::hours(SESSION_TTL_HOURS)
    }
}

/// Generate an unguessable session token: 16 bytes of OS randomness,
/// hex-encoded (128 bits).
pub fn generate_token() -> String {
    use std::fmt::Write as _;

    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut token = String::with_capacity(32);
    for byte in bytes {
        let _ = write!(token, "{byte:02x}");
    }
    token
}

/// The token-keyed session map.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions (including not-yet-swept expired ones).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Insert a freshly created session.
    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.token.clone(), session);
    }

    /// Find the live session a player already holds for a character.
    /// Used to make `claim` idempotent.
    pub fn find(
        &self,
        player_id: &str,
        character_id: CharacterId,
        now: DateTime<Utc>,
    ) -> Option<Session> {
        self.sessions
            .values()
            .find(|session| {
                session.player_id == player_id
                    && session.character_id == character_id
                    && !session.is_expired(now)
            })
            .cloned()
    }

    /// Validate a token at `now`: returns the session and touches
    /// `last_activity` if it is live, deletes it if it has expired.
    pub fn validate(&mut self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        let expired = match self.sessions.get_mut(token) {
            Some(session) if !session.is_expired(now) => {
                session.last_activity = now;
                return Some(session.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions.remove(token);
        }
        None
    }

    /// Remove every session bound to a character. Returns how many were
    /// dropped.
    pub fn remove_for_character(&mut self, character_id: CharacterId) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.character_id != character_id);
        before.saturating_sub(self.sessions.len())
    }

    /// Drop every expired session. Returns how many were dropped.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        before.saturating_sub(self.sessions.len())
    }
}
