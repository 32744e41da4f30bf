//! Session manager: claims, ownership, and the expiry sweep.
//!
//! Couples the in-memory [`SessionStore`] with the character table so the
//! ownership invariant holds: a character has at most one live session,
//! and its `owner_id` equals that session's player. The map lives behind
//! a single mutex; critical sections never span an await on the database.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reverie_db::{DbError, PostgresPool, character_store};
use reverie_types::CharacterId;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::store::{Session, SessionStore, generate_token};

/// Cadence of the background expiry sweep.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Errors from session and ownership operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The character id did not resolve.
    #[error("character not found: {character}")]
    NotFound {
        /// The missing character.
        character: CharacterId,
    },

    /// Another player already owns the character.
    #[error("character {character} is already owned")]
    AlreadyOwned {
        /// The contested character.
        character: CharacterId,
    },

    /// The persistence layer failed.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Claim/validate/release surface over the session map.
pub struct SessionManager {
    db: PostgresPool,
    store: Mutex<SessionStore>,
}

impl SessionManager {
    /// Create a manager over a connected pool.
    pub fn new(db: PostgresPool) -> Self {
        Self {
            db,
            store: Mutex::new(SessionStore::new()),
        }
    }

    /// Claim a character for a player, creating (or re-returning) a
    /// session. Idempotent for the same player: a repeat claim returns the
    /// existing live session.
    ///
    /// # Errors
    ///
    /// `NotFound` if the character is absent; `AlreadyOwned` if a
    /// different player holds it.
    pub async fn claim(
        &self,
        player_id: &str,
        character_id: CharacterId,
    ) -> Result<Session, SessionError> {
        let character = character_store::fetch(self.db.pool(), character_id)
            .await?
            .ok_or(SessionError::NotFound {
                character: character_id,
            })?;

        if let Some(owner) = &character.owner_id
            && owner != player_id
        {
            return Err(SessionError::AlreadyOwned {
                character: character_id,
            });
        }

        if character.owner_id.is_none() {
            character_store::update_owner(self.db.pool(), character_id, Some(player_id)).await?;
        }

        let now = Utc::now();
        let mut store = self.store.lock().await;
        if let Some(existing) = store.find(player_id, character_id, now) {
            return Ok(existing);
        }

        let session = Session {
            token: generate_token(),
            player_id: player_id.to_owned(),
            character_id,
            created_at: now,
            last_activity: now,
        };
        store.insert(session.clone());
        drop(store);

        tracing::info!(
            character_id = %character_id,
            player_id,
            "character claimed"
        );
        Ok(session)
    }

    /// Validate a token: returns the session if live (touching
    /// `last_activity`), deletes it if expired.
    pub async fn validate(&self, token: &str) -> Option<Session> {
        self.store.lock().await.validate(token, Utc::now())
    }

    /// Release a character: clear its owner and drop all its sessions.
    ///
    /// # Errors
    ///
    /// Database failures only; releasing an unowned or unknown character
    /// is a no-op.
    pub async fn release(&self, character_id: CharacterId) -> Result<(), SessionError> {
        character_store::update_owner(self.db.pool(), character_id, None).await?;
        let dropped = self
            .store
            .lock()
            .await
            .remove_for_character(character_id);
        tracing::info!(
            character_id = %character_id,
            sessions_dropped = dropped,
            "character released"
        );
        Ok(())
    }

    /// Whether `player_id` currently owns the character.
    ///
    /// # Errors
    ///
    /// Database failures only; an unknown character is simply not
    /// controllable.
    pub async fn can_control(
        &self,
        player_id: &str,
        character_id: CharacterId,
    ) -> Result<bool, SessionError> {
        let character = character_store::fetch(self.db.pool(), character_id).await?;
        Ok(character
            .and_then(|c| c.owner_id)
            .is_some_and(|owner| owner == player_id))
    }

    /// Drop expired sessions once. Returns how many were dropped.
    pub async fn sweep(&self) -> usize {
        let dropped = self.store.lock().await.sweep(Utc::now());
        if dropped > 0 {
            tracing::info!(dropped, "expired sessions swept");
        }
        dropped
    }

    /// Spawn the hourly background sweep task.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            // The first tick fires immediately; skip it so startup does
            // not log an empty sweep.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.sweep().await;
            }
        })
    }
}
