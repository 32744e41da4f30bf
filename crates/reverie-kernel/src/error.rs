//! Error types for kernel operations.
//!
//! Every mutator either commits or returns one of these; nothing is
//! swallowed and nothing panics. The RPC layer maps each variant to a
//! stable application error code.

use reverie_db::DbError;
use reverie_types::{CharacterId, ItemId};

/// Maximum transaction attempts before surfacing [`KernelError::Conflict`].
pub const MAX_TX_ATTEMPTS: u32 = 3;

/// Errors that can occur during kernel operations.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// An entity id did not resolve.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"character"`.
        entity: &'static str,
        /// The raw id that failed to resolve.
        id: i64,
    },

    /// Two referenced entities live in different worlds.
    #[error("cross-world reference: {context}")]
    CrossWorld {
        /// What was being related across worlds.
        context: String,
    },

    /// The item is not in the character's area.
    #[error("item {item} is not here")]
    NotHere {
        /// The item in question.
        item: ItemId,
    },

    /// The item is not held by the acting character.
    #[error("item {item} is not held by character {character}")]
    NotHolding {
        /// The item in question.
        item: ItemId,
        /// The character that tried to drop it.
        character: CharacterId,
    },

    /// The character has no current area.
    #[error("character {character} is not in any area")]
    NoArea {
        /// The character in question.
        character: CharacterId,
    },

    /// The requested holding slot already carries an item.
    #[error("holding slot '{location}' is occupied")]
    SlotOccupied {
        /// The occupied slot label.
        location: String,
    },

    /// Both hand slots already carry items.
    #[error("character {character} has both hands full")]
    BothHandsFull {
        /// The character whose hands are full.
        character: CharacterId,
    },

    /// A parameter failed validation.
    #[error("validation failed: {message}")]
    Validation {
        /// What was wrong.
        message: String,
    },

    /// The transactional retry budget was exhausted.
    #[error("transaction conflict persisted after {attempts} attempts")]
    Conflict {
        /// How many attempts were made.
        attempts: u32,
    },

    /// The persistence layer failed.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl KernelError {
    /// Whether this error is a transient transaction conflict worth
    /// retrying (`PostgreSQL` serialization failure or deadlock).
    pub fn is_retryable(&self) -> bool {
        let Self::Db(DbError::Postgres(sqlx::Error::Database(db))) = self else {
            return false;
        };
        matches!(db.code().as_deref(), Some("40001" | "40P01"))
    }
}
