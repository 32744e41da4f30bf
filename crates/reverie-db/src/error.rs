//! Error types for the persistence layer.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A JSON column could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration (bad env var, unparsable value).
    #[error("configuration error: {0}")]
    Config(String),

    /// A migration failed to apply or roll back.
    #[error("migration error: {0}")]
    Migration(String),

    /// A stored value violated the schema contract (e.g. an unknown
    /// `character_class`). Should be unreachable with CHECK constraints
    /// in place.
    #[error("decode error: {context}")]
    Decode {
        /// What was being decoded.
        context: String,
    },
}
