//! Reversible schema migrations.
//!
//! Each migration is a named pair of SQL scripts. Applied migrations are
//! recorded in a `migrations` table `(id, name UNIQUE, executed_at)`;
//! [`rollback_last`] runs the most recent record's down script and deletes
//! the row. The runner is hand-rolled rather than `sqlx::migrate!` because
//! rollback support and the bookkeeping table shape are part of the
//! persistence contract.

use sqlx::Row;

use crate::error::DbError;
use crate::postgres::PostgresPool;

/// A single reversible migration.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Unique migration name, recorded in the `migrations` table.
    pub name: &'static str,
    /// Forward SQL, may contain multiple statements.
    pub up: &'static str,
    /// Reverse SQL undoing everything `up` created.
    pub down: &'static str,
}

/// The ordered migration set for the Reverie schema.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "0001_core_tables",
        up: r"
CREATE TABLE worlds (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE writing_styles (
    id BIGSERIAL PRIMARY KEY,
    world_id BIGINT NOT NULL REFERENCES worlds(id) ON DELETE CASCADE,
    tone TEXT NOT NULL DEFAULT '',
    pacing TEXT NOT NULL DEFAULT '',
    themes JSONB NOT NULL DEFAULT '[]',
    example_passage TEXT NOT NULL DEFAULT ''
);
CREATE INDEX idx_writing_styles_world ON writing_styles(world_id);

CREATE TABLE areas (
    id BIGSERIAL PRIMARY KEY,
    world_id BIGINT NOT NULL REFERENCES worlds(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    temperature DOUBLE PRECISION NOT NULL DEFAULT 20.0,
    exits JSONB NOT NULL DEFAULT '{}',
    triggers JSONB NOT NULL DEFAULT '[]'
);
CREATE INDEX idx_areas_world ON areas(world_id);

CREATE TABLE characters (
    id BIGSERIAL PRIMARY KEY,
    world_id BIGINT NOT NULL REFERENCES worlds(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    species TEXT NOT NULL DEFAULT 'human',
    gender TEXT NOT NULL DEFAULT '',
    age INTEGER NOT NULL DEFAULT 0,
    description TEXT NOT NULL DEFAULT '',
    backstory TEXT NOT NULL DEFAULT '',
    likes JSONB NOT NULL DEFAULT '[]',
    dislikes JSONB NOT NULL DEFAULT '[]',
    interests JSONB NOT NULL DEFAULT '[]',
    beliefs JSONB NOT NULL DEFAULT '[]',
    internal_conflict TEXT NOT NULL DEFAULT '',
    memory JSONB NOT NULL DEFAULT '[]',
    nutrition DOUBLE PRECISION NOT NULL DEFAULT 100
        CHECK (nutrition >= 0 AND nutrition <= 100),
    hydration DOUBLE PRECISION NOT NULL DEFAULT 100
        CHECK (hydration >= 0 AND hydration <= 100),
    tiredness DOUBLE PRECISION NOT NULL DEFAULT 0
        CHECK (tiredness >= 0 AND tiredness <= 100),
    alertness DOUBLE PRECISION NOT NULL DEFAULT 100
        CHECK (alertness >= 0 AND alertness <= 100),
    damage JSONB NOT NULL DEFAULT '[]',
    current_area_id BIGINT REFERENCES areas(id) ON DELETE SET NULL,
    owner_id TEXT,
    character_class TEXT NOT NULL DEFAULT 'minor'
        CHECK (character_class IN ('story', 'minor'))
);
CREATE INDEX idx_characters_world ON characters(world_id);
CREATE INDEX idx_characters_area ON characters(current_area_id);
CREATE INDEX idx_characters_owner ON characters(owner_id);
CREATE INDEX idx_characters_class ON characters(character_class);

CREATE TABLE items (
    id BIGSERIAL PRIMARY KEY,
    world_id BIGINT NOT NULL REFERENCES worlds(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    properties JSONB NOT NULL DEFAULT '{}',
    current_area_id BIGINT REFERENCES areas(id) ON DELETE SET NULL,
    held_by_character_id BIGINT REFERENCES characters(id) ON DELETE SET NULL,
    held_location TEXT
);
CREATE INDEX idx_items_world ON items(world_id);
CREATE INDEX idx_items_area ON items(current_area_id);
CREATE INDEX idx_items_holder ON items(held_by_character_id);
",
        down: r"
DROP TABLE IF EXISTS items;
DROP TABLE IF EXISTS characters;
DROP TABLE IF EXISTS areas;
DROP TABLE IF EXISTS writing_styles;
DROP TABLE IF EXISTS worlds;
",
    },
    Migration {
        name: "0002_narrative_tables",
        up: r"
CREATE TABLE series (
    id BIGSERIAL PRIMARY KEY,
    world_id BIGINT NOT NULL REFERENCES worlds(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    premise TEXT NOT NULL DEFAULT ''
);
CREATE INDEX idx_series_world ON series(world_id);

CREATE TABLE books (
    id BIGSERIAL PRIMARY KEY,
    series_id BIGINT NOT NULL REFERENCES series(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'drafting'
        CHECK (status IN ('drafting', 'revising', 'complete'))
);
CREATE INDEX idx_books_series ON books(series_id);

CREATE TABLE chapters (
    id BIGSERIAL PRIMARY KEY,
    book_id BIGINT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
    number INTEGER NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    raw_events JSONB NOT NULL DEFAULT '[]',
    prose TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'generated', 'revised'))
);
CREATE INDEX idx_chapters_book ON chapters(book_id);
",
        down: r"
DROP TABLE IF EXISTS chapters;
DROP TABLE IF EXISTS books;
DROP TABLE IF EXISTS series;
",
    },
];

/// Apply every pending migration in order. Returns how many were applied.
///
/// Each migration's script and its bookkeeping row commit in one
/// transaction, so a failed migration leaves no partial state.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if a script fails.
pub async fn run_migrations(pool: &PostgresPool) -> Result<u32, DbError> {
    ensure_bookkeeping_table(pool).await?;

    let applied: Vec<String> = sqlx::query("SELECT name FROM migrations ORDER BY id")
        .fetch_all(pool.pool())
        .await?
        .into_iter()
        .filter_map(|row| row.try_get::<String, _>("name").ok())
        .collect();

    let mut count = 0u32;
    for migration in MIGRATIONS {
        if applied.iter().any(|name| name == migration.name) {
            continue;
        }

        let mut tx = pool.pool().begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::Migration(format!("{} failed: {e}", migration.name)))?;
        sqlx::query("INSERT INTO migrations (name) VALUES ($1)")
            .bind(migration.name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(migration = migration.name, "Migration applied");
        count = count.saturating_add(1);
    }

    Ok(count)
}

/// Roll back the most recently applied migration.
///
/// Returns the name of the migration that was reversed, or `None` when
/// nothing is applied.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if the recorded name is unknown to this
/// binary or the down script fails.
pub async fn rollback_last(pool: &PostgresPool) -> Result<Option<String>, DbError> {
    ensure_bookkeeping_table(pool).await?;

    let last: Option<String> =
        sqlx::query("SELECT name FROM migrations ORDER BY id DESC LIMIT 1")
            .fetch_optional(pool.pool())
            .await?
            .and_then(|row| row.try_get("name").ok());

    let Some(name) = last else {
        return Ok(None);
    };

    let migration = MIGRATIONS
        .iter()
        .find(|m| m.name == name)
        .ok_or_else(|| DbError::Migration(format!("unknown applied migration: {name}")))?;

    let mut tx = pool.pool().begin().await?;
    sqlx::raw_sql(migration.down)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::Migration(format!("{name} rollback failed: {e}")))?;
    sqlx::query("DELETE FROM migrations WHERE name = $1")
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(migration = name, "Migration rolled back");
    Ok(Some(name))
}

/// Create the `migrations` bookkeeping table if absent.
async fn ensure_bookkeeping_table(pool: &PostgresPool) -> Result<(), DbError> {
    sqlx::raw_sql(
        r"CREATE TABLE IF NOT EXISTS migrations (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            executed_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool.pool())
    .await?;
    Ok(())
}
