//! Typed reads and writes for the `worlds` table.

use reverie_types::{World, WorldId};
use sqlx::Row;
use sqlx::postgres::PgExecutor;

use crate::error::DbError;

/// Fetch a world by id.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the query fails.
pub async fn fetch(
    executor: impl PgExecutor<'_>,
    id: WorldId,
) -> Result<Option<World>, DbError> {
    let row = sqlx::query("SELECT id, name, description FROM worlds WHERE id = $1")
        .bind(id.into_inner())
        .fetch_optional(executor)
        .await?;

    row.map(|r| {
        Ok(World {
            id: WorldId::new(r.try_get("id")?),
            name: r.try_get("name")?,
            description: r.try_get("description")?,
        })
    })
    .transpose()
}

/// List every world, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the query fails.
pub async fn list(executor: impl PgExecutor<'_>) -> Result<Vec<World>, DbError> {
    let rows = sqlx::query("SELECT id, name, description FROM worlds ORDER BY id")
        .fetch_all(executor)
        .await?;

    rows.into_iter()
        .map(|r| {
            Ok(World {
                id: WorldId::new(r.try_get("id")?),
                name: r.try_get("name")?,
                description: r.try_get("description")?,
            })
        })
        .collect()
}

/// Insert a new world and return its assigned id.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the insert fails.
pub async fn insert(
    executor: impl PgExecutor<'_>,
    name: &str,
    description: &str,
) -> Result<WorldId, DbError> {
    let row = sqlx::query("INSERT INTO worlds (name, description) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await?;

    Ok(WorldId::new(row.try_get("id")?))
}

/// Delete a world. Areas, characters, items, styles, and series cascade.
///
/// Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the delete fails.
pub async fn delete(executor: impl PgExecutor<'_>, id: WorldId) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM worlds WHERE id = $1")
        .bind(id.into_inner())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
