//! Typed reads and writes for the `areas` table.
//!
//! `exits` and `triggers` are JSONB columns decoded into their domain
//! representations on every read, so callers never touch raw JSON.

use std::collections::BTreeMap;

use reverie_types::{Area, AreaId, Trigger, WorldId};
use sqlx::Row;
use sqlx::postgres::{PgExecutor, PgRow};

use crate::error::DbError;

const COLUMNS: &str = "id, world_id, name, description, temperature, exits, triggers";

fn from_row(row: &PgRow) -> Result<Area, DbError> {
    let exits: serde_json::Value = row.try_get("exits")?;
    let triggers: serde_json::Value = row.try_get("triggers")?;
    Ok(Area {
        id: AreaId::new(row.try_get("id")?),
        world_id: WorldId::new(row.try_get("world_id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        temperature: row.try_get("temperature")?,
        exits: serde_json::from_value(exits)?,
        triggers: serde_json::from_value(triggers)?,
    })
}

/// Fetch an area by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query or JSON decode fails.
pub async fn fetch(executor: impl PgExecutor<'_>, id: AreaId) -> Result<Option<Area>, DbError> {
    let sql = format!("SELECT {COLUMNS} FROM areas WHERE id = $1");
    let row = sqlx::query(&sql)
        .bind(id.into_inner())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// List the areas of a world, ordered by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query or JSON decode fails.
pub async fn list_for_world(
    executor: impl PgExecutor<'_>,
    world_id: WorldId,
) -> Result<Vec<Area>, DbError> {
    let sql = format!("SELECT {COLUMNS} FROM areas WHERE world_id = $1 ORDER BY id");
    let rows = sqlx::query(&sql)
        .bind(world_id.into_inner())
        .fetch_all(executor)
        .await?;
    rows.iter().map(from_row).collect()
}

/// Insert a new area and return its assigned id.
///
/// # Errors
///
/// Returns [`DbError`] if the insert or JSON encode fails.
pub async fn insert(
    executor: impl PgExecutor<'_>,
    world_id: WorldId,
    name: &str,
    description: &str,
    temperature: f64,
    exits: &BTreeMap<String, AreaId>,
) -> Result<AreaId, DbError> {
    let row = sqlx::query(
        "INSERT INTO areas (world_id, name, description, temperature, exits)
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(world_id.into_inner())
    .bind(name)
    .bind(description)
    .bind(temperature)
    .bind(serde_json::to_value(exits)?)
    .fetch_one(executor)
    .await?;

    Ok(AreaId::new(row.try_get("id")?))
}

/// Overwrite an area's exit map.
///
/// # Errors
///
/// Returns [`DbError`] if the update or JSON encode fails.
pub async fn update_exits(
    executor: impl PgExecutor<'_>,
    id: AreaId,
    exits: &BTreeMap<String, AreaId>,
) -> Result<(), DbError> {
    sqlx::query("UPDATE areas SET exits = $2 WHERE id = $1")
        .bind(id.into_inner())
        .bind(serde_json::to_value(exits)?)
        .execute(executor)
        .await?;
    Ok(())
}

/// Overwrite an area's description.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the update fails.
pub async fn update_description(
    executor: impl PgExecutor<'_>,
    id: AreaId,
    description: &str,
) -> Result<(), DbError> {
    sqlx::query("UPDATE areas SET description = $2 WHERE id = $1")
        .bind(id.into_inner())
        .bind(description)
        .execute(executor)
        .await?;
    Ok(())
}

/// Overwrite an area's temperature.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the update fails.
pub async fn update_temperature(
    executor: impl PgExecutor<'_>,
    id: AreaId,
    temperature: f64,
) -> Result<(), DbError> {
    sqlx::query("UPDATE areas SET temperature = $2 WHERE id = $1")
        .bind(id.into_inner())
        .bind(temperature)
        .execute(executor)
        .await?;
    Ok(())
}

/// Overwrite an area's trigger list.
///
/// # Errors
///
/// Returns [`DbError`] if the update or JSON encode fails.
pub async fn update_triggers(
    executor: impl PgExecutor<'_>,
    id: AreaId,
    triggers: &[Trigger],
) -> Result<(), DbError> {
    sqlx::query("UPDATE areas SET triggers = $2 WHERE id = $1")
        .bind(id.into_inner())
        .bind(serde_json::to_value(triggers)?)
        .execute(executor)
        .await?;
    Ok(())
}
