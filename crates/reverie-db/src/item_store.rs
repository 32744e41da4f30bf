//! Typed reads and writes for the `items` table.
//!
//! The location invariant (area XOR holder) is maintained by writing both
//! sides in a single statement: `set_held` clears the area, `set_area`
//! clears the hold fields.

use std::collections::BTreeMap;

use reverie_types::{AreaId, CharacterId, Item, ItemId, WorldId};
use sqlx::Row;
use sqlx::postgres::{PgExecutor, PgRow};

use crate::error::DbError;

const COLUMNS: &str =
    "id, world_id, name, description, properties, current_area_id, held_by_character_id, \
     held_location";

fn from_row(row: &PgRow) -> Result<Item, DbError> {
    Ok(Item {
        id: ItemId::new(row.try_get("id")?),
        world_id: WorldId::new(row.try_get("world_id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        properties: serde_json::from_value(row.try_get("properties")?)?,
        current_area_id: row
            .try_get::<Option<i64>, _>("current_area_id")?
            .map(AreaId::new),
        held_by_character_id: row
            .try_get::<Option<i64>, _>("held_by_character_id")?
            .map(CharacterId::new),
        held_location: row.try_get("held_location")?,
    })
}

/// Fetch an item by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query or JSON decode fails.
pub async fn fetch(executor: impl PgExecutor<'_>, id: ItemId) -> Result<Option<Item>, DbError> {
    let sql = format!("SELECT {COLUMNS} FROM items WHERE id = $1");
    let row = sqlx::query(&sql)
        .bind(id.into_inner())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// List the items lying in an area, ordered by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query or JSON decode fails.
pub async fn list_in_area(
    executor: impl PgExecutor<'_>,
    area_id: AreaId,
) -> Result<Vec<Item>, DbError> {
    let sql = format!("SELECT {COLUMNS} FROM items WHERE current_area_id = $1 ORDER BY id");
    let rows = sqlx::query(&sql)
        .bind(area_id.into_inner())
        .fetch_all(executor)
        .await?;
    rows.iter().map(from_row).collect()
}

/// List the items a character is holding, ordered by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query or JSON decode fails.
pub async fn list_held_by(
    executor: impl PgExecutor<'_>,
    character_id: CharacterId,
) -> Result<Vec<Item>, DbError> {
    let sql = format!("SELECT {COLUMNS} FROM items WHERE held_by_character_id = $1 ORDER BY id");
    let rows = sqlx::query(&sql)
        .bind(character_id.into_inner())
        .fetch_all(executor)
        .await?;
    rows.iter().map(from_row).collect()
}

/// Insert a new item and return its assigned id.
///
/// # Errors
///
/// Returns [`DbError`] if the insert or JSON encode fails.
pub async fn insert(
    executor: impl PgExecutor<'_>,
    world_id: WorldId,
    name: &str,
    description: &str,
    properties: &BTreeMap<String, serde_json::Value>,
    area_id: Option<AreaId>,
) -> Result<ItemId, DbError> {
    let row = sqlx::query(
        "INSERT INTO items (world_id, name, description, properties, current_area_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(world_id.into_inner())
    .bind(name)
    .bind(description)
    .bind(serde_json::to_value(properties)?)
    .bind(area_id.map(AreaId::into_inner))
    .fetch_one(executor)
    .await?;

    Ok(ItemId::new(row.try_get("id")?))
}

/// Move an item into a character's holding slot, clearing its area.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the update fails.
pub async fn set_held(
    executor: impl PgExecutor<'_>,
    id: ItemId,
    character_id: CharacterId,
    location: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE items \
         SET current_area_id = NULL, held_by_character_id = $2, held_location = $3 \
         WHERE id = $1",
    )
    .bind(id.into_inner())
    .bind(character_id.into_inner())
    .bind(location)
    .execute(executor)
    .await?;
    Ok(())
}

/// Put an item on an area's floor, clearing both hold fields.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the update fails.
pub async fn set_area(
    executor: impl PgExecutor<'_>,
    id: ItemId,
    area_id: AreaId,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE items \
         SET current_area_id = $2, held_by_character_id = NULL, held_location = NULL \
         WHERE id = $1",
    )
    .bind(id.into_inner())
    .bind(area_id.into_inner())
    .execute(executor)
    .await?;
    Ok(())
}

/// Delete an item. Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the delete fails.
pub async fn delete(executor: impl PgExecutor<'_>, id: ItemId) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(id.into_inner())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
