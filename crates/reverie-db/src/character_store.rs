//! Typed reads and writes for the `characters` table.
//!
//! The psychological lists, memory tail, and damage records are JSONB
//! columns decoded into their domain representations on read. Writers are
//! granular (area, vitals, memory, owner) so kernel mutators touch only
//! the columns they own.

use reverie_types::{
    AWAKE_THRESHOLD, AreaId, Character, CharacterClass, CharacterId, DamageEntry, MemoryEntry,
    WorldId,
};
use sqlx::Row;
use sqlx::postgres::{PgExecutor, PgRow};

use crate::error::DbError;

const COLUMNS: &str = "id, world_id, name, species, gender, age, description, backstory, \
     likes, dislikes, interests, beliefs, internal_conflict, memory, \
     nutrition, hydration, tiredness, alertness, damage, \
     current_area_id, owner_id, character_class";

/// Field set for creating a character. Identity fields are required;
/// everything else starts at sensible defaults (full vitals, empty memory).
#[derive(Debug, Clone)]
pub struct NewCharacter {
    /// Owning world.
    pub world_id: WorldId,
    /// Display name.
    pub name: String,
    /// Species, free text.
    pub species: String,
    /// Gender, free text.
    pub gender: String,
    /// Age in years.
    pub age: u32,
    /// Physical description.
    pub description: String,
    /// Backstory.
    pub backstory: String,
    /// Narrative weight.
    pub character_class: CharacterClass,
    /// Starting area, if any.
    pub area_id: Option<AreaId>,
}

fn from_row(row: &PgRow) -> Result<Character, DbError> {
    let class_raw: String = row.try_get("character_class")?;
    let character_class = CharacterClass::parse(&class_raw).ok_or_else(|| DbError::Decode {
        context: format!("character_class '{class_raw}'"),
    })?;

    let age: i32 = row.try_get("age")?;

    Ok(Character {
        id: CharacterId::new(row.try_get("id")?),
        world_id: WorldId::new(row.try_get("world_id")?),
        name: row.try_get("name")?,
        species: row.try_get("species")?,
        gender: row.try_get("gender")?,
        age: u32::try_from(age).unwrap_or(0),
        description: row.try_get("description")?,
        backstory: row.try_get("backstory")?,
        likes: serde_json::from_value(row.try_get("likes")?)?,
        dislikes: serde_json::from_value(row.try_get("dislikes")?)?,
        interests: serde_json::from_value(row.try_get("interests")?)?,
        beliefs: serde_json::from_value(row.try_get("beliefs")?)?,
        internal_conflict: row.try_get("internal_conflict")?,
        memory: serde_json::from_value(row.try_get("memory")?)?,
        nutrition: row.try_get("nutrition")?,
        hydration: row.try_get("hydration")?,
        tiredness: row.try_get("tiredness")?,
        alertness: row.try_get("alertness")?,
        damage: serde_json::from_value(row.try_get("damage")?)?,
        current_area_id: row
            .try_get::<Option<i64>, _>("current_area_id")?
            .map(AreaId::new),
        owner_id: row.try_get("owner_id")?,
        character_class,
    })
}

/// Fetch a character by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query or JSON decode fails.
pub async fn fetch(
    executor: impl PgExecutor<'_>,
    id: CharacterId,
) -> Result<Option<Character>, DbError> {
    let sql = format!("SELECT {COLUMNS} FROM characters WHERE id = $1");
    let row = sqlx::query(&sql)
        .bind(id.into_inner())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// List the characters standing in an area, ordered by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query or JSON decode fails.
pub async fn list_in_area(
    executor: impl PgExecutor<'_>,
    area_id: AreaId,
) -> Result<Vec<Character>, DbError> {
    let sql = format!("SELECT {COLUMNS} FROM characters WHERE current_area_id = $1 ORDER BY id");
    let rows = sqlx::query(&sql)
        .bind(area_id.into_inner())
        .fetch_all(executor)
        .await?;
    rows.iter().map(from_row).collect()
}

/// List every awake character of a world (`alertness >= 20`).
///
/// # Errors
///
/// Returns [`DbError`] if the query or JSON decode fails.
pub async fn list_awake(
    executor: impl PgExecutor<'_>,
    world_id: WorldId,
) -> Result<Vec<Character>, DbError> {
    let sql = format!(
        "SELECT {COLUMNS} FROM characters WHERE world_id = $1 AND alertness >= $2 ORDER BY id"
    );
    let rows = sqlx::query(&sql)
        .bind(world_id.into_inner())
        .bind(AWAKE_THRESHOLD)
        .fetch_all(executor)
        .await?;
    rows.iter().map(from_row).collect()
}

/// List the characters the scheduler may drive this cycle: unowned and
/// awake, story characters first, then ascending id (deterministic).
///
/// # Errors
///
/// Returns [`DbError`] if the query or JSON decode fails.
pub async fn list_eligible(
    executor: impl PgExecutor<'_>,
    world_id: WorldId,
) -> Result<Vec<Character>, DbError> {
    let sql = format!(
        "SELECT {COLUMNS} FROM characters \
         WHERE world_id = $1 AND owner_id IS NULL AND alertness >= $2 \
         ORDER BY character_class DESC, id ASC"
    );
    let rows = sqlx::query(&sql)
        .bind(world_id.into_inner())
        .bind(AWAKE_THRESHOLD)
        .fetch_all(executor)
        .await?;
    rows.iter().map(from_row).collect()
}

/// Insert a new character and return its assigned id.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the insert fails.
pub async fn insert(
    executor: impl PgExecutor<'_>,
    new: &NewCharacter,
) -> Result<CharacterId, DbError> {
    let row = sqlx::query(
        "INSERT INTO characters \
         (world_id, name, species, gender, age, description, backstory, \
          character_class, current_area_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
    )
    .bind(new.world_id.into_inner())
    .bind(&new.name)
    .bind(&new.species)
    .bind(&new.gender)
    .bind(i32::try_from(new.age).unwrap_or(i32::MAX))
    .bind(&new.description)
    .bind(&new.backstory)
    .bind(new.character_class.as_str())
    .bind(new.area_id.map(AreaId::into_inner))
    .fetch_one(executor)
    .await?;

    Ok(CharacterId::new(row.try_get("id")?))
}

/// Move a character to an area (or clear the area with `None`).
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the update fails.
pub async fn update_area(
    executor: impl PgExecutor<'_>,
    id: CharacterId,
    area_id: Option<AreaId>,
) -> Result<(), DbError> {
    sqlx::query("UPDATE characters SET current_area_id = $2 WHERE id = $1")
        .bind(id.into_inner())
        .bind(area_id.map(AreaId::into_inner))
        .execute(executor)
        .await?;
    Ok(())
}

/// Overwrite a character's physiology columns in one statement.
///
/// Callers are responsible for clamping and for the forced-sleep rule;
/// this is a plain column write.
///
/// # Errors
///
/// Returns [`DbError`] if the update or JSON encode fails.
pub async fn update_vitals(
    executor: impl PgExecutor<'_>,
    id: CharacterId,
    nutrition: f64,
    hydration: f64,
    tiredness: f64,
    alertness: f64,
    damage: &[DamageEntry],
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE characters \
         SET nutrition = $2, hydration = $3, tiredness = $4, alertness = $5, damage = $6 \
         WHERE id = $1",
    )
    .bind(id.into_inner())
    .bind(nutrition)
    .bind(hydration)
    .bind(tiredness)
    .bind(alertness)
    .bind(serde_json::to_value(damage)?)
    .execute(executor)
    .await?;
    Ok(())
}

/// Overwrite a character's memory tail.
///
/// # Errors
///
/// Returns [`DbError`] if the update or JSON encode fails.
pub async fn update_memory(
    executor: impl PgExecutor<'_>,
    id: CharacterId,
    memory: &[MemoryEntry],
) -> Result<(), DbError> {
    sqlx::query("UPDATE characters SET memory = $2 WHERE id = $1")
        .bind(id.into_inner())
        .bind(serde_json::to_value(memory)?)
        .execute(executor)
        .await?;
    Ok(())
}

/// Set or clear a character's owning player.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the update fails.
pub async fn update_owner(
    executor: impl PgExecutor<'_>,
    id: CharacterId,
    owner_id: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query("UPDATE characters SET owner_id = $2 WHERE id = $1")
        .bind(id.into_inner())
        .bind(owner_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Delete a character. Held items fall back to no holder via the
/// `ON DELETE SET NULL` contract.
///
/// Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the delete fails.
pub async fn delete(executor: impl PgExecutor<'_>, id: CharacterId) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM characters WHERE id = $1")
        .bind(id.into_inner())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
