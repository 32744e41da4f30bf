//! Reads for the `writing_styles` table.
//!
//! Writing styles are authored out-of-band and consumed by the narrator;
//! the core only ever reads them.

use reverie_types::{StyleId, WorldId, WritingStyle};
use sqlx::Row;
use sqlx::postgres::PgExecutor;

use crate::error::DbError;

/// Fetch the writing style configured for a world, if any.
///
/// # Errors
///
/// Returns [`DbError`] if the query or JSON decode fails.
pub async fn fetch_for_world(
    executor: impl PgExecutor<'_>,
    world_id: WorldId,
) -> Result<Option<WritingStyle>, DbError> {
    let row = sqlx::query(
        "SELECT id, world_id, tone, pacing, themes, example_passage \
         FROM writing_styles WHERE world_id = $1 LIMIT 1",
    )
    .bind(world_id.into_inner())
    .fetch_optional(executor)
    .await?;

    row.map(|r| {
        Ok(WritingStyle {
            id: StyleId::new(r.try_get("id")?),
            world_id: WorldId::new(r.try_get("world_id")?),
            tone: r.try_get("tone")?,
            pacing: r.try_get("pacing")?,
            themes: serde_json::from_value(r.try_get("themes")?)?,
            example_passage: r.try_get("example_passage")?,
        })
    })
    .transpose()
}
