use serde::Serialize;
use sqlx::PgPool;

use crate::errors::ApiError;

// Derived remaining capacity: dome grid size minus committed tickets.
// Recomputed on every read; a best-effort snapshot under concurrent writes.
pub async fn available_seats(pool: &PgPool, session_id: i64) -> Result<i64, ApiError> {
    let available: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT d."rows"::bigint * d.seats_in_row::bigint - COUNT(t.id)
        FROM show_sessions s
        JOIN planetarium_domes d ON d.id = s.dome_id
        LEFT JOIN tickets t ON t.session_id = s.id
        WHERE s.id = $1
        GROUP BY d."rows", d.seats_in_row
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    available.ok_or(ApiError::NotFound("show session"))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SeatCoordinate {
    pub row: i32,
    pub seat: i32,
}

pub async fn taken_places(pool: &PgPool, session_id: i64) -> Result<Vec<SeatCoordinate>, ApiError> {
    sqlx::query_as(
        r#"SELECT "row", seat FROM tickets WHERE session_id = $1 ORDER BY "row", seat"#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}
