use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

// One claimed seat coordinate within one session. The
// (session_id, row, seat) tuple is unique across the table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub session_id: i64,
    pub reservation_id: i64,
    pub row: i32,
    pub seat: i32,
}
