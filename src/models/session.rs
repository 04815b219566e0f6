use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ShowSession {
    pub id: i64,
    pub show_id: i64,
    pub dome_id: i64,
    pub show_time: DateTime<Utc>,
}
