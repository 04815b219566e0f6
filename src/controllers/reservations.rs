use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::ApiError;
use crate::middleware::AuthUser;
use crate::services::booking::{self, TicketRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/reservations",
            get(list_reservations).post(create_reservation),
        )
        .route("/reservations/{id}", delete(delete_reservation))
}

#[derive(Debug, Deserialize)]
struct CreateReservationRequest {
    tickets: Vec<TicketRequest>,
}

#[derive(Debug, Serialize)]
struct ReservationTicket {
    id: i64,
    row: i32,
    seat: i32,
    show_session: i64,
    show_title: String,
    show_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ReservationResponse {
    id: i64,
    created_at: DateTime<Utc>,
    tickets: Vec<ReservationTicket>,
}

async fn create_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reservation =
        booking::create_reservation(&state.db.pool, user.user_id, &request.tickets).await?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

// GET /reservations — the calling user's reservations only, newest first
async fn list_reservations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let rows = sqlx::query(
        r#"
        SELECT r.id AS rid, r.created_at, t.id AS tid, t."row", t.seat,
               t.session_id, a.title, s.show_time
        FROM reservations r
        LEFT JOIN tickets t ON t.reservation_id = r.id
        LEFT JOIN show_sessions s ON s.id = t.session_id
        LEFT JOIN astronomy_shows a ON a.id = s.show_id
        WHERE r.user_id = $1
        ORDER BY r.created_at DESC, t.id
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.db.pool)
    .await?;

    // regroup the flat join into nested responses
    let mut map: BTreeMap<i64, (DateTime<Utc>, Vec<ReservationTicket>)> = BTreeMap::new();
    for row in rows {
        let rid: i64 = row.get("rid");
        let created_at: DateTime<Utc> = row.get("created_at");
        let entry = map.entry(rid).or_insert((created_at, Vec::new()));

        let tid: Option<i64> = row.try_get("tid").ok();
        if let Some(tid) = tid {
            entry.1.push(ReservationTicket {
                id: tid,
                row: row.get("row"),
                seat: row.get("seat"),
                show_session: row.get("session_id"),
                show_title: row.get("title"),
                show_time: row.get("show_time"),
            });
        }
    }

    let payload: Vec<ReservationResponse> = map
        .into_iter()
        .rev()
        .map(|(id, (created_at, tickets))| ReservationResponse {
            id,
            created_at,
            tickets,
        })
        .collect();

    Ok(Json(payload))
}

async fn delete_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let owner: Option<i64> = sqlx::query_scalar("SELECT user_id FROM reservations WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await?;

    let owner = owner.ok_or(ApiError::NotFound("reservation"))?;
    if owner != user.user_id && !user.is_staff {
        return Err(ApiError::Forbidden);
    }

    // cascades to the reservation's tickets
    sqlx::query("DELETE FROM reservations WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
