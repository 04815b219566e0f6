use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::controllers::{domes, shows};
use crate::errors::{is_foreign_key_violation, ApiError};
use crate::middleware::{AuthUser, Operator};
use crate::models::ShowSession;
use crate::services::availability::{self, SeatCoordinate};
use crate::AppState;

const SESSION_SHOW_FK: &str = "show_sessions_show_id_fkey";
const SESSION_DOME_FK: &str = "show_sessions_dome_id_fkey";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route(
            "/sessions/{id}",
            get(get_session).put(update_session).delete(delete_session),
        )
}

#[derive(Debug, Deserialize)]
struct SessionsQuery {
    // exact calendar date, YYYY-MM-DD
    date: Option<String>,
    // substring of the show title
    show: Option<String>,
    // substring of the dome name
    dome: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct SessionListResponse {
    id: i64,
    show_title: String,
    dome_name: String,
    show_time: DateTime<Utc>,
    available_places: i64,
}

#[derive(Debug, Serialize)]
struct SessionDetailResponse {
    id: i64,
    show_time: DateTime<Utc>,
    astronomy_show: shows::ShowDetailResponse,
    planetarium_dome: domes::DomeDetailResponse,
    taken_places: Vec<SeatCoordinate>,
}

#[derive(Debug, Deserialize)]
struct SessionPayload {
    astronomy_show: i64,
    planetarium_dome: i64,
    show_time: DateTime<Utc>,
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<SessionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = match params.date.as_deref() {
        Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            ApiError::Validation {
                field: "date".to_string(),
                message: "date must be formatted as YYYY-MM-DD".to_string(),
            }
        })?),
        None => None,
    };

    let mut q = String::from(
        r#"
        SELECT s.id, a.title AS show_title, d.name AS dome_name, s.show_time,
               d."rows"::bigint * d.seats_in_row::bigint - COUNT(t.id) AS available_places
        FROM show_sessions s
        JOIN astronomy_shows a ON a.id = s.show_id
        JOIN planetarium_domes d ON d.id = s.dome_id
        LEFT JOIN tickets t ON t.session_id = s.id
        "#,
    );

    // filters combine with AND; an absent parameter means no restriction
    let mut clauses: Vec<String> = Vec::new();
    let mut bind_idx = 1;
    if date.is_some() {
        clauses.push(format!("s.show_time::date = ${bind_idx}"));
        bind_idx += 1;
    }
    if params.show.is_some() {
        clauses.push(format!("a.title ILIKE '%' || ${bind_idx} || '%'"));
        bind_idx += 1;
    }
    if params.dome.is_some() {
        clauses.push(format!("d.name ILIKE '%' || ${bind_idx} || '%'"));
    }
    if !clauses.is_empty() {
        q.push_str(" WHERE ");
        q.push_str(&clauses.join(" AND "));
    }
    q.push_str(
        r#" GROUP BY s.id, a.title, d.name, d."rows", d.seats_in_row, s.show_time
            ORDER BY s.show_time, s.id"#,
    );

    let mut dbq = sqlx::query_as::<_, SessionListResponse>(&q);
    if let Some(date) = date {
        dbq = dbq.bind(date);
    }
    if let Some(show) = params.show {
        dbq = dbq.bind(show);
    }
    if let Some(dome) = params.dome {
        dbq = dbq.bind(dome);
    }

    let sessions = dbq.fetch_all(&state.db.pool).await?;

    Ok(Json(sessions))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let session: Option<ShowSession> = sqlx::query_as(
        "SELECT id, show_id, dome_id, show_time FROM show_sessions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?;

    let session = session.ok_or(ApiError::NotFound("show session"))?;

    let astronomy_show = shows::fetch_show_detail(&state.db.pool, session.show_id)
        .await?
        .ok_or(ApiError::NotFound("astronomy show"))?;
    let planetarium_dome = domes::fetch_dome(&state.db.pool, session.dome_id)
        .await?
        .map(domes::DomeDetailResponse::from)
        .ok_or(ApiError::NotFound("planetarium dome"))?;
    let taken_places = availability::taken_places(&state.db.pool, session.id).await?;

    Ok(Json(SessionDetailResponse {
        id: session.id,
        show_time: session.show_time,
        astronomy_show,
        planetarium_dome,
        taken_places,
    }))
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Json(payload): Json<SessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_references(&state, &payload).await?;

    let session: ShowSession = sqlx::query_as(
        "INSERT INTO show_sessions (show_id, dome_id, show_time)
         VALUES ($1, $2, $3)
         RETURNING id, show_id, dome_id, show_time",
    )
    .bind(payload.astronomy_show)
    .bind(payload.planetarium_dome)
    .bind(payload.show_time)
    .fetch_one(&state.db.pool)
    .await
    .map_err(reference_error)?;

    Ok((StatusCode::CREATED, Json(session)))
}

async fn update_session(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Path(id): Path<i64>,
    Json(payload): Json<SessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_references(&state, &payload).await?;

    let session: Option<ShowSession> = sqlx::query_as(
        "UPDATE show_sessions SET show_id = $1, dome_id = $2, show_time = $3
         WHERE id = $4
         RETURNING id, show_id, dome_id, show_time",
    )
    .bind(payload.astronomy_show)
    .bind(payload.planetarium_dome)
    .bind(payload.show_time)
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(reference_error)?;

    session.map(Json).ok_or(ApiError::NotFound("show session"))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM show_sessions WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::NotFound("show session"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// The pre-checks in ensure_references race with concurrent catalog deletes;
// an FK violation on the write itself maps to the same missing-resource error.
fn reference_error(e: sqlx::Error) -> ApiError {
    if is_foreign_key_violation(&e, SESSION_SHOW_FK) {
        ApiError::NotFound("astronomy show")
    } else if is_foreign_key_violation(&e, SESSION_DOME_FK) {
        ApiError::NotFound("planetarium dome")
    } else {
        ApiError::from(e)
    }
}

// Sessions may overlap in the same dome on purpose; only referential
// integrity is checked here.
async fn ensure_references(state: &AppState, payload: &SessionPayload) -> Result<(), ApiError> {
    let show_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM astronomy_shows WHERE id = $1)")
            .bind(payload.astronomy_show)
            .fetch_one(&state.db.pool)
            .await?;
    if !show_exists {
        return Err(ApiError::NotFound("astronomy show"));
    }

    let dome_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM planetarium_domes WHERE id = $1)")
            .bind(payload.planetarium_dome)
            .fetch_one(&state.db.pool)
            .await?;
    if !dome_exists {
        return Err(ApiError::NotFound("planetarium dome"));
    }

    Ok(())
}
