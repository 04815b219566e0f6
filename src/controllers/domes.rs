use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use validator::Validate;

use crate::errors::{unique_to_validation, ApiError};
use crate::middleware::{AuthUser, Operator};
use crate::models::PlanetariumDome;
use crate::AppState;

const DOME_NAME_UNIQUE: &str = "planetarium_domes_name_key";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/domes", get(list_domes).post(create_dome))
        .route(
            "/domes/{id}",
            get(get_dome).put(update_dome).delete(delete_dome),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct DomePayload {
    #[validate(length(min = 1, message = "name must not be empty"))]
    name: String,
    #[validate(range(min = 1, message = "rows must be a positive integer"))]
    rows: i32,
    #[validate(range(min = 1, message = "seats_in_row must be a positive integer"))]
    seats_in_row: i32,
}

// List view carries only name + derived capacity
#[derive(Debug, Serialize)]
struct DomeListResponse {
    name: String,
    capacity: i64,
}

#[derive(Debug, Serialize)]
pub struct DomeDetailResponse {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub capacity: i64,
}

impl From<PlanetariumDome> for DomeDetailResponse {
    fn from(dome: PlanetariumDome) -> Self {
        let capacity = dome.capacity();
        DomeDetailResponse {
            id: dome.id,
            name: dome.name,
            rows: dome.rows,
            seats_in_row: dome.seats_in_row,
            capacity,
        }
    }
}

pub async fn fetch_dome(pool: &PgPool, id: i64) -> Result<Option<PlanetariumDome>, sqlx::Error> {
    sqlx::query_as(
        r#"SELECT id, name, "rows", seats_in_row FROM planetarium_domes WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

async fn list_domes(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let domes: Vec<PlanetariumDome> = sqlx::query_as(
        r#"SELECT id, name, "rows", seats_in_row FROM planetarium_domes ORDER BY name"#,
    )
    .fetch_all(&state.db.pool)
    .await?;

    let payload: Vec<DomeListResponse> = domes
        .into_iter()
        .map(|dome| DomeListResponse {
            capacity: dome.capacity(),
            name: dome.name,
        })
        .collect();

    Ok(Json(payload))
}

async fn get_dome(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let dome = fetch_dome(&state.db.pool, id)
        .await?
        .ok_or(ApiError::NotFound("planetarium dome"))?;

    Ok(Json(DomeDetailResponse::from(dome)))
}

async fn create_dome(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Json(payload): Json<DomePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let dome: PlanetariumDome = sqlx::query_as(
        r#"
        INSERT INTO planetarium_domes (name, "rows", seats_in_row)
        VALUES ($1, $2, $3)
        RETURNING id, name, "rows", seats_in_row
        "#,
    )
    .bind(&payload.name)
    .bind(payload.rows)
    .bind(payload.seats_in_row)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| unique_to_validation(e, DOME_NAME_UNIQUE, "name"))?;

    Ok((StatusCode::CREATED, Json(DomeDetailResponse::from(dome))))
}

async fn update_dome(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Path(id): Path<i64>,
    Json(payload): Json<DomePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let dome: Option<PlanetariumDome> = sqlx::query_as(
        r#"
        UPDATE planetarium_domes
        SET name = $1, "rows" = $2, seats_in_row = $3
        WHERE id = $4
        RETURNING id, name, "rows", seats_in_row
        "#,
    )
    .bind(&payload.name)
    .bind(payload.rows)
    .bind(payload.seats_in_row)
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(|e| unique_to_validation(e, DOME_NAME_UNIQUE, "name"))?;

    dome.map(|d| Json(DomeDetailResponse::from(d)))
        .ok_or(ApiError::NotFound("planetarium dome"))
}

async fn delete_dome(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM planetarium_domes WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::NotFound("planetarium dome"));
    }
    Ok(StatusCode::NO_CONTENT)
}
