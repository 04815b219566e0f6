use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::errors::{unique_to_validation, ApiError};
use crate::middleware::{AuthUser, Operator};
use crate::models::ShowTheme;
use crate::AppState;

const THEME_NAME_UNIQUE: &str = "show_themes_name_key";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/themes", get(list_themes).post(create_theme))
        .route(
            "/themes/{id}",
            get(get_theme).put(update_theme).delete(delete_theme),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct ThemePayload {
    #[validate(length(min = 1, message = "name must not be empty"))]
    name: String,
}

async fn list_themes(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let themes: Vec<ShowTheme> =
        sqlx::query_as("SELECT id, name FROM show_themes ORDER BY id")
            .fetch_all(&state.db.pool)
            .await?;

    Ok(Json(themes))
}

async fn get_theme(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let theme: Option<ShowTheme> =
        sqlx::query_as("SELECT id, name FROM show_themes WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db.pool)
            .await?;

    theme.map(Json).ok_or(ApiError::NotFound("show theme"))
}

async fn create_theme(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Json(payload): Json<ThemePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let theme: ShowTheme =
        sqlx::query_as("INSERT INTO show_themes (name) VALUES ($1) RETURNING id, name")
            .bind(&payload.name)
            .fetch_one(&state.db.pool)
            .await
            .map_err(|e| unique_to_validation(e, THEME_NAME_UNIQUE, "name"))?;

    Ok((StatusCode::CREATED, Json(theme)))
}

async fn update_theme(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Path(id): Path<i64>,
    Json(payload): Json<ThemePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let theme: Option<ShowTheme> =
        sqlx::query_as("UPDATE show_themes SET name = $1 WHERE id = $2 RETURNING id, name")
            .bind(&payload.name)
            .bind(id)
            .fetch_optional(&state.db.pool)
            .await
            .map_err(|e| unique_to_validation(e, THEME_NAME_UNIQUE, "name"))?;

    theme.map(Json).ok_or(ApiError::NotFound("show theme"))
}

async fn delete_theme(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM show_themes WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::NotFound("show theme"));
    }
    Ok(StatusCode::NO_CONTENT)
}
