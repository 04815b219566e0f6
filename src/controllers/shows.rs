use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use validator::Validate;

use crate::errors::{is_foreign_key_violation, unique_to_validation, ApiError};
use crate::middleware::{AuthUser, Operator};
use crate::models::{AstronomyShow, ShowTheme};
use crate::AppState;

const SHOW_TITLE_UNIQUE: &str = "astronomy_shows_title_key";
const SHOW_THEME_FK: &str = "astronomy_show_themes_theme_id_fkey";

const POSTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shows", get(list_shows).post(create_show))
        .route(
            "/shows/{id}",
            get(get_show).put(update_show).delete(delete_show),
        )
        .route("/shows/{id}/poster", post(upload_poster))
}

#[derive(Debug, Deserialize, Validate)]
struct ShowPayload {
    #[validate(length(min = 1, message = "title must not be empty"))]
    title: String,
    description: Option<String>,
    #[serde(default)]
    show_themes: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct ShowsQuery {
    // case-insensitive substring match on theme name
    show_themes: Option<String>,
}

// List view flattens themes to their names
#[derive(Debug, Serialize)]
struct ShowListResponse {
    id: i64,
    title: String,
    show_themes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ShowDetailResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub poster: Option<String>,
    pub show_themes: Vec<ShowTheme>,
}

pub async fn fetch_show_detail(
    pool: &PgPool,
    id: i64,
) -> Result<Option<ShowDetailResponse>, ApiError> {
    let show: Option<AstronomyShow> = sqlx::query_as(
        "SELECT id, title, description, poster FROM astronomy_shows WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(show) = show else {
        return Ok(None);
    };

    let show_themes: Vec<ShowTheme> = sqlx::query_as(
        r#"
        SELECT t.id, t.name
        FROM show_themes t
        JOIN astronomy_show_themes st ON st.theme_id = t.id
        WHERE st.show_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some(ShowDetailResponse {
        id: show.id,
        title: show.title,
        description: show.description,
        poster: show.poster,
        show_themes,
    }))
}

async fn list_shows(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<ShowsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    // A show matches when any of its themes matches the substring;
    // no filter means no restriction.
    let rows: Vec<(i64, String, Vec<String>)> = sqlx::query_as(
        r#"
        SELECT a.id, a.title,
               COALESCE(
                   array_agg(t.name ORDER BY t.name) FILTER (WHERE t.name IS NOT NULL),
                   '{}'
               ) AS show_themes
        FROM astronomy_shows a
        LEFT JOIN astronomy_show_themes st ON st.show_id = a.id
        LEFT JOIN show_themes t ON t.id = st.theme_id
        GROUP BY a.id, a.title
        HAVING $1::text IS NULL OR bool_or(t.name ILIKE '%' || $1 || '%')
        ORDER BY a.id
        "#,
    )
    .bind(params.show_themes.as_deref())
    .fetch_all(&state.db.pool)
    .await?;

    let payload: Vec<ShowListResponse> = rows
        .into_iter()
        .map(|(id, title, show_themes)| ShowListResponse {
            id,
            title,
            show_themes,
        })
        .collect();

    Ok(Json(payload))
}

async fn get_show(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    fetch_show_detail(&state.db.pool, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("astronomy show"))
}

async fn create_show(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Json(payload): Json<ShowPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let mut tx = state.db.pool.begin().await?;

    let show: AstronomyShow = sqlx::query_as(
        "INSERT INTO astronomy_shows (title, description)
         VALUES ($1, $2)
         RETURNING id, title, description, poster",
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| unique_to_validation(e, SHOW_TITLE_UNIQUE, "title"))?;

    link_themes(&mut tx, show.id, &payload.show_themes).await?;

    tx.commit().await?;

    let detail = fetch_show_detail(&state.db.pool, show.id)
        .await?
        .ok_or(ApiError::NotFound("astronomy show"))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

async fn update_show(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Path(id): Path<i64>,
    Json(payload): Json<ShowPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let mut tx = state.db.pool.begin().await?;

    let show: Option<AstronomyShow> = sqlx::query_as(
        "UPDATE astronomy_shows SET title = $1, description = $2
         WHERE id = $3
         RETURNING id, title, description, poster",
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| unique_to_validation(e, SHOW_TITLE_UNIQUE, "title"))?;

    let show = show.ok_or(ApiError::NotFound("astronomy show"))?;

    // replace the theme set wholesale
    sqlx::query("DELETE FROM astronomy_show_themes WHERE show_id = $1")
        .bind(show.id)
        .execute(&mut *tx)
        .await?;
    link_themes(&mut tx, show.id, &payload.show_themes).await?;

    tx.commit().await?;

    let detail = fetch_show_detail(&state.db.pool, show.id)
        .await?
        .ok_or(ApiError::NotFound("astronomy show"))?;

    Ok(Json(detail))
}

async fn delete_show(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM astronomy_shows WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::NotFound("astronomy show"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn link_themes(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    show_id: i64,
    theme_ids: &[i64],
) -> Result<(), ApiError> {
    for theme_id in theme_ids {
        sqlx::query(
            "INSERT INTO astronomy_show_themes (show_id, theme_id)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(show_id)
        .bind(theme_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e, SHOW_THEME_FK) {
                ApiError::NotFound("show theme")
            } else {
                ApiError::from(e)
            }
        })?;
    }
    Ok(())
}

// POST /shows/{id}/poster (operator only): multipart field "poster"
async fn upload_poster(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM astronomy_shows WHERE id = $1)")
            .bind(id)
            .fetch_one(&state.db.pool)
            .await?;
    if !exists {
        return Err(ApiError::NotFound("astronomy show"));
    }

    let mut saved: Option<String> = None;
    while let Some(field) = multipart.next_field().await.map_err(|_| ApiError::Validation {
        field: "poster".to_string(),
        message: "malformed multipart body".to_string(),
    })? {
        if field.name() != Some("poster") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let extension = std::path::Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !POSTER_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ApiError::Validation {
                field: "poster".to_string(),
                message: format!("unsupported poster format: {file_name:?}"),
            });
        }

        let data = field.bytes().await.map_err(|_| ApiError::Validation {
            field: "poster".to_string(),
            message: "failed to read poster upload".to_string(),
        })?;

        let directory = std::path::Path::new(&state.config.media.root).join("posters");
        tokio::fs::create_dir_all(&directory).await?;

        let relative = format!("posters/show_{id}.{extension}");
        let target = std::path::Path::new(&state.config.media.root).join(&relative);
        tokio::fs::write(&target, &data).await?;

        saved = Some(relative);
        break;
    }

    let poster = saved.ok_or(ApiError::Validation {
        field: "poster".to_string(),
        message: "poster file is required".to_string(),
    })?;

    sqlx::query("UPDATE astronomy_shows SET poster = $1 WHERE id = $2")
        .bind(&poster)
        .bind(id)
        .execute(&state.db.pool)
        .await?;

    Ok(Json(json!({ "id": id, "poster": poster })))
}
