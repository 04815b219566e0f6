#![allow(dead_code)]

use base64::{engine::general_purpose, Engine as _};
use chrono::{TimeZone, Utc};
use sqlx::PgPool;

pub const PASSWORD: &str = "testpassword";

pub async fn create_user(pool: &PgPool, email: &str, is_staff: bool) -> i64 {
    let hash = bcrypt::hash(PASSWORD, 4).unwrap();
    sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, is_staff)
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(email)
    .bind(hash)
    .bind(is_staff)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub fn basic_auth(email: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{email}:{PASSWORD}"))
    )
}

pub async fn create_dome(pool: &PgPool, name: &str, rows: i32, seats_in_row: i32) -> i64 {
    sqlx::query_scalar(
        r#"INSERT INTO planetarium_domes (name, "rows", seats_in_row)
           VALUES ($1, $2, $3) RETURNING id"#,
    )
    .bind(name)
    .bind(rows)
    .bind(seats_in_row)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_show(pool: &PgPool, title: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO astronomy_shows (title, description)
         VALUES ($1, 'test description') RETURNING id",
    )
    .bind(title)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_theme(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO show_themes (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn link_theme(pool: &PgPool, show_id: i64, theme_id: i64) {
    sqlx::query("INSERT INTO astronomy_show_themes (show_id, theme_id) VALUES ($1, $2)")
        .bind(show_id)
        .bind(theme_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn create_session(pool: &PgPool, show_id: i64, dome_id: i64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO show_sessions (show_id, dome_id, show_time)
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(show_id)
    .bind(dome_id)
    .bind(Utc.with_ymd_and_hms(2026, 6, 8, 19, 0, 0).unwrap())
    .fetch_one(pool)
    .await
    .unwrap()
}

// dome + show + session in one go
pub async fn sample_session(pool: &PgPool, rows: i32, seats_in_row: i32) -> i64 {
    let dome_id = create_dome(pool, "Main dome", rows, seats_in_row).await;
    let show_id = create_show(pool, "Journey through galaxies").await;
    create_session(pool, show_id, dome_id).await
}

pub async fn ticket_count(pool: &PgPool, session_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE session_id = $1")
        .bind(session_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn total_ticket_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM tickets")
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn reservation_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM reservations")
        .fetch_one(pool)
        .await
        .unwrap()
}
