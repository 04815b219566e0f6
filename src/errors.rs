use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Request-local error taxonomy; every handler and service returns this.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{coordinate} number must be in available range: (1, {max}), got {value}")]
    SeatOutOfRange {
        coordinate: &'static str,
        value: i32,
        max: i32,
    },

    #[error("seat (row {row}, seat {seat}) is already taken for session {session_id}")]
    SeatTaken { session_id: i64, row: i32, seat: i32 },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("authentication required")]
    Unauthorized,

    #[error("operator privileges required")]
    Forbidden,

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("storage error")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation", "field": field, "detail": message }),
            ),
            ApiError::SeatOutOfRange { coordinate, .. } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation", "field": coordinate, "detail": self.to_string() }),
            ),
            ApiError::SeatTaken { session_id, row, seat } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "conflict",
                    "detail": self.to_string(),
                    "show_session": session_id,
                    "row": row,
                    "seat": seat,
                }),
            ),
            ApiError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "not_found", "detail": self.to_string() }),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "unauthorized", "detail": self.to_string() }),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({ "error": "forbidden", "detail": self.to_string() }),
            ),
            ApiError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal", "detail": "internal server error" }),
                )
            }
            ApiError::Io(e) => {
                tracing::error!("storage error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal", "detail": "internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut field = String::from("payload");
        let mut message = String::from("invalid payload");
        if let Some((name, errs)) = errors.field_errors().into_iter().next() {
            field = name.to_string();
            if let Some(e) = errs.first() {
                message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
            }
        }
        ApiError::Validation { field, message }
    }
}

pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("23505") && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}

pub fn is_foreign_key_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("23503") && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}

// Duplicate unique field (name/title) -> field-level validation error
pub fn unique_to_validation(err: sqlx::Error, constraint: &str, field: &'static str) -> ApiError {
    if is_unique_violation(&err, constraint) {
        ApiError::Validation {
            field: field.to_string(),
            message: format!("{field} already exists"),
        }
    } else {
        ApiError::from(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_out_of_range_names_coordinate_and_range() {
        let err = ApiError::SeatOutOfRange {
            coordinate: "row",
            value: 11,
            max: 10,
        };
        let message = err.to_string();
        assert!(message.contains("row"));
        assert!(message.contains("(1, 10)"));
        assert!(message.contains("11"));
    }

    #[test]
    fn seat_taken_names_seat() {
        let err = ApiError::SeatTaken {
            session_id: 7,
            row: 1,
            seat: 1,
        };
        assert!(err.to_string().contains("session 7"));
    }
}
