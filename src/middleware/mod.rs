use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

use crate::errors::ApiError;
use crate::models::User;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub is_staff: bool,
}

// Basic Auth extractor; rejects before any payload is read
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let encoded = auth_header
            .strip_prefix("Basic ")
            .ok_or(ApiError::Unauthorized)?;

        let decoded = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| ApiError::Unauthorized)?;

        let credentials = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

        // email:password
        let mut parts = credentials.splitn(2, ':');
        let email = parts.next().ok_or(ApiError::Unauthorized)?;
        let password = parts.next().ok_or(ApiError::Unauthorized)?;

        let user = User::find_by_email(email, &state.db)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        if !user.verify_password(password) {
            return Err(ApiError::Unauthorized);
        }

        Ok(AuthUser {
            user_id: user.id,
            email: user.email,
            is_staff: user.is_staff,
        })
    }
}

// Privileged operator; every catalog write goes through this
#[derive(Debug, Clone)]
pub struct Operator(pub AuthUser);

impl FromRequestParts<Arc<crate::AppState>> for Operator {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(ApiError::Forbidden);
        }
        Ok(Operator(user))
    }
}
