//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::errors::ErrorKind;
use taskboard_core::error::{AuthFailure, CoreError};
use taskboard_core::types::DbId;
use taskboard_db::models::user::User;
use taskboard_db::repositories::UserRepo;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user resolved from a JWT Bearer token in the `Authorization` header.
///
/// The token's subject is looked up on every request, so deleted or
/// deactivated accounts lose access immediately:
///
/// | Condition                        | Code                  |
/// |----------------------------------|-----------------------|
/// | header missing / no bearer token | `NO_TOKEN`            |
/// | bad signature or malformed token | `INVALID_TOKEN`       |
/// | `exp` in the past                | `TOKEN_EXPIRED`       |
/// | subject no longer exists         | `AUTH_FAILED`         |
/// | account deactivated              | `ACCOUNT_DEACTIVATED` |
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    /// The current user row.
    pub user: User,
}

fn reject(reason: AuthFailure) -> AppError {
    AppError::Core(CoreError::unauthorized(reason))
}

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| reject(AuthFailure::NoToken))?;

        let claims = validate_token(token, &state.config.jwt).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => reject(AuthFailure::TokenExpired),
            _ => reject(AuthFailure::InvalidToken),
        })?;

        let user = UserRepo::find_by_id(&state.pool, claims.sub)
            .await?
            .ok_or_else(|| reject(AuthFailure::AuthFailed))?;

        if !user.is_active {
            tracing::warn!(user_id = user.id, "Rejected token for deactivated account");
            return Err(reject(AuthFailure::AccountDeactivated));
        }

        Ok(AuthUser {
            user_id: user.id,
            user,
        })
    }
}
