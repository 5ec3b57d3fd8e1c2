//! Handlers for the `/auth` resource (signup, login, profile, password).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use taskboard_core::error::{AuthFailure, CoreError};
use taskboard_core::validation::validate_not_blank;
use taskboard_db::models::user::{CreateUser, UpdateProfile, User, UserResponse};
use taskboard_db::repositories::UserRepo;
use validator::Validate;

use crate::auth::jwt::generate_token;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/signup`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(
        length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    pub password: String,
    #[validate(length(max = 100, message = "Department cannot exceed 100 characters"))]
    pub department: Option<String>,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request body for `PUT /auth/me`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(
        length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    #[validate(length(max = 100, message = "Department cannot exceed 100 characters"))]
    pub department: Option<String>,
    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar: Option<String>,
}

/// Request body for `PUT /auth/change-password`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    pub new_password: String,
}

/// Payload returned by signup and login.
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub user: UserResponse,
    pub token: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/signup
///
/// Register a new account and return it with a token.
pub async fn signup(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthPayload>>)> {
    validate_password_strength(&input.password, state.config.password_min_length)
        .map_err(|msg| CoreError::invalid_field("password", msg))?;

    let email = input.email.trim().to_lowercase();
    if UserRepo::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(email_taken());
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    // Concurrent signups that pass the check still hit `uq_users_email`.
    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            name: input.name.trim().to_string(),
            email,
            password_hash,
            department: input.department,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "User registered");

    let payload = auth_payload(&state, &user)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("User registered successfully", payload)),
    ))
}

/// POST /api/auth/login
///
/// Authenticate with email + password.
pub async fn login(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthPayload>>> {
    let invalid = || AppError::Core(CoreError::unauthorized(AuthFailure::InvalidCredentials));

    let mut user = UserRepo::find_by_email(&state.pool, input.email.trim())
        .await?
        .ok_or_else(invalid)?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(user_id = user.id, "Failed login attempt");
        return Err(invalid());
    }

    if !user.is_active {
        return Err(CoreError::unauthorized(AuthFailure::AccountDeactivated).into());
    }

    UserRepo::record_login(&state.pool, user.id).await?;
    user.last_login_at = Some(chrono::Utc::now());

    tracing::info!(user_id = user.id, "User logged in");

    let payload = auth_payload(&state, &user)?;
    Ok(Json(ApiResponse::ok("Login successful", payload)))
}

/// GET /api/auth/me
pub async fn me(auth: AuthUser) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::ok(
        "User profile retrieved successfully",
        UserResponse::from(&auth.user),
    ))
}

/// PUT /api/auth/me
///
/// Update the caller's own profile. Changing email to one already in use is
/// rejected with `EMAIL_EXISTS`.
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(input): ValidJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let email = input.email.map(|e| e.trim().to_lowercase());
    if let Some(ref email) = email {
        if let Some(existing) = UserRepo::find_by_email(&state.pool, email).await? {
            if existing.id != auth.user_id {
                return Err(email_taken());
            }
        }
    }

    let update = UpdateProfile {
        name: input.name.map(|n| n.trim().to_string()),
        email,
        department: input.department,
        avatar: input.avatar,
    };
    let user = UserRepo::update_profile(&state.pool, auth.user_id, &update)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        })?;

    tracing::info!(user_id = user.id, "Profile updated");

    Ok(Json(ApiResponse::ok(
        "Profile updated successfully",
        UserResponse::from(&user),
    )))
}

/// PUT /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(input): ValidJson<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let current_valid = verify_password(&input.current_password, &auth.user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !current_valid {
        return Err(
            CoreError::invalid_field("currentPassword", "Current password is incorrect").into(),
        );
    }

    validate_password_strength(&input.new_password, state.config.password_min_length)
        .map_err(|msg| CoreError::invalid_field("newPassword", msg))?;

    let password_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::update_password(&state.pool, auth.user_id, &password_hash).await?;

    tracing::info!(user_id = auth.user_id, "Password changed");

    Ok(Json(ApiResponse::message("Password changed successfully")))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; the client discards its copy.
pub async fn logout(auth: AuthUser) -> Json<ApiResponse<()>> {
    tracing::info!(user_id = auth.user_id, "User logged out");
    Json(ApiResponse::message("Logged out successfully"))
}

/// GET /api/auth/users
///
/// Active users, for assignee and team-member pickers.
pub async fn list_users(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<UserResponse>>>> {
    let users = UserRepo::list_active(&state.pool).await?;
    Ok(Json(ApiResponse::list(
        "Users retrieved successfully",
        users.iter().map(UserResponse::from).collect(),
    )))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn email_taken() -> AppError {
    AppError::Core(CoreError::Duplicate {
        field: "email",
        message: "Email already registered".to_string(),
    })
}

fn auth_payload(state: &AppState, user: &User) -> AppResult<AuthPayload> {
    let token = generate_token(user.id, user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    Ok(AuthPayload {
        user: UserResponse::from(user),
        token,
    })
}
