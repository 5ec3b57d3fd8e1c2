//! Route definitions for the `/auth` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /signup           -> signup
/// POST /login            -> login
/// GET  /me               -> me (requires auth)
/// PUT  /me               -> update_me (requires auth)
/// PUT  /change-password  -> change_password (requires auth)
/// POST /logout           -> logout (requires auth)
/// GET  /users            -> list_users (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me).put(auth::update_me))
        .route("/change-password", put(auth::change_password))
        .route("/logout", post(auth::logout))
        .route("/users", get(auth::list_users))
}
