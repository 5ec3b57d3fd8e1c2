pub mod auth;
pub mod health;
pub mod project;
pub mod task;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health                               liveness (public)
///
/// /auth/signup                          register (public)
/// /auth/login                           login (public)
/// /auth/me                              get, update own profile
/// /auth/change-password                 change own password
/// /auth/logout                          logout
/// /auth/users                           active users
///
/// /projects                             list, create
/// /projects/stats                       dashboard counters
/// /projects/{id}                        get, update, archive
/// /projects/{id}/team-members           add member
/// /projects/{id}/team-members/{user_id} remove member
///
/// /tasks                                list, create
/// /tasks/my-tasks                       tasks assigned to the caller
/// /tasks/overdue                        overdue tasks
/// /tasks/{id}                           get, update, archive
/// /tasks/{id}/comments                  add comment
/// ```
///
/// Everything except `/health`, `/auth/signup` and `/auth/login` requires a
/// Bearer token; the [`AuthUser`](crate::middleware::auth::AuthUser)
/// extractor enforces this per handler.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/auth", auth::router())
        .nest("/projects", project::router())
        .nest("/tasks", task::router())
}
