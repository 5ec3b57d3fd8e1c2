//! Route definitions for the `/tasks` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::task;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                 -> list_tasks
/// POST   /                 -> create_task
/// GET    /my-tasks         -> my_tasks
/// GET    /overdue          -> overdue_tasks
/// GET    /{id}             -> get_task
/// PUT    /{id}             -> update_task
/// DELETE /{id}             -> delete_task
/// POST   /{id}/comments    -> add_comment
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(task::list_tasks).post(task::create_task))
        .route("/my-tasks", get(task::my_tasks))
        .route("/overdue", get(task::overdue_tasks))
        .route(
            "/{id}",
            get(task::get_task)
                .put(task::update_task)
                .delete(task::delete_task),
        )
        .route("/{id}/comments", post(task::add_comment))
}
