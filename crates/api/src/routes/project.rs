//! Route definitions for the `/projects` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::project;
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                                 -> list_projects
/// POST   /                                 -> create_project
/// GET    /stats                            -> get_stats
/// GET    /{id}                             -> get_project
/// PUT    /{id}                             -> update_project
/// DELETE /{id}                             -> delete_project
/// POST   /{id}/team-members                -> add_team_member
/// DELETE /{id}/team-members/{user_id}      -> remove_team_member
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list_projects).post(project::create_project))
        .route("/stats", get(project::get_stats))
        .route(
            "/{id}",
            get(project::get_project)
                .put(project::update_project)
                .delete(project::delete_project),
        )
        .route("/{id}/team-members", post(project::add_team_member))
        .route(
            "/{id}/team-members/{user_id}",
            delete(project::remove_team_member),
        )
}
