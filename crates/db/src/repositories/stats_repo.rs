//! Dashboard aggregates over a user's accessible projects and tasks.

use sqlx::PgPool;
use taskboard_core::stats::{ProjectCounts, ProjectStats, TaskCounts};
use taskboard_core::status::{ProjectStatus, TaskStatus};
use taskboard_core::types::DbId;

use crate::repositories::sql::accessible_project;

/// Decode a `(status_text, count)` row, surfacing unknown statuses as decode errors.
fn decode_grouped<S>(rows: Vec<(String, i64)>) -> Result<Vec<(S, i64)>, sqlx::Error>
where
    S: TryFrom<String>,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    rows.into_iter()
        .map(|(status, count)| {
            S::try_from(status)
                .map(|s| (s, count))
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))
        })
        .collect()
}

/// Provides read-only aggregate queries.
pub struct StatsRepo;

impl StatsRepo {
    /// Project and task counters for `user_id`, excluding archived rows.
    pub async fn for_user(pool: &PgPool, user_id: DbId) -> Result<ProjectStats, sqlx::Error> {
        let accessible = accessible_project(1);

        let project_rows: Vec<(String, i64)> = sqlx::query_as(&format!(
            "SELECT p.status, COUNT(*) FROM projects p \
             WHERE {accessible} AND p.is_archived = false \
             GROUP BY p.status"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let task_rows: Vec<(String, i64)> = sqlx::query_as(&format!(
            "SELECT t.status, COUNT(*) FROM tasks t \
             JOIN projects p ON p.id = t.project_id \
             WHERE {accessible} AND p.is_archived = false AND t.is_archived = false \
             GROUP BY t.status"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let (overdue,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM tasks t \
             JOIN projects p ON p.id = t.project_id \
             WHERE {accessible} AND p.is_archived = false AND t.is_archived = false \
             AND t.due_date < NOW() AND t.status <> 'Done'"
        ))
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(ProjectStats {
            projects: ProjectCounts::from_grouped(decode_grouped::<ProjectStatus>(project_rows)?),
            tasks: TaskCounts::from_grouped(decode_grouped::<TaskStatus>(task_rows)?, overdue),
        })
    }
}
