//! Repository for the `tasks` and `task_comments` tables.

use sqlx::types::Json;
use sqlx::PgPool;
use taskboard_core::listing::TaskSortField;
use taskboard_core::types::DbId;

use crate::models::task::{CreateTask, Task, TaskComment, TaskFilter, UpdateTask};
use crate::repositories::sql::{accessible_project, priority_rank, text_search};

/// Task columns joined with assignee, creator and parent project.
const SELECT: &str = "SELECT \
    t.id, t.title, t.description, t.status, t.priority, \
    t.assigned_to, t.project_id, t.created_by, \
    t.due_date, t.start_date, t.completed_at, t.progress, \
    t.estimated_hours, t.actual_hours, t.tags, t.category, \
    t.dependencies, t.attachments, t.is_archived, t.blocked_reason, \
    t.created_at, t.updated_at, \
    a.name AS assignee_name, a.email AS assignee_email, a.avatar AS assignee_avatar, \
    c.name AS creator_name, c.email AS creator_email, c.avatar AS creator_avatar, \
    p.title AS project_title, p.status AS project_status, \
    (SELECT COUNT(*) FROM task_comments tc WHERE tc.task_id = t.id) AS comment_count \
    FROM tasks t \
    JOIN users a ON a.id = t.assigned_to \
    JOIN users c ON c.id = t.created_by \
    JOIN projects p ON p.id = t.project_id";

/// Comment columns joined with the author, read from a CTE or table aliased `tc`.
const COMMENT_COLUMNS: &str = "tc.id, tc.task_id, tc.user_id, tc.content, tc.created_at, \
    u.name AS user_name, u.email AS user_email, u.avatar AS user_avatar";

fn sort_column(field: TaskSortField) -> String {
    match field {
        TaskSortField::CreatedAt => "t.created_at".to_string(),
        TaskSortField::UpdatedAt => "t.updated_at".to_string(),
        TaskSortField::Title => "LOWER(t.title)".to_string(),
        TaskSortField::Status => "t.status".to_string(),
        TaskSortField::Priority => priority_rank("t.priority"),
        TaskSortField::Progress => "t.progress".to_string(),
        TaskSortField::DueDate => "t.due_date".to_string(),
    }
}

/// Provides CRUD operations for tasks and their comment threads.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a new task, returning the joined row.
    pub async fn create(pool: &PgPool, input: &CreateTask) -> Result<Task, sqlx::Error> {
        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO tasks
                (title, description, status, priority, assigned_to, project_id, created_by,
                 due_date, start_date, completed_at, progress, estimated_hours, actual_hours,
                 tags, category, dependencies, attachments, blocked_reason)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                     $17, NULLIF($18, ''))
             RETURNING id",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.state.status.as_str())
        .bind(input.priority.as_str())
        .bind(input.assigned_to)
        .bind(input.project_id)
        .bind(input.created_by)
        .bind(input.due_date)
        .bind(input.start_date)
        .bind(input.state.completed_at)
        .bind(input.state.progress)
        .bind(input.estimated_hours)
        .bind(input.actual_hours)
        .bind(&input.tags)
        .bind(input.category.as_str())
        .bind(&input.dependencies)
        .bind(Json(&input.attachments))
        .bind(&input.blocked_reason)
        .fetch_one(pool)
        .await?;

        let query = format!("{SELECT} WHERE t.id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Find a task by ID, archived or not.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("{SELECT} WHERE t.id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List tasks visible to `user_id`, i.e. tasks whose parent project the
    /// user owns or is a team member of. A `project_id` filter narrows this
    /// set and never widens it.
    pub async fn list(
        pool: &PgPool,
        user_id: DbId,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let mut conditions = vec![accessible_project(1)];
        let mut bind_idx = 2u32;

        if !filter.include_archived {
            conditions.push("t.is_archived = false".to_string());
        }
        if filter.overdue {
            conditions.push("t.due_date < NOW() AND t.status <> 'Done'".to_string());
        }
        if filter.status.is_some() {
            conditions.push(format!("t.status = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.priority.is_some() {
            conditions.push(format!("t.priority = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.category.is_some() {
            conditions.push(format!("t.category = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.project_id.is_some() {
            conditions.push(format!("t.project_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.assigned_to.is_some() {
            conditions.push(format!("t.assigned_to = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.search.is_some() {
            conditions.push(text_search("t", bind_idx));
        }

        let direction = filter.sort.order.as_sql();
        let query = format!(
            "{SELECT} WHERE {conditions} \
             ORDER BY {column} {direction} NULLS LAST, t.id {direction}",
            conditions = conditions.join(" AND "),
            column = sort_column(filter.sort.field),
        );

        let mut q = sqlx::query_as::<_, Task>(&query).bind(user_id);
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority.as_str());
        }
        if let Some(category) = filter.category {
            q = q.bind(category.as_str());
        }
        if let Some(project_id) = filter.project_id {
            q = q.bind(project_id);
        }
        if let Some(assigned_to) = filter.assigned_to {
            q = q.bind(assigned_to);
        }
        if let Some(ref pattern) = filter.search {
            q = q.bind(pattern);
        }
        q.fetch_all(pool).await
    }

    /// Update a task. Only non-`None` fields in `input` are applied; status,
    /// progress and completion from `input.state` are always written.
    ///
    /// Returns `None` if the task does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTask,
    ) -> Result<Option<Task>, sqlx::Error> {
        let updated: Option<(DbId,)> = sqlx::query_as(
            "UPDATE tasks SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                assigned_to = COALESCE($5, assigned_to),
                due_date = COALESCE($6, due_date),
                start_date = COALESCE($7, start_date),
                estimated_hours = COALESCE($8, estimated_hours),
                actual_hours = COALESCE($9, actual_hours),
                tags = COALESCE($10, tags),
                category = COALESCE($11, category),
                dependencies = COALESCE($12, dependencies),
                attachments = COALESCE($13, attachments),
                blocked_reason = CASE WHEN $14::TEXT IS NULL THEN blocked_reason
                                      ELSE NULLIF($14, '') END,
                status = $15,
                progress = $16,
                completed_at = $17
             WHERE id = $1
             RETURNING id",
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.priority.map(|p| p.as_str()))
        .bind(input.assigned_to)
        .bind(input.due_date)
        .bind(input.start_date)
        .bind(input.estimated_hours)
        .bind(input.actual_hours)
        .bind(&input.tags)
        .bind(input.category.map(|c| c.as_str()))
        .bind(&input.dependencies)
        .bind(input.attachments.as_ref().map(Json))
        .bind(&input.blocked_reason)
        .bind(input.state.status.as_str())
        .bind(input.state.progress)
        .bind(input.state.completed_at)
        .fetch_optional(pool)
        .await?;

        match updated {
            Some(_) => Self::find_by_id(pool, id).await,
            None => Ok(None),
        }
    }

    /// Soft-delete a task. Returns `true` if the task was live before the call.
    pub async fn archive(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE tasks SET is_archived = true WHERE id = $1 AND is_archived = false")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count how many of `ids` are tasks belonging to `project_id`.
    pub async fn count_in_project(
        pool: &PgPool,
        project_id: DbId,
        ids: &[DbId],
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE project_id = $1 AND id = ANY($2)")
                .bind(project_id)
                .bind(ids)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Append a comment to a task's thread, returning it with its author.
    pub async fn add_comment(
        pool: &PgPool,
        task_id: DbId,
        user_id: DbId,
        content: &str,
    ) -> Result<TaskComment, sqlx::Error> {
        let query = format!(
            "WITH tc AS (
                INSERT INTO task_comments (task_id, user_id, content)
                VALUES ($1, $2, $3)
                RETURNING id, task_id, user_id, content, created_at
             )
             SELECT {COMMENT_COLUMNS} FROM tc JOIN users u ON u.id = tc.user_id"
        );
        sqlx::query_as::<_, TaskComment>(&query)
            .bind(task_id)
            .bind(user_id)
            .bind(content)
            .fetch_one(pool)
            .await
    }

    /// List a task's comments, oldest first.
    pub async fn list_comments(
        pool: &PgPool,
        task_id: DbId,
    ) -> Result<Vec<TaskComment>, sqlx::Error> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM task_comments tc \
             JOIN users u ON u.id = tc.user_id \
             WHERE tc.task_id = $1 \
             ORDER BY tc.created_at, tc.id"
        );
        sqlx::query_as::<_, TaskComment>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }
}
