//! Task entity model, comments, attachments and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use taskboard_core::access::TaskParties;
use taskboard_core::dates::is_overdue;
use taskboard_core::derivation::TaskState;
use taskboard_core::listing::{Sort, TaskSortField};
use taskboard_core::status::{Priority, ProjectStatus, TaskCategory, TaskStatus};
use taskboard_core::types::{DbId, Progress, Timestamp};

use crate::models::user::UserSummary;

/// A file reference attached to a task, stored inside the `attachments` JSONB array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    pub uploaded_at: Timestamp,
}

/// A task row joined with assignee, creator and parent project display columns.
#[derive(Debug, Clone, FromRow)]
pub struct Task {
    pub id: DbId,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub assigned_to: DbId,
    pub project_id: DbId,
    pub created_by: DbId,
    pub due_date: Timestamp,
    pub start_date: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub progress: Progress,
    pub estimated_hours: Option<f64>,
    pub actual_hours: f64,
    pub tags: Vec<String>,
    #[sqlx(try_from = "String")]
    pub category: TaskCategory,
    pub dependencies: Vec<DbId>,
    pub attachments: Json<Vec<Attachment>>,
    pub is_archived: bool,
    pub blocked_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub assignee_name: String,
    pub assignee_email: String,
    pub assignee_avatar: Option<String>,
    pub creator_name: String,
    pub creator_email: String,
    pub creator_avatar: Option<String>,
    pub project_title: String,
    #[sqlx(try_from = "String")]
    pub project_status: ProjectStatus,
    pub comment_count: i64,
}

impl Task {
    pub fn state(&self) -> TaskState {
        TaskState {
            status: self.status,
            progress: self.progress,
            completed_at: self.completed_at,
        }
    }

    pub fn parties(&self) -> TaskParties {
        TaskParties {
            created_by: self.created_by,
            assigned_to: self.assigned_to,
        }
    }

    /// A non-empty `blocked_reason` marks the task as blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked_reason
            .as_deref()
            .is_some_and(|reason| !reason.trim().is_empty())
    }
}

/// A `task_comments` row joined with its author.
#[derive(Debug, Clone, FromRow)]
pub struct TaskComment {
    pub id: DbId,
    pub task_id: DbId,
    pub user_id: DbId,
    pub content: String,
    pub created_at: Timestamp,
    pub user_name: String,
    pub user_email: String,
    pub user_avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: DbId,
    pub user: UserSummary,
    pub content: String,
    pub created_at: Timestamp,
}

impl From<TaskComment> for CommentResponse {
    fn from(comment: TaskComment) -> Self {
        Self {
            id: comment.id,
            user: UserSummary {
                id: comment.user_id,
                name: comment.user_name,
                email: comment.user_email,
                avatar: comment.user_avatar,
            },
            content: comment.content,
            created_at: comment.created_at,
        }
    }
}

/// Parent project reference embedded in task responses.
#[derive(Debug, Clone, Serialize)]
pub struct TaskProjectRef {
    pub id: DbId,
    pub title: String,
    pub status: ProjectStatus,
}

/// API representation of a task, including derived `isOverdue` / `isBlocked`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assigned_to: UserSummary,
    pub project: TaskProjectRef,
    pub created_by: UserSummary,
    pub due_date: Timestamp,
    pub start_date: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub progress: Progress,
    pub estimated_hours: Option<f64>,
    pub actual_hours: f64,
    pub tags: Vec<String>,
    pub category: TaskCategory,
    pub dependencies: Vec<DbId>,
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentResponse>>,
    pub comment_count: i64,
    pub is_archived: bool,
    pub blocked_reason: Option<String>,
    pub is_overdue: bool,
    pub is_blocked: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TaskResponse {
    /// Build the response; `comments` is only loaded for single-task reads.
    pub fn new(task: Task, comments: Option<Vec<TaskComment>>, now: Timestamp) -> Self {
        let is_overdue = is_overdue(task.due_date, task.status.is_done(), now);
        let is_blocked = task.is_blocked();
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            assigned_to: UserSummary {
                id: task.assigned_to,
                name: task.assignee_name,
                email: task.assignee_email,
                avatar: task.assignee_avatar,
            },
            project: TaskProjectRef {
                id: task.project_id,
                title: task.project_title,
                status: task.project_status,
            },
            created_by: UserSummary {
                id: task.created_by,
                name: task.creator_name,
                email: task.creator_email,
                avatar: task.creator_avatar,
            },
            due_date: task.due_date,
            start_date: task.start_date,
            completed_at: task.completed_at,
            progress: task.progress,
            estimated_hours: task.estimated_hours,
            actual_hours: task.actual_hours,
            tags: task.tags,
            category: task.category,
            dependencies: task.dependencies,
            attachments: task.attachments.0,
            comments: comments.map(|c| c.into_iter().map(CommentResponse::from).collect()),
            comment_count: task.comment_count,
            is_archived: task.is_archived,
            blocked_reason: task.blocked_reason,
            is_overdue,
            is_blocked,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// DTO for creating a task. Status, progress and completion come from `state`.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub assigned_to: DbId,
    pub project_id: DbId,
    pub created_by: DbId,
    pub due_date: Timestamp,
    pub start_date: Option<Timestamp>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: f64,
    pub tags: Vec<String>,
    pub category: TaskCategory,
    pub dependencies: Vec<DbId>,
    pub attachments: Vec<Attachment>,
    pub blocked_reason: Option<String>,
    pub state: TaskState,
}

/// DTO for updating a task.
///
/// `None` fields are left untouched. `blocked_reason: Some("")` clears the
/// reason. `state` is always written.
#[derive(Debug, Clone)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<DbId>,
    pub due_date: Option<Timestamp>,
    pub start_date: Option<Timestamp>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub category: Option<TaskCategory>,
    pub dependencies: Option<Vec<DbId>>,
    pub attachments: Option<Vec<Attachment>>,
    pub blocked_reason: Option<String>,
    pub state: TaskState,
}

/// Filters for listing tasks. Results are always limited to projects the
/// requester can see.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub category: Option<TaskCategory>,
    pub project_id: Option<DbId>,
    pub assigned_to: Option<DbId>,
    /// Only tasks past their due date and not done.
    pub overdue: bool,
    /// Pre-built `ILIKE` pattern.
    pub search: Option<String>,
    pub include_archived: bool,
    pub sort: Sort<TaskSortField>,
}
