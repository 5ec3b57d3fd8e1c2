//! Handlers for the `/tasks` resource and task comments.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskboard_core::access::{
    ensure_assignable, ensure_can_comment, ensure_can_create_task, ensure_can_delete_task,
    ensure_can_update_task, ensure_can_view_task, ProjectParticipants,
};
use taskboard_core::dates::{
    deserialize_optional_timestamp, deserialize_timestamp, validate_task_due_date,
};
use taskboard_core::derivation::{derive_task_state, TaskChange, TaskState};
use taskboard_core::error::CoreError;
use taskboard_core::listing::{search_pattern, AssigneeFilter, Sort, SortOrder, TaskSortField};
use taskboard_core::status::{Priority, TaskCategory, TaskStatus};
use taskboard_core::types::{DbId, Progress, Timestamp};
use taskboard_core::validation::{normalize_tags, validate_not_blank, validate_tags};
use taskboard_db::models::task::{
    Attachment, CommentResponse, CreateTask, Task, TaskFilter, TaskResponse, UpdateTask,
};
use taskboard_db::repositories::TaskRepo;
use taskboard_db::DbPool;
use validator::Validate;

use crate::error::AppResult;
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::handlers::project::load_project;
use crate::handlers::{query_enum, query_id, require_active_user};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct AttachmentInput {
    #[validate(length(min = 1, max = 255, message = "Attachment name is required"))]
    pub name: String,
    #[validate(url(message = "Attachment URL must be a valid URL"))]
    pub url: String,
    #[validate(range(min = 0, message = "Attachment size cannot be negative"))]
    pub size: Option<i64>,
}

impl AttachmentInput {
    fn into_attachment(self, uploaded_at: Timestamp) -> Attachment {
        Attachment {
            name: self.name.trim().to_string(),
            url: self.url,
            size: self.size,
            uploaded_at,
        }
    }
}

/// Request body for `POST /tasks`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(
        length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"),
        custom(function = "validate_not_blank")
    )]
    pub title: String,
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: DbId,
    pub project: DbId,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub due_date: Timestamp,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub start_date: Option<Timestamp>,
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<Progress>,
    #[validate(range(min = 0.0, message = "Estimated hours cannot be negative"))]
    pub estimated_hours: Option<f64>,
    #[validate(range(min = 0.0, message = "Actual hours cannot be negative"))]
    pub actual_hours: Option<f64>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
    pub category: Option<TaskCategory>,
    #[serde(default)]
    pub dependencies: Vec<DbId>,
    #[serde(default)]
    #[validate(nested)]
    pub attachments: Vec<AttachmentInput>,
    #[validate(length(max = 500, message = "Blocked reason cannot exceed 500 characters"))]
    pub blocked_reason: Option<String>,
}

/// Request body for `PUT /tasks/{id}`. The parent project cannot change.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(
        length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"),
        custom(function = "validate_not_blank")
    )]
    pub title: Option<String>,
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<DbId>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub due_date: Option<Timestamp>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub start_date: Option<Timestamp>,
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<Progress>,
    #[validate(range(min = 0.0, message = "Estimated hours cannot be negative"))]
    pub estimated_hours: Option<f64>,
    #[validate(range(min = 0.0, message = "Actual hours cannot be negative"))]
    pub actual_hours: Option<f64>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
    pub category: Option<TaskCategory>,
    pub dependencies: Option<Vec<DbId>>,
    #[validate(nested)]
    pub attachments: Option<Vec<AttachmentInput>>,
    /// An empty string clears the reason.
    #[validate(length(max = 500, message = "Blocked reason cannot exceed 500 characters"))]
    pub blocked_reason: Option<String>,
}

/// Request body for `POST /tasks/{id}/comments`.
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(
        length(min = 1, max = 1000, message = "Comment must be between 1 and 1000 characters"),
        custom(function = "validate_not_blank")
    )]
    pub content: String,
}

/// Query parameters shared by the task list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub project: Option<String>,
    /// A user id or `me`.
    pub assigned_to: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    #[serde(default)]
    pub overdue: bool,
    #[serde(default)]
    pub include_archived: bool,
}

impl TaskListQuery {
    /// Build the repository filter. `fallback_sort` applies only when the
    /// caller supplied neither `sortBy` nor `order`.
    fn into_filter(
        self,
        requester: DbId,
        fallback_sort: Sort<TaskSortField>,
    ) -> AppResult<TaskFilter> {
        let assigned_to = match self.assigned_to.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(AssigneeFilter::parse(raw)?.resolve(requester)),
        };
        let sort_by: Option<TaskSortField> = query_enum("sortBy", self.sort_by.as_deref())?;
        let order: Option<SortOrder> = query_enum("order", self.order.as_deref())?;
        let sort = match (sort_by, order) {
            (None, None) => fallback_sort,
            (field, order) => Sort {
                field: field.unwrap_or_default(),
                order: order.unwrap_or_default(),
            },
        };
        Ok(TaskFilter {
            status: query_enum("status", self.status.as_deref())?,
            priority: query_enum("priority", self.priority.as_deref())?,
            category: query_enum("category", self.category.as_deref())?,
            project_id: query_id("project", self.project.as_deref())?,
            assigned_to,
            overdue: self.overdue,
            search: self.search.as_deref().and_then(search_pattern),
            include_archived: self.include_archived,
            sort,
        })
    }
}

/// Payload returned by `DELETE /tasks/{id}`.
#[derive(Debug, Serialize)]
pub struct TaskRef {
    pub id: DbId,
}

const DUE_SOONEST: Sort<TaskSortField> = Sort {
    field: TaskSortField::DueDate,
    order: SortOrder::Asc,
};

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/tasks
///
/// Tasks in projects the caller can see. A `project` filter only narrows
/// that set.
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<TaskListQuery>,
) -> AppResult<Json<ApiResponse<Vec<TaskResponse>>>> {
    let filter = query.into_filter(auth.user_id, Sort::default())?;
    let tasks = TaskRepo::list(&state.pool, auth.user_id, &filter).await?;
    Ok(Json(ApiResponse::list(
        "Tasks retrieved successfully",
        to_responses(tasks),
    )))
}

/// GET /api/tasks/my-tasks
///
/// Tasks assigned to the caller, soonest due first unless a sort is given.
pub async fn my_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<TaskListQuery>,
) -> AppResult<Json<ApiResponse<Vec<TaskResponse>>>> {
    let mut filter = query.into_filter(auth.user_id, DUE_SOONEST)?;
    filter.assigned_to = Some(auth.user_id);
    let tasks = TaskRepo::list(&state.pool, auth.user_id, &filter).await?;
    Ok(Json(ApiResponse::list(
        "Your tasks retrieved successfully",
        to_responses(tasks),
    )))
}

/// GET /api/tasks/overdue
pub async fn overdue_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<TaskListQuery>,
) -> AppResult<Json<ApiResponse<Vec<TaskResponse>>>> {
    let mut filter = query.into_filter(auth.user_id, DUE_SOONEST)?;
    filter.overdue = true;
    let tasks = TaskRepo::list(&state.pool, auth.user_id, &filter).await?;
    Ok(Json(ApiResponse::list(
        "Overdue tasks retrieved successfully",
        to_responses(tasks),
    )))
}

/// GET /api/tasks/{id}
///
/// Includes the full comment thread.
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<TaskResponse>>> {
    let (task, participants) = load_task(&state.pool, id).await?;
    ensure_can_view_task(&participants, auth.user_id)?;

    let comments = TaskRepo::list_comments(&state.pool, id).await?;
    Ok(Json(ApiResponse::ok(
        "Task retrieved successfully",
        TaskResponse::new(task, Some(comments), Utc::now()),
    )))
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(input): ValidJson<CreateTaskRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<TaskResponse>>)> {
    let (project, members) = load_project(&state.pool, input.project).await?;
    let participants = project.participants(&members);
    ensure_can_create_task(&participants, auth.user_id)?;

    if project.is_archived {
        return Err(CoreError::invalid_field(
            "project",
            "Cannot add tasks to an archived project",
        )
        .into());
    }

    let now = Utc::now();
    validate_task_due_date(input.due_date, now)?;
    ensure_assignable(&participants, input.assigned_to)?;
    require_active_user(&state.pool, input.assigned_to, "assignedTo").await?;
    let dependencies =
        validate_dependencies(&state.pool, project.id, None, &input.dependencies).await?;

    let task_state = derive_task_state(
        &TaskState::initial(),
        &TaskChange {
            status: Some(input.status.unwrap_or_default()),
            progress: input.progress,
        },
        now,
    );

    let create = CreateTask {
        title: input.title.trim().to_string(),
        description: input.description.unwrap_or_default(),
        priority: input.priority.unwrap_or_default(),
        assigned_to: input.assigned_to,
        project_id: project.id,
        created_by: auth.user_id,
        due_date: input.due_date,
        start_date: input.start_date,
        estimated_hours: input.estimated_hours,
        actual_hours: input.actual_hours.unwrap_or(0.0),
        tags: input.tags.as_deref().map(normalize_tags).unwrap_or_default(),
        category: input.category.unwrap_or_default(),
        dependencies,
        attachments: input
            .attachments
            .into_iter()
            .map(|a| a.into_attachment(now))
            .collect(),
        blocked_reason: input.blocked_reason,
        state: task_state,
    };
    let task = TaskRepo::create(&state.pool, &create).await?;

    tracing::info!(
        task_id = task.id,
        project_id = task.project_id,
        user_id = auth.user_id,
        "Task created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Task created successfully",
            TaskResponse::new(task, None, now),
        )),
    ))
}

/// PUT /api/tasks/{id}
///
/// Project owner, task creator or assignee only.
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
    ValidJson(input): ValidJson<UpdateTaskRequest>,
) -> AppResult<Json<ApiResponse<TaskResponse>>> {
    let (task, participants) = load_task(&state.pool, id).await?;
    ensure_can_update_task(&participants, task.parties(), auth.user_id)?;

    let now = Utc::now();
    if let Some(due_date) = input.due_date {
        validate_task_due_date(due_date, now)?;
    }
    if let Some(assignee) = input.assigned_to {
        ensure_assignable(&participants, assignee)?;
        require_active_user(&state.pool, assignee, "assignedTo").await?;
    }
    let dependencies = match input.dependencies {
        Some(ref deps) => {
            Some(validate_dependencies(&state.pool, task.project_id, Some(id), deps).await?)
        }
        None => None,
    };

    let previous = task.state();
    let next = derive_task_state(
        &previous,
        &TaskChange {
            status: input.status,
            progress: input.progress,
        },
        now,
    );

    let update = UpdateTask {
        title: input.title.map(|t| t.trim().to_string()),
        description: input.description,
        priority: input.priority,
        assigned_to: input.assigned_to,
        due_date: input.due_date,
        start_date: input.start_date,
        estimated_hours: input.estimated_hours,
        actual_hours: input.actual_hours,
        tags: input.tags.as_deref().map(normalize_tags),
        category: input.category,
        dependencies,
        attachments: input
            .attachments
            .map(|list| list.into_iter().map(|a| a.into_attachment(now)).collect()),
        blocked_reason: input.blocked_reason.map(|r| r.trim().to_string()),
        state: next,
    };
    let updated = TaskRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(CoreError::NotFound { entity: "Task", id })?;

    if previous.status != next.status {
        tracing::info!(
            task_id = id,
            user_id = auth.user_id,
            from = %previous.status,
            to = %next.status,
            "Task status changed"
        );
    } else {
        tracing::info!(task_id = id, user_id = auth.user_id, "Task updated");
    }

    Ok(Json(ApiResponse::ok(
        "Task updated successfully",
        TaskResponse::new(updated, None, now),
    )))
}

/// DELETE /api/tasks/{id}
///
/// Project owner or task creator only. Archiving an archived task succeeds.
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<TaskRef>>> {
    let (task, participants) = load_task(&state.pool, id).await?;
    ensure_can_delete_task(&participants, task.parties(), auth.user_id)?;

    if TaskRepo::archive(&state.pool, id).await? {
        tracing::info!(task_id = id, user_id = auth.user_id, "Task archived");
    }

    Ok(Json(ApiResponse::ok(
        "Task archived successfully",
        TaskRef { id },
    )))
}

/// POST /api/tasks/{id}/comments
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
    ValidJson(input): ValidJson<CommentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CommentResponse>>)> {
    let (_task, participants) = load_task(&state.pool, id).await?;
    ensure_can_comment(&participants, auth.user_id)?;

    let comment = TaskRepo::add_comment(&state.pool, id, auth.user_id, input.content.trim()).await?;

    tracing::info!(task_id = id, user_id = auth.user_id, comment_id = comment.id, "Comment added");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Comment added successfully",
            CommentResponse::from(comment),
        )),
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_responses(tasks: Vec<Task>) -> Vec<TaskResponse> {
    let now = Utc::now();
    tasks
        .into_iter()
        .map(|task| TaskResponse::new(task, None, now))
        .collect()
}

/// Load a task and the participants of its parent project, or fail with
/// `TASK_NOT_FOUND`.
async fn load_task(pool: &DbPool, id: DbId) -> AppResult<(Task, ProjectParticipants)> {
    let task = TaskRepo::find_by_id(pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Task", id })?;
    let (project, members) = load_project(pool, task.project_id).await?;
    Ok((task, project.participants(&members)))
}

/// Deduplicate `requested` and check every id names a task in `project_id`
/// other than `task_id` itself.
async fn validate_dependencies(
    pool: &DbPool,
    project_id: DbId,
    task_id: Option<DbId>,
    requested: &[DbId],
) -> AppResult<Vec<DbId>> {
    let mut ids: Vec<DbId> = Vec::with_capacity(requested.len());
    for &dep in requested {
        if !ids.contains(&dep) {
            ids.push(dep);
        }
    }
    if ids.is_empty() {
        return Ok(ids);
    }

    if task_id.is_some_and(|own| ids.contains(&own)) {
        return Err(CoreError::invalid_field("dependencies", "A task cannot depend on itself").into());
    }

    let found = TaskRepo::count_in_project(pool, project_id, &ids).await?;
    if found != ids.len() as i64 {
        return Err(CoreError::invalid_field(
            "dependencies",
            "Dependencies must be existing tasks in the same project",
        )
        .into());
    }
    Ok(ids)
}
