//! Handlers for the `/projects` resource, including team management.

use std::collections::HashMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskboard_core::access::{ensure_can_view_project, ensure_project_owner, OwnerAction};
use taskboard_core::dates::{
    deserialize_clearable_timestamp, deserialize_optional_timestamp, validate_project_dates,
};
use taskboard_core::derivation::{archives_now, derive_project_state, ProjectChange, ProjectState};
use taskboard_core::error::CoreError;
use taskboard_core::listing::{search_pattern, ProjectSortField, Sort, SortOrder};
use taskboard_core::stats::ProjectStats;
use taskboard_core::status::{Priority, ProjectStatus, TeamRole};
use taskboard_core::types::{DbId, Progress, Timestamp};
use taskboard_core::validation::{
    normalize_tags, validate_currency, validate_not_blank, validate_tags,
};
use taskboard_db::models::project::{
    Budget, CreateProject, NewMember, Project, ProjectFilter, ProjectMember, ProjectResponse,
    UpdateProject,
};
use taskboard_db::repositories::{ProjectRepo, StatsRepo};
use taskboard_db::DbPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::handlers::{query_enum, require_active_user};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct BudgetInput {
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Allocated budget cannot be negative"))]
    pub allocated: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Spent budget cannot be negative"))]
    pub spent: f64,
    #[validate(custom(function = "validate_currency"))]
    pub currency: Option<String>,
}

/// Request body for `POST /projects`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(
        length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub title: String,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub start_date: Option<Timestamp>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub due_date: Option<Timestamp>,
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<Progress>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
    #[validate(nested)]
    pub budget: Option<BudgetInput>,
    #[serde(default)]
    pub team_members: Vec<DbId>,
}

/// Request body for `PUT /projects/{id}`. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[validate(
        length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub title: Option<String>,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub start_date: Option<Timestamp>,
    /// `null` clears the due date.
    #[serde(default, deserialize_with = "deserialize_clearable_timestamp")]
    pub due_date: Option<Option<Timestamp>>,
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<Progress>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
    #[validate(nested)]
    pub budget: Option<BudgetInput>,
    pub team_members: Option<Vec<DbId>>,
    pub is_archived: Option<bool>,
}

/// Request body for `POST /projects/{id}/team-members`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: DbId,
    pub role: Option<TeamRole>,
}

/// Query parameters for `GET /projects`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
}

impl ProjectListQuery {
    fn into_filter(self) -> AppResult<ProjectFilter> {
        let sort_by: Option<ProjectSortField> = query_enum("sortBy", self.sort_by.as_deref())?;
        let order: Option<SortOrder> = query_enum("order", self.order.as_deref())?;
        Ok(ProjectFilter {
            status: query_enum("status", self.status.as_deref())?,
            priority: query_enum("priority", self.priority.as_deref())?,
            search: self.search.as_deref().and_then(search_pattern),
            include_archived: self.include_archived,
            sort: Sort {
                field: sort_by.unwrap_or_default(),
                order: order.unwrap_or_default(),
            },
        })
    }
}

/// Payload returned by `DELETE /projects/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveResult {
    pub id: DbId,
    pub archived_tasks: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/projects
///
/// Projects the caller owns or is a team member of.
pub async fn list_projects(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ProjectListQuery>,
) -> AppResult<Json<ApiResponse<Vec<ProjectResponse>>>> {
    let filter = query.into_filter()?;
    let projects = ProjectRepo::list_accessible(&state.pool, auth.user_id, &filter).await?;

    let ids: Vec<DbId> = projects.iter().map(|p| p.id).collect();
    let mut members_by_project: HashMap<DbId, Vec<ProjectMember>> = HashMap::new();
    for member in ProjectRepo::list_members_for(&state.pool, &ids).await? {
        members_by_project
            .entry(member.project_id)
            .or_default()
            .push(member);
    }

    let data = projects
        .into_iter()
        .map(|project| {
            let members = members_by_project.remove(&project.id).unwrap_or_default();
            ProjectResponse::new(project, members)
        })
        .collect();

    Ok(Json(ApiResponse::list("Projects retrieved successfully", data)))
}

/// GET /api/projects/stats
pub async fn get_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<ProjectStats>>> {
    let stats = StatsRepo::for_user(&state.pool, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(
        "Project statistics retrieved successfully",
        stats,
    )))
}

/// GET /api/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<ProjectResponse>>> {
    let (project, members) = load_project(&state.pool, id).await?;
    ensure_can_view_project(&project.participants(&members), auth.user_id)?;

    Ok(Json(ApiResponse::ok(
        "Project retrieved successfully",
        ProjectResponse::new(project, members),
    )))
}

/// POST /api/projects
///
/// The caller becomes the owner. `teamMembers` entries naming the owner or
/// repeating a user are dropped.
pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(input): ValidJson<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProjectResponse>>)> {
    let now = Utc::now();
    let start_date = input.start_date.unwrap_or(now);
    validate_project_dates(start_date, input.due_date)?;

    let members = resolve_roster(&state.pool, auth.user_id, &input.team_members).await?;

    let project_state = derive_project_state(
        &ProjectState::initial(),
        &ProjectChange {
            status: input.status,
            progress: input.progress,
            is_archived: None,
        },
        now,
    );

    let budget = match input.budget {
        Some(b) => Budget {
            allocated: b.allocated,
            spent: b.spent,
            currency: b.currency.unwrap_or_else(|| Budget::default().currency),
        },
        None => Budget::default(),
    };

    let create = CreateProject {
        title: input.title.trim().to_string(),
        description: input.description.unwrap_or_default(),
        priority: input.priority.unwrap_or_default(),
        owner_id: auth.user_id,
        start_date,
        due_date: input.due_date,
        tags: input.tags.as_deref().map(normalize_tags).unwrap_or_default(),
        budget,
        members,
        state: project_state,
    };
    let project = ProjectRepo::create(&state.pool, &create).await?;
    let members = ProjectRepo::list_members(&state.pool, project.id).await?;

    tracing::info!(
        project_id = project.id,
        user_id = auth.user_id,
        members = members.len(),
        "Project created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Project created successfully",
            ProjectResponse::new(project, members),
        )),
    ))
}

/// PUT /api/projects/{id}
///
/// Owner only. Setting `isArchived: true` archives every task of the project.
pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
    ValidJson(input): ValidJson<UpdateProjectRequest>,
) -> AppResult<Json<ApiResponse<ProjectResponse>>> {
    let (project, members) = load_project(&state.pool, id).await?;
    ensure_project_owner(
        &project.participants(&members),
        auth.user_id,
        OwnerAction::Update,
    )?;

    validate_project_dates(
        input.start_date.unwrap_or(project.start_date),
        input.due_date.unwrap_or(project.due_date),
    )?;

    let roster = match input.team_members {
        Some(ref ids) => Some(resolve_roster(&state.pool, project.owner_id, ids).await?),
        None => None,
    };

    let current = project.state();
    let next = derive_project_state(
        &current,
        &ProjectChange {
            status: input.status,
            progress: input.progress,
            is_archived: input.is_archived,
        },
        Utc::now(),
    );

    let (budget_allocated, budget_spent, budget_currency) = match input.budget {
        Some(b) => (Some(b.allocated), Some(b.spent), b.currency),
        None => (None, None, None),
    };

    let update = UpdateProject {
        title: input.title.map(|t| t.trim().to_string()),
        description: input.description,
        priority: input.priority,
        start_date: input.start_date,
        due_date: input.due_date,
        tags: input.tags.as_deref().map(normalize_tags),
        budget_allocated,
        budget_spent,
        budget_currency,
        members: roster,
        state: next,
    };
    let updated = ProjectRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Project",
            id,
        })?;
    let members = ProjectRepo::list_members(&state.pool, id).await?;

    if archives_now(&current, &next) {
        tracing::info!(project_id = id, user_id = auth.user_id, "Project archived via update");
    } else {
        tracing::info!(project_id = id, user_id = auth.user_id, "Project updated");
    }

    Ok(Json(ApiResponse::ok(
        "Project updated successfully",
        ProjectResponse::new(updated, members),
    )))
}

/// DELETE /api/projects/{id}
///
/// Owner only. Soft-deletes the project together with all of its tasks.
pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<ArchiveResult>>> {
    let (project, members) = load_project(&state.pool, id).await?;
    ensure_project_owner(
        &project.participants(&members),
        auth.user_id,
        OwnerAction::Archive,
    )?;

    if project.is_archived {
        return Err(CoreError::Validation("Project is already archived".to_string()).into());
    }

    let archived_tasks = ProjectRepo::archive(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Project",
            id,
        })?;

    tracing::info!(project_id = id, user_id = auth.user_id, archived_tasks, "Project archived");

    Ok(Json(ApiResponse::ok(
        "Project archived successfully",
        ArchiveResult { id, archived_tasks },
    )))
}

/// POST /api/projects/{id}/team-members
pub async fn add_team_member(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
    ValidJson(input): ValidJson<AddMemberRequest>,
) -> AppResult<Json<ApiResponse<ProjectResponse>>> {
    let (project, members) = load_project(&state.pool, id).await?;
    ensure_project_owner(
        &project.participants(&members),
        auth.user_id,
        OwnerAction::ManageTeam,
    )?;

    if input.user_id == project.owner_id {
        return Err(CoreError::invalid_field(
            "userId",
            "The project owner is already part of the team",
        )
        .into());
    }
    require_active_user(&state.pool, input.user_id, "userId").await?;

    let member = NewMember {
        user_id: input.user_id,
        role: input.role.unwrap_or_default(),
    };
    if !ProjectRepo::add_member(&state.pool, id, &member).await? {
        return Err(AppError::Core(CoreError::Duplicate {
            field: "member",
            message: "User is already a team member".to_string(),
        }));
    }

    tracing::info!(
        project_id = id,
        user_id = auth.user_id,
        member_id = member.user_id,
        role = %member.role,
        "Team member added"
    );

    let (project, members) = load_project(&state.pool, id).await?;
    Ok(Json(ApiResponse::ok(
        "Team member added successfully",
        ProjectResponse::new(project, members),
    )))
}

/// DELETE /api/projects/{id}/team-members/{user_id}
pub async fn remove_team_member(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((id, member_id)): ApiPath<(DbId, DbId)>,
) -> AppResult<Json<ApiResponse<ProjectResponse>>> {
    let (project, members) = load_project(&state.pool, id).await?;
    ensure_project_owner(
        &project.participants(&members),
        auth.user_id,
        OwnerAction::ManageTeam,
    )?;

    if !ProjectRepo::remove_member(&state.pool, id, member_id).await? {
        return Err(CoreError::NotFound {
            entity: "Team member",
            id: member_id,
        }
        .into());
    }

    tracing::info!(project_id = id, user_id = auth.user_id, member_id, "Team member removed");

    let (project, members) = load_project(&state.pool, id).await?;
    Ok(Json(ApiResponse::ok(
        "Team member removed successfully",
        ProjectResponse::new(project, members),
    )))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a project and its current team, or fail with `PROJECT_NOT_FOUND`.
pub(crate) async fn load_project(
    pool: &DbPool,
    id: DbId,
) -> AppResult<(Project, Vec<ProjectMember>)> {
    let project = ProjectRepo::find_by_id(pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Project",
            id,
        })?;
    let members = ProjectRepo::list_members(pool, id).await?;
    Ok((project, members))
}

/// Turn requested member ids into a roster, skipping the owner and repeats.
/// Every remaining id must name an active user.
async fn resolve_roster(
    pool: &DbPool,
    owner_id: DbId,
    user_ids: &[DbId],
) -> AppResult<Vec<NewMember>> {
    let mut roster: Vec<NewMember> = Vec::with_capacity(user_ids.len());
    for &user_id in user_ids {
        if user_id == owner_id || roster.iter().any(|m| m.user_id == user_id) {
            continue;
        }
        require_active_user(pool, user_id, "teamMembers").await?;
        roster.push(NewMember {
            user_id,
            role: TeamRole::default(),
        });
    }
    Ok(roster)
}
