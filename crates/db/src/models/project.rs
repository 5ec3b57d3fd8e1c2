//! Project entity model, team membership and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use taskboard_core::access::ProjectParticipants;
use taskboard_core::derivation::ProjectState;
use taskboard_core::listing::{ProjectSortField, Sort};
use taskboard_core::status::{Priority, ProjectStatus, TeamRole};
use taskboard_core::types::{DbId, Progress, Timestamp};

use crate::models::user::UserSummary;

/// A project row joined with its owner's display columns.
#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub id: DbId,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub owner_id: DbId,
    pub start_date: Timestamp,
    pub due_date: Option<Timestamp>,
    pub progress: Progress,
    pub tags: Vec<String>,
    pub budget_allocated: f64,
    pub budget_spent: f64,
    pub budget_currency: String,
    pub is_archived: bool,
    pub archived_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_avatar: Option<String>,
}

impl Project {
    /// The derived-state slice of this row.
    pub fn state(&self) -> ProjectState {
        ProjectState {
            status: self.status,
            progress: self.progress,
            is_archived: self.is_archived,
            archived_at: self.archived_at,
        }
    }

    pub fn participants(&self, members: &[ProjectMember]) -> ProjectParticipants {
        ProjectParticipants::new(self.owner_id, members.iter().map(|m| m.user_id))
    }

    pub fn owner(&self) -> UserSummary {
        UserSummary {
            id: self.owner_id,
            name: self.owner_name.clone(),
            email: self.owner_email.clone(),
            avatar: self.owner_avatar.clone(),
        }
    }
}

/// A `project_members` row joined with the member's display columns.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectMember {
    pub project_id: DbId,
    pub user_id: DbId,
    #[sqlx(try_from = "String")]
    pub role: TeamRole,
    pub joined_at: Timestamp,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    pub allocated: f64,
    pub spent: f64,
    pub currency: String,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            allocated: 0.0,
            spent: 0.0,
            currency: "USD".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberResponse {
    pub user: UserSummary,
    pub role: TeamRole,
    pub joined_at: Timestamp,
}

impl From<ProjectMember> for TeamMemberResponse {
    fn from(member: ProjectMember) -> Self {
        Self {
            user: UserSummary {
                id: member.user_id,
                name: member.name,
                email: member.email,
                avatar: member.avatar,
            },
            role: member.role,
            joined_at: member.joined_at,
        }
    }
}

/// API representation of a project with owner and team embedded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub owner: UserSummary,
    pub team_members: Vec<TeamMemberResponse>,
    pub start_date: Timestamp,
    pub due_date: Option<Timestamp>,
    pub progress: Progress,
    pub tags: Vec<String>,
    pub budget: Budget,
    pub is_archived: bool,
    pub archived_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProjectResponse {
    pub fn new(project: Project, members: Vec<ProjectMember>) -> Self {
        let owner = project.owner();
        Self {
            id: project.id,
            title: project.title,
            description: project.description,
            status: project.status,
            priority: project.priority,
            owner,
            team_members: members.into_iter().map(TeamMemberResponse::from).collect(),
            start_date: project.start_date,
            due_date: project.due_date,
            progress: project.progress,
            tags: project.tags,
            budget: Budget {
                allocated: project.budget_allocated,
                spent: project.budget_spent,
                currency: project.budget_currency,
            },
            is_archived: project.is_archived,
            archived_at: project.archived_at,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// An initial or added team member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewMember {
    pub user_id: DbId,
    pub role: TeamRole,
}

/// DTO for creating a project. Derived fields come from `state`.
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub owner_id: DbId,
    pub start_date: Timestamp,
    pub due_date: Option<Timestamp>,
    pub tags: Vec<String>,
    pub budget: Budget,
    pub members: Vec<NewMember>,
    pub state: ProjectState,
}

/// DTO for updating a project.
///
/// `None` fields are left untouched; the derived lifecycle fields in `state`
/// are always written.
#[derive(Debug, Clone)]
pub struct UpdateProject {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub start_date: Option<Timestamp>,
    /// `Some(None)` clears the due date.
    pub due_date: Option<Option<Timestamp>>,
    pub tags: Option<Vec<String>>,
    pub budget_allocated: Option<f64>,
    pub budget_spent: Option<f64>,
    pub budget_currency: Option<String>,
    /// Replacement roster. Existing members keep their role and join date.
    pub members: Option<Vec<NewMember>>,
    pub state: ProjectState,
}

/// Filters for listing the projects a user can see.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    /// Pre-built `ILIKE` pattern, see [`taskboard_core::listing::search_pattern`].
    pub search: Option<String>,
    pub include_archived: bool,
    pub sort: Sort<ProjectSortField>,
}
