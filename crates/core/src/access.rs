//! Access policy for projects and tasks.
//!
//! Every check is all-or-nothing per entity and is evaluated against a
//! [`ProjectParticipants`] snapshot loaded by the caller. A failed check
//! yields [`CoreError::Forbidden`], which the API layer renders as
//! `403 ACCESS_DENIED`.
//!
//! | Operation                          | Allowed requester                          |
//! |------------------------------------|--------------------------------------------|
//! | Read project                       | owner or team member                       |
//! | Update/delete project, manage team | owner                                      |
//! | Read task, create task, comment    | owner or team member of the parent project |
//! | Update task                        | participant and (owner, creator, assignee) |
//! | Delete task                        | participant and (owner, creator)           |

use crate::error::CoreError;
use crate::types::DbId;

/// Who can see a project: its owner plus the current team members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectParticipants {
    pub owner_id: DbId,
    pub member_ids: Vec<DbId>,
}

impl ProjectParticipants {
    pub fn new(owner_id: DbId, member_ids: impl IntoIterator<Item = DbId>) -> Self {
        Self {
            owner_id,
            member_ids: member_ids.into_iter().collect(),
        }
    }

    pub fn is_owner(&self, user_id: DbId) -> bool {
        self.owner_id == user_id
    }

    pub fn is_member(&self, user_id: DbId) -> bool {
        self.member_ids.contains(&user_id)
    }

    /// Owner or team member.
    pub fn is_participant(&self, user_id: DbId) -> bool {
        self.is_owner(user_id) || self.is_member(user_id)
    }
}

/// The two user references on a task that grant rights beyond membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskParties {
    pub created_by: DbId,
    pub assigned_to: DbId,
}

/// Owner-only project operations, used to word the denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerAction {
    Update,
    Archive,
    ManageTeam,
}

impl OwnerAction {
    fn verb(self) -> &'static str {
        match self {
            OwnerAction::Update => "update this project",
            OwnerAction::Archive => "delete this project",
            OwnerAction::ManageTeam => "manage team members",
        }
    }
}

pub fn ensure_can_view_project(
    project: &ProjectParticipants,
    user_id: DbId,
) -> Result<(), CoreError> {
    if project.is_participant(user_id) {
        Ok(())
    } else {
        Err(CoreError::forbidden(
            "Access denied. You are not a member of this project.",
        ))
    }
}

pub fn ensure_project_owner(
    project: &ProjectParticipants,
    user_id: DbId,
    action: OwnerAction,
) -> Result<(), CoreError> {
    if project.is_owner(user_id) {
        Ok(())
    } else {
        Err(CoreError::forbidden(format!(
            "Access denied. Only the project owner can {}.",
            action.verb()
        )))
    }
}

pub fn ensure_can_view_task(project: &ProjectParticipants, user_id: DbId) -> Result<(), CoreError> {
    if project.is_participant(user_id) {
        Ok(())
    } else {
        Err(CoreError::forbidden(
            "Access denied. You do not have access to this task.",
        ))
    }
}

pub fn ensure_can_create_task(
    project: &ProjectParticipants,
    user_id: DbId,
) -> Result<(), CoreError> {
    if project.is_participant(user_id) {
        Ok(())
    } else {
        Err(CoreError::forbidden(
            "Access denied. You must be a member of this project to create tasks.",
        ))
    }
}

pub fn ensure_can_update_task(
    project: &ProjectParticipants,
    task: TaskParties,
    user_id: DbId,
) -> Result<(), CoreError> {
    ensure_can_view_task(project, user_id)?;
    if project.is_owner(user_id) || task.created_by == user_id || task.assigned_to == user_id {
        Ok(())
    } else {
        Err(CoreError::forbidden(
            "Access denied. Only the project owner, task creator, or assignee can update this task.",
        ))
    }
}

pub fn ensure_can_delete_task(
    project: &ProjectParticipants,
    task: TaskParties,
    user_id: DbId,
) -> Result<(), CoreError> {
    ensure_can_view_task(project, user_id)?;
    if project.is_owner(user_id) || task.created_by == user_id {
        Ok(())
    } else {
        Err(CoreError::forbidden(
            "Access denied. Only the project owner or task creator can delete this task.",
        ))
    }
}

pub fn ensure_can_comment(project: &ProjectParticipants, user_id: DbId) -> Result<(), CoreError> {
    if project.is_participant(user_id) {
        Ok(())
    } else {
        Err(CoreError::forbidden(
            "Access denied. You must be a member of this project to comment.",
        ))
    }
}

/// Tasks can only be assigned to someone who can see the project.
///
/// This is a field validation, not an authorization failure.
pub fn ensure_assignable(project: &ProjectParticipants, assignee_id: DbId) -> Result<(), CoreError> {
    if project.is_participant(assignee_id) {
        Ok(())
    } else {
        Err(CoreError::invalid_field(
            "assignedTo",
            "Assignee must be the project owner or a team member",
        ))
    }
}
