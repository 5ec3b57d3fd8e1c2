//! Status/progress derivation for tasks and projects.
//!
//! Handlers never write `progress`, `completed_at` or `archived_at` directly.
//! They describe the caller's intent as a change set and persist whatever
//! these functions return, so the invariants hold on every write path:
//!
//! - task: `status == Done` iff `completed_at` is set; Done implies progress 100
//! - project: Completed implies progress 100, Planning implies progress 0
//! - project: `is_archived` iff `archived_at` is set

use crate::status::{ProjectStatus, TaskStatus};
use crate::types::{Progress, Timestamp};

/// Progress assigned when a task enters In Progress without an explicit value.
pub const IN_PROGRESS_DEFAULT: Progress = 25;

pub const COMPLETE: Progress = 100;

/// The derived fields of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskState {
    pub status: TaskStatus,
    pub progress: Progress,
    pub completed_at: Option<Timestamp>,
}

impl TaskState {
    /// State of a task that has not been written yet.
    pub fn initial() -> Self {
        Self {
            status: TaskStatus::Todo,
            progress: 0,
            completed_at: None,
        }
    }
}

/// What the caller asked to change. `None` means "not part of this write".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskChange {
    pub status: Option<TaskStatus>,
    pub progress: Option<Progress>,
}

/// Compute the task state that results from applying `change` to `current`.
pub fn derive_task_state(current: &TaskState, change: &TaskChange, now: Timestamp) -> TaskState {
    let explicit_progress = change.progress;
    let mut next = TaskState {
        status: current.status,
        progress: explicit_progress.unwrap_or(current.progress),
        completed_at: current.completed_at,
    };

    let Some(status) = change.status else {
        return next;
    };
    next.status = status;

    match status {
        TaskStatus::Done => {
            if current.status != TaskStatus::Done || next.completed_at.is_none() {
                next.completed_at = Some(now);
            }
            next.progress = COMPLETE;
        }
        TaskStatus::Todo => {
            next.completed_at = None;
            if explicit_progress.is_none() && next.progress == COMPLETE {
                next.progress = 0;
            }
        }
        TaskStatus::InProgress => {
            next.completed_at = None;
            if explicit_progress.is_none() && next.progress == 0 {
                next.progress = IN_PROGRESS_DEFAULT;
            }
        }
    }

    next
}

/// The derived fields of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectState {
    pub status: ProjectStatus,
    pub progress: Progress,
    pub is_archived: bool,
    pub archived_at: Option<Timestamp>,
}

impl ProjectState {
    pub fn initial() -> Self {
        Self {
            status: ProjectStatus::Planning,
            progress: 0,
            is_archived: false,
            archived_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectChange {
    pub status: Option<ProjectStatus>,
    pub progress: Option<Progress>,
    pub is_archived: Option<bool>,
}

/// Compute the project state that results from applying `change` to `current`.
///
/// Unlike tasks, the status rules are evaluated against the resulting state on
/// every write, so a Planning project cannot be given non-zero progress.
pub fn derive_project_state(
    current: &ProjectState,
    change: &ProjectChange,
    now: Timestamp,
) -> ProjectState {
    let mut next = ProjectState {
        status: change.status.unwrap_or(current.status),
        progress: change.progress.unwrap_or(current.progress),
        is_archived: change.is_archived.unwrap_or(current.is_archived),
        archived_at: current.archived_at,
    };

    match next.status {
        ProjectStatus::Completed if next.progress < COMPLETE => next.progress = COMPLETE,
        ProjectStatus::Planning if next.progress > 0 => next.progress = 0,
        _ => {}
    }

    if next.is_archived {
        if next.archived_at.is_none() {
            next.archived_at = Some(now);
        }
    } else {
        next.archived_at = None;
    }

    next
}

/// `true` when this transition newly archives the project (cascade required).
pub fn archives_now(current: &ProjectState, next: &ProjectState) -> bool {
    !current.is_archived && next.is_archived
}
