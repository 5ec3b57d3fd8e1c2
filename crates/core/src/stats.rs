//! Fixed-shape dashboard counters.
//!
//! The database returns `(status, count)` pairs for whatever statuses are
//! present; these folds turn them into objects that always carry every key.

use serde::Serialize;

use crate::status::{ProjectStatus, TaskStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCounts {
    pub total: i64,
    pub planning: i64,
    pub in_progress: i64,
    pub on_hold: i64,
    pub completed: i64,
    pub cancelled: i64,
}

impl ProjectCounts {
    pub fn from_grouped(rows: impl IntoIterator<Item = (ProjectStatus, i64)>) -> Self {
        rows.into_iter()
            .fold(Self::default(), |mut acc, (status, count)| {
                acc.total += count;
                match status {
                    ProjectStatus::Planning => acc.planning += count,
                    ProjectStatus::InProgress => acc.in_progress += count,
                    ProjectStatus::OnHold => acc.on_hold += count,
                    ProjectStatus::Completed => acc.completed += count,
                    ProjectStatus::Cancelled => acc.cancelled += count,
                }
                acc
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCounts {
    pub total: i64,
    pub todo: i64,
    pub in_progress: i64,
    pub done: i64,
    pub overdue: i64,
}

impl TaskCounts {
    pub fn from_grouped(rows: impl IntoIterator<Item = (TaskStatus, i64)>, overdue: i64) -> Self {
        let mut counts = rows
            .into_iter()
            .fold(Self::default(), |mut acc, (status, count)| {
                acc.total += count;
                match status {
                    TaskStatus::Todo => acc.todo += count,
                    TaskStatus::InProgress => acc.in_progress += count,
                    TaskStatus::Done => acc.done += count,
                }
                acc
            });
        counts.overdue = overdue;
        counts
    }
}

/// Response body of `GET /projects/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProjectStats {
    pub projects: ProjectCounts,
    pub tasks: TaskCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_all_zero_keys() {
        let stats = ProjectStats::default();
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["projects"]["inProgress"], 0);
        assert_eq!(json["projects"]["onHold"], 0);
        assert_eq!(json["tasks"]["overdue"], 0);
        assert_eq!(json["projects"].as_object().unwrap().len(), 6);
        assert_eq!(json["tasks"].as_object().unwrap().len(), 5);
    }

    #[test]
    fn project_counts_sum_into_total() {
        let counts = ProjectCounts::from_grouped([
            (ProjectStatus::Planning, 2),
            (ProjectStatus::Completed, 3),
            (ProjectStatus::OnHold, 1),
        ]);
        assert_eq!(counts.total, 6);
        assert_eq!(counts.planning, 2);
        assert_eq!(counts.completed, 3);
        assert_eq!(counts.on_hold, 1);
        assert_eq!(counts.in_progress, 0);
    }

    #[test]
    fn task_counts_carry_overdue_separately() {
        let counts =
            TaskCounts::from_grouped([(TaskStatus::Todo, 4), (TaskStatus::Done, 1)], 2);
        assert_eq!(counts.total, 5);
        assert_eq!(counts.todo, 4);
        assert_eq!(counts.done, 1);
        assert_eq!(counts.overdue, 2);
    }
}
