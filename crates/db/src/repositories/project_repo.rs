//! Repository for the `projects` and `project_members` tables.

use sqlx::{PgPool, Postgres, Transaction};
use taskboard_core::listing::ProjectSortField;
use taskboard_core::types::DbId;

use crate::models::project::{
    CreateProject, NewMember, Project, ProjectFilter, ProjectMember, UpdateProject,
};
use crate::repositories::sql::{accessible_project, priority_rank, text_search};

/// Project columns joined with the owner's display columns.
const SELECT: &str = "SELECT \
    p.id, p.title, p.description, p.status, p.priority, p.owner_id, \
    p.start_date, p.due_date, p.progress, p.tags, \
    p.budget_allocated, p.budget_spent, p.budget_currency, \
    p.is_archived, p.archived_at, p.created_at, p.updated_at, \
    u.name AS owner_name, u.email AS owner_email, u.avatar AS owner_avatar \
    FROM projects p \
    JOIN users u ON u.id = p.owner_id";

/// Member columns joined with the user's display columns.
const MEMBER_SELECT: &str = "SELECT \
    pm.project_id, pm.user_id, pm.role, pm.joined_at, \
    u.name, u.email, u.avatar \
    FROM project_members pm \
    JOIN users u ON u.id = pm.user_id";

/// Marks every live task of project `$1` archived.
const CASCADE_ARCHIVE: &str =
    "UPDATE tasks SET is_archived = true WHERE project_id = $1 AND is_archived = false";

fn sort_column(field: ProjectSortField) -> String {
    match field {
        ProjectSortField::CreatedAt => "p.created_at".to_string(),
        ProjectSortField::UpdatedAt => "p.updated_at".to_string(),
        ProjectSortField::Title => "LOWER(p.title)".to_string(),
        ProjectSortField::Status => "p.status".to_string(),
        ProjectSortField::Priority => priority_rank("p.priority"),
        ProjectSortField::Progress => "p.progress".to_string(),
        ProjectSortField::StartDate => "p.start_date".to_string(),
        ProjectSortField::DueDate => "p.due_date".to_string(),
    }
}

/// Provides CRUD operations for projects and their team rosters.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a project and its initial team in one transaction.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO projects
                (title, description, status, priority, owner_id, start_date, due_date,
                 progress, tags, budget_allocated, budget_spent, budget_currency,
                 is_archived, archived_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING id",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.state.status.as_str())
        .bind(input.priority.as_str())
        .bind(input.owner_id)
        .bind(input.start_date)
        .bind(input.due_date)
        .bind(input.state.progress)
        .bind(&input.tags)
        .bind(input.budget.allocated)
        .bind(input.budget.spent)
        .bind(&input.budget.currency)
        .bind(input.state.is_archived)
        .bind(input.state.archived_at)
        .fetch_one(&mut *tx)
        .await?;

        for member in &input.members {
            sqlx::query(
                "INSERT INTO project_members (project_id, user_id, role) VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(member.user_id)
            .bind(member.role.as_str())
            .execute(&mut *tx)
            .await?;
        }

        let query = format!("{SELECT} WHERE p.id = $1");
        let project = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(project)
    }

    /// Find a project by ID, archived or not.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("{SELECT} WHERE p.id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the projects `user_id` owns or is a team member of.
    pub async fn list_accessible(
        pool: &PgPool,
        user_id: DbId,
        filter: &ProjectFilter,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let mut conditions = vec![accessible_project(1)];
        let mut bind_idx = 2u32;

        if !filter.include_archived {
            conditions.push("p.is_archived = false".to_string());
        }
        if filter.status.is_some() {
            conditions.push(format!("p.status = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.priority.is_some() {
            conditions.push(format!("p.priority = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.search.is_some() {
            conditions.push(text_search("p", bind_idx));
        }

        let direction = filter.sort.order.as_sql();
        let query = format!(
            "{SELECT} WHERE {conditions} \
             ORDER BY {column} {direction} NULLS LAST, p.id {direction}",
            conditions = conditions.join(" AND "),
            column = sort_column(filter.sort.field),
        );

        let mut q = sqlx::query_as::<_, Project>(&query).bind(user_id);
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority.as_str());
        }
        if let Some(ref pattern) = filter.search {
            q = q.bind(pattern);
        }
        q.fetch_all(pool).await
    }

    /// List a project's team members in join order.
    pub async fn list_members(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<ProjectMember>, sqlx::Error> {
        let query =
            format!("{MEMBER_SELECT} WHERE pm.project_id = $1 ORDER BY pm.joined_at, pm.user_id");
        sqlx::query_as::<_, ProjectMember>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// List team members for several projects at once.
    pub async fn list_members_for(
        pool: &PgPool,
        project_ids: &[DbId],
    ) -> Result<Vec<ProjectMember>, sqlx::Error> {
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "{MEMBER_SELECT} WHERE pm.project_id = ANY($1) \
             ORDER BY pm.project_id, pm.joined_at, pm.user_id"
        );
        sqlx::query_as::<_, ProjectMember>(&query)
            .bind(project_ids)
            .fetch_all(pool)
            .await
    }

    /// Update a project. Only non-`None` fields in `input` are applied; the
    /// lifecycle fields in `input.state` are always written.
    ///
    /// A `members` roster replaces the team, and when the resulting state is
    /// archived the project's tasks are archived, all in the same transaction.
    /// Returns `None` if the project does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated: Option<(DbId,)> = sqlx::query_as(
            "UPDATE projects SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                start_date = COALESCE($5, start_date),
                due_date = CASE WHEN $15 THEN $6 ELSE due_date END,
                tags = COALESCE($7, tags),
                budget_allocated = COALESCE($8, budget_allocated),
                budget_spent = COALESCE($9, budget_spent),
                budget_currency = COALESCE($10, budget_currency),
                status = $11,
                progress = $12,
                is_archived = $13,
                archived_at = $14
             WHERE id = $1
             RETURNING id",
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.priority.map(|p| p.as_str()))
        .bind(input.start_date)
        .bind(input.due_date.flatten())
        .bind(&input.tags)
        .bind(input.budget_allocated)
        .bind(input.budget_spent)
        .bind(&input.budget_currency)
        .bind(input.state.status.as_str())
        .bind(input.state.progress)
        .bind(input.state.is_archived)
        .bind(input.state.archived_at)
        .bind(input.due_date.is_some())
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }

        if let Some(ref members) = input.members {
            let keep: Vec<DbId> = members.iter().map(|m| m.user_id).collect();
            sqlx::query(
                "DELETE FROM project_members WHERE project_id = $1 AND NOT (user_id = ANY($2))",
            )
            .bind(id)
            .bind(&keep)
            .execute(&mut *tx)
            .await?;
            for member in members {
                sqlx::query(
                    "INSERT INTO project_members (project_id, user_id, role)
                     VALUES ($1, $2, $3)
                     ON CONFLICT (project_id, user_id) DO NOTHING",
                )
                .bind(id)
                .bind(member.user_id)
                .bind(member.role.as_str())
                .execute(&mut *tx)
                .await?;
            }
        }

        if input.state.is_archived {
            let result = sqlx::query(CASCADE_ARCHIVE).bind(id).execute(&mut *tx).await?;
            tracing::debug!(project_id = id, tasks = result.rows_affected(), "Cascaded archive");
        }

        let query = format!("{SELECT} WHERE p.id = $1");
        let project = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(project))
    }

    /// Soft-delete a project and archive all of its tasks in one transaction.
    ///
    /// Returns the number of tasks archived, or `None` if the project does not
    /// exist.
    pub async fn archive(pool: &PgPool, id: DbId) -> Result<Option<u64>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let archived: Option<(DbId,)> = sqlx::query_as(
            "UPDATE projects SET
                is_archived = true,
                archived_at = COALESCE(archived_at, NOW())
             WHERE id = $1
             RETURNING id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if archived.is_none() {
            return Ok(None);
        }

        let result = sqlx::query(CASCADE_ARCHIVE).bind(id).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(Some(result.rows_affected()))
    }

    /// Add a team member. Returns `false` if the user is already on the team.
    pub async fn add_member(
        pool: &PgPool,
        project_id: DbId,
        member: &NewMember,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO project_members (project_id, user_id, role)
             VALUES ($1, $2, $3)
             ON CONFLICT (project_id, user_id) DO NOTHING",
        )
        .bind(project_id)
        .bind(member.user_id)
        .bind(member.role.as_str())
        .execute(&mut *tx)
        .await?;
        let added = result.rows_affected() > 0;
        if added {
            touch(&mut tx, project_id).await?;
        }
        tx.commit().await?;
        Ok(added)
    }

    /// Remove a team member. Returns `true` if a membership row was deleted.
    pub async fn remove_member(
        pool: &PgPool,
        project_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let result =
            sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
                .bind(project_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        let removed = result.rows_affected() > 0;
        if removed {
            touch(&mut tx, project_id).await?;
        }
        tx.commit().await?;
        Ok(removed)
    }
}

/// Bump `projects.updated_at` (via its trigger) after a roster change.
async fn touch(tx: &mut Transaction<'_, Postgres>, project_id: DbId) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE projects SET updated_at = NOW() WHERE id = $1")
        .bind(project_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
