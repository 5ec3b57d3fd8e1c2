//! Integration tests for project persistence against a real database:
//! - Initial team members are stored with the project
//! - Listing is scoped to owned and shared projects
//! - Archiving cascades to every task of the project in one step
//! - Team membership uniqueness and `updated_at` on roster changes
//! - Due dates can be cleared

use chrono::{Duration, Utc};
use sqlx::PgPool;
use taskboard_core::derivation::{ProjectState, TaskState};
use taskboard_core::listing::{ProjectSortField, Sort, SortOrder};
use taskboard_core::status::{Priority, ProjectStatus, TaskCategory, TeamRole};
use taskboard_core::types::DbId;
use taskboard_db::models::project::{
    Budget, CreateProject, NewMember, ProjectFilter, UpdateProject,
};
use taskboard_db::models::task::CreateTask;
use taskboard_db::models::user::CreateUser;
use taskboard_db::repositories::{ProjectRepo, StatsRepo, TaskRepo, UserRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn user(pool: &PgPool, email: &str) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            department: None,
        },
    )
    .await
    .unwrap()
    .id
}

fn new_project(owner_id: DbId, title: &str, members: Vec<NewMember>) -> CreateProject {
    CreateProject {
        title: title.to_string(),
        description: String::new(),
        priority: Priority::Medium,
        owner_id,
        start_date: Utc::now(),
        due_date: None,
        tags: vec![],
        budget: Budget::default(),
        members,
        state: ProjectState::initial(),
    }
}

fn new_task(project_id: DbId, user_id: DbId, title: &str) -> CreateTask {
    CreateTask {
        title: title.to_string(),
        description: String::new(),
        priority: Priority::High,
        assigned_to: user_id,
        project_id,
        created_by: user_id,
        due_date: Utc::now() + Duration::days(3),
        start_date: None,
        estimated_hours: None,
        actual_hours: 0.0,
        tags: vec![],
        category: TaskCategory::Development,
        dependencies: vec![],
        attachments: vec![],
        blocked_reason: None,
        state: TaskState::initial(),
    }
}

fn no_changes(state: ProjectState) -> UpdateProject {
    UpdateProject {
        title: None,
        description: None,
        priority: None,
        start_date: None,
        due_date: None,
        tags: None,
        budget_allocated: None,
        budget_spent: None,
        budget_currency: None,
        members: None,
        state,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn create_stores_initial_members(pool: PgPool) {
    let owner = user(&pool, "owner@example.com").await;
    let member = user(&pool, "member@example.com").await;

    let project = ProjectRepo::create(
        &pool,
        &new_project(
            owner,
            "Website",
            vec![NewMember {
                user_id: member,
                role: TeamRole::Lead,
            }],
        ),
    )
    .await
    .unwrap();

    assert_eq!(project.owner_id, owner);
    assert_eq!(project.owner_email, "owner@example.com");
    assert_eq!(project.status, ProjectStatus::Planning);
    assert_eq!(project.budget_currency, "USD");

    let members = ProjectRepo::list_members(&pool, project.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, member);
    assert_eq!(members[0].role, TeamRole::Lead);
    assert!(project.participants(&members).is_member(member));
}

#[sqlx::test(migrations = "./migrations")]
async fn list_accessible_excludes_foreign_projects(pool: PgPool) {
    let alice = user(&pool, "alice@example.com").await;
    let bob = user(&pool, "bob@example.com").await;

    ProjectRepo::create(&pool, &new_project(alice, "Alpha", vec![])).await.unwrap();
    ProjectRepo::create(&pool, &new_project(bob, "Beta", vec![])).await.unwrap();
    ProjectRepo::create(
        &pool,
        &new_project(
            bob,
            "Gamma",
            vec![NewMember {
                user_id: alice,
                role: TeamRole::Member,
            }],
        ),
    )
    .await
    .unwrap();

    let filter = ProjectFilter {
        sort: Sort {
            field: ProjectSortField::Title,
            order: SortOrder::Asc,
        },
        ..Default::default()
    };
    let titles: Vec<String> = ProjectRepo::list_accessible(&pool, alice, &filter)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["Alpha".to_string(), "Gamma".to_string()]);
}

#[sqlx::test(migrations = "./migrations")]
async fn search_matches_tags_and_escapes_wildcards(pool: PgPool) {
    let owner = user(&pool, "owner@example.com").await;
    let mut tagged = new_project(owner, "Tagged", vec![]);
    tagged.tags = vec!["backend".to_string()];
    ProjectRepo::create(&pool, &tagged).await.unwrap();
    ProjectRepo::create(&pool, &new_project(owner, "100% done", vec![])).await.unwrap();
    ProjectRepo::create(&pool, &new_project(owner, "1000 things", vec![])).await.unwrap();

    let by_tag = ProjectFilter {
        search: taskboard_core::listing::search_pattern("BACK"),
        ..Default::default()
    };
    let found = ProjectRepo::list_accessible(&pool, owner, &by_tag).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Tagged");

    let literal_percent = ProjectFilter {
        search: taskboard_core::listing::search_pattern("100%"),
        ..Default::default()
    };
    let found = ProjectRepo::list_accessible(&pool, owner, &literal_percent)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "100% done");
}

#[sqlx::test(migrations = "./migrations")]
async fn archive_cascades_to_tasks(pool: PgPool) {
    let owner = user(&pool, "owner@example.com").await;
    let project = ProjectRepo::create(&pool, &new_project(owner, "Doomed", vec![]))
        .await
        .unwrap();
    let t1 = TaskRepo::create(&pool, &new_task(project.id, owner, "one")).await.unwrap();
    let t2 = TaskRepo::create(&pool, &new_task(project.id, owner, "two")).await.unwrap();

    let archived = ProjectRepo::archive(&pool, project.id).await.unwrap();
    assert_eq!(archived, Some(2));

    let project = ProjectRepo::find_by_id(&pool, project.id).await.unwrap().unwrap();
    assert!(project.is_archived);
    assert!(project.archived_at.is_some());
    for id in [t1.id, t2.id] {
        let task = TaskRepo::find_by_id(&pool, id).await.unwrap().unwrap();
        assert!(task.is_archived);
    }

    let hidden = ProjectRepo::list_accessible(&pool, owner, &ProjectFilter::default())
        .await
        .unwrap();
    assert!(hidden.is_empty());
    let shown = ProjectRepo::list_accessible(
        &pool,
        owner,
        &ProjectFilter {
            include_archived: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(shown.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn archive_missing_project_returns_none(pool: PgPool) {
    assert_eq!(ProjectRepo::archive(&pool, 9999).await.unwrap(), None);
}

#[sqlx::test(migrations = "./migrations")]
async fn update_to_archived_cascades(pool: PgPool) {
    let owner = user(&pool, "owner@example.com").await;
    let project = ProjectRepo::create(&pool, &new_project(owner, "Old", vec![]))
        .await
        .unwrap();
    let task = TaskRepo::create(&pool, &new_task(project.id, owner, "t")).await.unwrap();

    let mut state = project.state();
    state.is_archived = true;
    state.archived_at = Some(Utc::now());
    let updated = ProjectRepo::update(&pool, project.id, &no_changes(state))
        .await
        .unwrap()
        .unwrap();
    assert!(updated.is_archived);

    let task = TaskRepo::find_by_id(&pool, task.id).await.unwrap().unwrap();
    assert!(task.is_archived);
}

#[sqlx::test(migrations = "./migrations")]
async fn due_date_can_be_set_and_cleared(pool: PgPool) {
    let owner = user(&pool, "owner@example.com").await;
    let project = ProjectRepo::create(&pool, &new_project(owner, "Dated", vec![]))
        .await
        .unwrap();
    let due = Utc::now() + Duration::days(30);

    let mut set = no_changes(project.state());
    set.due_date = Some(Some(due));
    let updated = ProjectRepo::update(&pool, project.id, &set).await.unwrap().unwrap();
    assert!(updated.due_date.is_some());

    let untouched = ProjectRepo::update(&pool, project.id, &no_changes(updated.state()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.due_date, updated.due_date);

    let mut clear = no_changes(untouched.state());
    clear.due_date = Some(None);
    let cleared = ProjectRepo::update(&pool, project.id, &clear).await.unwrap().unwrap();
    assert_eq!(cleared.due_date, None);
}

#[sqlx::test(migrations = "./migrations")]
async fn member_changes_bump_updated_at(pool: PgPool) {
    let owner = user(&pool, "owner@example.com").await;
    let member = user(&pool, "member@example.com").await;
    let project = ProjectRepo::create(&pool, &new_project(owner, "P", vec![]))
        .await
        .unwrap();
    let new_member = NewMember {
        user_id: member,
        role: TeamRole::Viewer,
    };

    assert!(ProjectRepo::add_member(&pool, project.id, &new_member).await.unwrap());
    let after_add = ProjectRepo::find_by_id(&pool, project.id).await.unwrap().unwrap();
    assert!(after_add.updated_at > project.updated_at);

    assert!(ProjectRepo::remove_member(&pool, project.id, member).await.unwrap());
    let after_remove = ProjectRepo::find_by_id(&pool, project.id).await.unwrap().unwrap();
    assert!(after_remove.updated_at > after_add.updated_at);
}

#[sqlx::test(migrations = "./migrations")]
async fn archived_flag_requires_timestamp(pool: PgPool) {
    let owner = user(&pool, "owner@example.com").await;
    let project = ProjectRepo::create(&pool, &new_project(owner, "P", vec![]))
        .await
        .unwrap();

    let mut state = project.state();
    state.is_archived = true;
    state.archived_at = None;
    let result = ProjectRepo::update(&pool, project.id, &no_changes(state)).await;
    assert!(result.is_err(), "ck_projects_archived_at must reject the row");
}

#[sqlx::test(migrations = "./migrations")]
async fn add_member_is_unique_per_project(pool: PgPool) {
    let owner = user(&pool, "owner@example.com").await;
    let member = user(&pool, "member@example.com").await;
    let project = ProjectRepo::create(&pool, &new_project(owner, "P", vec![]))
        .await
        .unwrap();
    let new_member = NewMember {
        user_id: member,
        role: TeamRole::Member,
    };

    assert!(ProjectRepo::add_member(&pool, project.id, &new_member).await.unwrap());
    assert!(!ProjectRepo::add_member(&pool, project.id, &new_member).await.unwrap());
    assert!(ProjectRepo::remove_member(&pool, project.id, member).await.unwrap());
    assert!(!ProjectRepo::remove_member(&pool, project.id, member).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn stats_count_only_live_accessible_rows(pool: PgPool) {
    let owner = user(&pool, "owner@example.com").await;
    let stranger = user(&pool, "stranger@example.com").await;
    let live = ProjectRepo::create(&pool, &new_project(owner, "Live", vec![]))
        .await
        .unwrap();
    let gone = ProjectRepo::create(&pool, &new_project(owner, "Gone", vec![]))
        .await
        .unwrap();
    TaskRepo::create(&pool, &new_task(live.id, owner, "a")).await.unwrap();
    TaskRepo::create(&pool, &new_task(gone.id, owner, "b")).await.unwrap();
    ProjectRepo::archive(&pool, gone.id).await.unwrap();

    let stats = StatsRepo::for_user(&pool, owner).await.unwrap();
    assert_eq!(stats.projects.total, 1);
    assert_eq!(stats.projects.planning, 1);
    assert_eq!(stats.tasks.total, 1);
    assert_eq!(stats.tasks.todo, 1);
    assert_eq!(stats.tasks.overdue, 0);

    let empty = StatsRepo::for_user(&pool, stranger).await.unwrap();
    assert_eq!(empty.projects.total, 0);
    assert_eq!(empty.tasks.total, 0);
}
