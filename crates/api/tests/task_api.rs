//! HTTP-level integration tests for the `/tasks` endpoints.
//!
//! Covers creation rules, status/progress derivation, the task access
//! policy, list scoping, comments and dependencies.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_project, create_task, days_from_today, delete_auth, expect_error, get_auth,
    post_json_auth, put_json_auth, signup, today, TestUser,
};
use serde_json::{json, Value};
use sqlx::PgPool;

/// Owner, member and outsider around one project.
struct Fixture {
    owner: TestUser,
    member: TestUser,
    outsider: TestUser,
    project_id: i64,
}

async fn fixture(pool: &PgPool) -> Fixture {
    let owner = signup(pool, "Owner").await;
    let member = signup(pool, "Member").await;
    let outsider = signup(pool, "Outsider").await;
    let project_id = create_project(
        pool,
        &owner,
        json!({ "title": "Shared", "teamMembers": [member.id] }),
    )
    .await;
    Fixture {
        owner,
        member,
        outsider,
        project_id,
    }
}

fn task_body(project_id: i64, assignee: i64) -> Value {
    json!({
        "title": "Write docs",
        "project": project_id,
        "assignedTo": assignee,
        "dueDate": days_from_today(7),
    })
}

async fn update(pool: &PgPool, user: &TestUser, task_id: i64, body: Value) -> Value {
    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(app, &format!("/api/tasks/{task_id}"), body, &user.token).await;
    let status = response.status();
    let json = body_json(response).await;
    assert_eq!(status, StatusCode::OK, "update failed: {json}");
    json["data"].clone()
}

fn ids(json: &Value) -> Vec<i64> {
    json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn create_task_applies_defaults(pool: PgPool) {
    let f = fixture(&pool).await;

    let task = create_task(&pool, &f.member, task_body(f.project_id, f.owner.id)).await;

    assert_eq!(task["status"], "Todo");
    assert_eq!(task["priority"], "Medium");
    assert_eq!(task["category"], "Other");
    assert_eq!(task["progress"], 0);
    assert!(task["completedAt"].is_null());
    assert_eq!(task["assignedTo"]["id"], f.owner.id);
    assert_eq!(task["createdBy"]["id"], f.member.id);
    assert_eq!(task["project"]["id"], f.project_id);
    assert_eq!(task["project"]["title"], "Shared");
    assert_eq!(task["isOverdue"], false);
    assert_eq!(task["isBlocked"], false);
    assert_eq!(task["commentCount"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_done_task_is_completed(pool: PgPool) {
    let f = fixture(&pool).await;
    let mut body = task_body(f.project_id, f.owner.id);
    body["status"] = json!("Done");

    let task = create_task(&pool, &f.owner, body).await;

    assert_eq!(task["progress"], 100);
    assert!(task["completedAt"].is_string());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn due_date_before_today_is_rejected(pool: PgPool) {
    let f = fixture(&pool).await;
    let mut body = task_body(f.project_id, f.owner.id);
    body["dueDate"] = json!(days_from_today(-1));

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/tasks", body, &f.owner.token).await;
    let json = expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
    assert!(json["errors"]["dueDate"].is_string());

    let mut body = task_body(f.project_id, f.owner.id);
    body["dueDate"] = json!(today());
    create_task(&pool, &f.owner, body).await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn required_fields_are_enforced(pool: PgPool) {
    let f = fixture(&pool).await;

    let app = common::build_test_app(pool);
    let body = json!({ "title": "No project", "assignedTo": f.owner.id, "dueDate": today() });
    let response = post_json_auth(app, "/api/tasks", body, &f.owner.token).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn assignee_must_be_on_the_project(pool: PgPool) {
    let f = fixture(&pool).await;

    let app = common::build_test_app(pool.clone());
    let body = task_body(f.project_id, f.outsider.id);
    let response = post_json_auth(app, "/api/tasks", body, &f.owner.token).await;
    let json = expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
    assert!(json["errors"]["assignedTo"].is_string());

    let task = create_task(&pool, &f.owner, task_body(f.project_id, f.owner.id)).await;
    let app = common::build_test_app(pool);
    let response = put_json_auth(
        app,
        &format!("/api/tasks/{}", task["id"]),
        json!({ "assignedTo": f.outsider.id }),
        &f.owner.token,
    )
    .await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn archived_project_accepts_no_new_tasks(pool: PgPool) {
    let f = fixture(&pool).await;
    let app = common::build_test_app(pool.clone());
    let response =
        delete_auth(app, &format!("/api/projects/{}", f.project_id), &f.owner.token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool);
    let response =
        post_json_auth(app, "/api/tasks", task_body(f.project_id, f.owner.id), &f.owner.token)
            .await;
    let json = expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
    assert!(json["errors"]["project"].is_string());
}

// ---------------------------------------------------------------------------
// Status / progress derivation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn status_transitions_derive_progress_and_completion(pool: PgPool) {
    let f = fixture(&pool).await;
    let task = create_task(&pool, &f.owner, task_body(f.project_id, f.member.id)).await;
    let id = task["id"].as_i64().unwrap();

    let task = update(&pool, &f.member, id, json!({ "status": "In Progress" })).await;
    assert_eq!(task["progress"], 25);
    assert!(task["completedAt"].is_null());

    let task = update(&pool, &f.member, id, json!({ "progress": 60 })).await;
    assert_eq!(task["status"], "In Progress");
    assert_eq!(task["progress"], 60);

    let task = update(&pool, &f.member, id, json!({ "status": "Done", "progress": 10 })).await;
    assert_eq!(task["progress"], 100);
    let completed_at = task["completedAt"].clone();
    assert!(completed_at.is_string());

    let task = update(&pool, &f.member, id, json!({ "status": "Done" })).await;
    assert_eq!(task["completedAt"], completed_at, "re-saving Done keeps completedAt");

    let task = update(&pool, &f.member, id, json!({ "status": "Todo" })).await;
    assert_eq!(task["progress"], 0);
    assert!(task["completedAt"].is_null());

    let task = update(&pool, &f.member, id, json!({ "status": "Todo", "progress": 30 })).await;
    assert_eq!(task["progress"], 30);

    let task = update(&pool, &f.member, id, json!({ "status": "In Progress" })).await;
    assert_eq!(task["progress"], 30);
    let task = update(&pool, &f.member, id, json!({ "status": "Todo" })).await;
    assert_eq!(task["progress"], 30, "partial progress survives a move back to Todo");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn blocked_reason_drives_is_blocked(pool: PgPool) {
    let f = fixture(&pool).await;
    let task = create_task(&pool, &f.owner, task_body(f.project_id, f.owner.id)).await;
    let id = task["id"].as_i64().unwrap();

    let task = update(&pool, &f.owner, id, json!({ "blockedReason": "Waiting on API keys" })).await;
    assert_eq!(task["isBlocked"], true);
    assert_eq!(task["blockedReason"], "Waiting on API keys");

    let task = update(&pool, &f.owner, id, json!({ "title": "Renamed" })).await;
    assert_eq!(task["isBlocked"], true);

    let task = update(&pool, &f.owner, id, json!({ "blockedReason": "" })).await;
    assert_eq!(task["isBlocked"], false);
    assert!(task["blockedReason"].is_null());
}

// ---------------------------------------------------------------------------
// Access policy
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn outsider_is_denied_every_task_operation(pool: PgPool) {
    let f = fixture(&pool).await;
    let task = create_task(&pool, &f.owner, task_body(f.project_id, f.owner.id)).await;
    let uri = format!("/api/tasks/{}", task["id"]);

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/tasks",
        task_body(f.project_id, f.outsider.id),
        &f.outsider.token,
    )
    .await;
    expect_error(response, StatusCode::FORBIDDEN, "ACCESS_DENIED").await;

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, &uri, &f.outsider.token).await;
    expect_error(response, StatusCode::FORBIDDEN, "ACCESS_DENIED").await;

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(app, &uri, json!({ "title": "Hijacked" }), &f.outsider.token).await;
    expect_error(response, StatusCode::FORBIDDEN, "ACCESS_DENIED").await;

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &uri, &f.outsider.token).await;
    expect_error(response, StatusCode::FORBIDDEN, "ACCESS_DENIED").await;

    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        &format!("{uri}/comments"),
        json!({ "content": "hello" }),
        &f.outsider.token,
    )
    .await;
    expect_error(response, StatusCode::FORBIDDEN, "ACCESS_DENIED").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn update_and_delete_rights_follow_task_roles(pool: PgPool) {
    let f = fixture(&pool).await;
    let third = signup(&pool, "Third").await;
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/projects/{}/team-members", f.project_id),
        json!({ "userId": third.id }),
        &f.owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Created by the owner, assigned to the member.
    let task = create_task(&pool, &f.owner, task_body(f.project_id, f.member.id)).await;
    let uri = format!("/api/tasks/{}", task["id"]);

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(app, &uri, json!({ "title": "Nope" }), &third.token).await;
    expect_error(response, StatusCode::FORBIDDEN, "ACCESS_DENIED").await;

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(app, &uri, json!({ "title": "Assignee edit" }), &f.member.token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &uri, &f.member.token).await;
    expect_error(response, StatusCode::FORBIDDEN, "ACCESS_DENIED").await;

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &uri, &f.owner.token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool);
    let response = delete_auth(app, &uri, &f.owner.token).await;
    assert_eq!(response.status(), StatusCode::OK, "archiving twice is harmless");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_task_is_not_found(pool: PgPool) {
    let f = fixture(&pool).await;

    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/tasks/999999", &f.owner.token).await;
    expect_error(response, StatusCode::NOT_FOUND, "TASK_NOT_FOUND").await;
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn list_never_leaks_foreign_tasks(pool: PgPool) {
    let f = fixture(&pool).await;
    create_task(&pool, &f.owner, task_body(f.project_id, f.owner.id)).await;

    let app = common::build_test_app(pool.clone());
    let uri = format!("/api/tasks?project={}", f.project_id);
    let response = get_auth(app, &uri, &f.outsider.token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["count"], 0);

    let app = common::build_test_app(pool);
    let response = get_auth(app, &uri, &f.member.token).await;
    assert_eq!(body_json(response).await["count"], 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn list_filters_assignee_overdue_and_search(pool: PgPool) {
    let f = fixture(&pool).await;
    let mine = create_task(&pool, &f.member, task_body(f.project_id, f.member.id)).await;
    let mut body = task_body(f.project_id, f.owner.id);
    body["title"] = json!("Fix 100% of bugs");
    body["tags"] = json!(["backend"]);
    let theirs = create_task(&pool, &f.member, body).await;

    sqlx::query("UPDATE tasks SET due_date = NOW() - INTERVAL '2 days' WHERE id = $1")
        .bind(theirs["id"].as_i64().unwrap())
        .execute(&pool)
        .await
        .unwrap();

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/tasks?assignedTo=me", &f.member.token).await;
    assert_eq!(ids(&body_json(response).await), vec![mine["id"].as_i64().unwrap()]);

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/tasks/my-tasks", &f.member.token).await;
    assert_eq!(ids(&body_json(response).await), vec![mine["id"].as_i64().unwrap()]);

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/tasks/overdue", &f.member.token).await;
    let json = body_json(response).await;
    assert_eq!(ids(&json), vec![theirs["id"].as_i64().unwrap()]);
    assert_eq!(json["data"][0]["isOverdue"], true);

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/tasks?overdue=true", &f.member.token).await;
    assert_eq!(body_json(response).await["count"], 1);

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/tasks?search=100%25", &f.member.token).await;
    assert_eq!(ids(&body_json(response).await), vec![theirs["id"].as_i64().unwrap()]);

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/tasks?search=BACKEND", &f.member.token).await;
    assert_eq!(body_json(response).await["count"], 1);

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/tasks?assignedTo=someone", &f.member.token).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/tasks?status=Blocked", &f.member.token).await;
    let json = expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
    assert!(json["errors"]["status"].as_str().unwrap().contains("Blocked"));

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/tasks?project=abc", &f.member.token).await;
    let json = expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
    assert!(json["errors"]["project"].is_string());

    // An "All" selection in a filter form submits empty values.
    let app = common::build_test_app(pool.clone());
    let all = get_auth(app, "/api/tasks", &f.member.token).await;
    let expected = body_json(all).await["count"].clone();
    let app = common::build_test_app(pool);
    let response = get_auth(
        app,
        "/api/tasks?status=&priority=&category=&project=&assignedTo=&search=&sortBy=&order=",
        &f.member.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["count"], expected);
}

// ---------------------------------------------------------------------------
// Comments and dependencies
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn comments_are_appended_and_returned_with_task(pool: PgPool) {
    let f = fixture(&pool).await;
    let task = create_task(&pool, &f.owner, task_body(f.project_id, f.owner.id)).await;
    let uri = format!("/api/tasks/{}", task["id"]);

    for (user, content) in [(&f.owner, "first"), (&f.member, "second")] {
        let app = common::build_test_app(pool.clone());
        let response =
            post_json_auth(app, &format!("{uri}/comments"), json!({ "content": content }), &user.token)
                .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["content"], content);
        assert_eq!(json["data"]["user"]["id"], user.id);
    }

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("{uri}/comments"),
        json!({ "content": "   " }),
        &f.member.token,
    )
    .await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    let app = common::build_test_app(pool);
    let response = get_auth(app, &uri, &f.member.token).await;
    let json = body_json(response).await;
    let comments = json["data"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["content"], "first");
    assert_eq!(comments[1]["content"], "second");
    assert_eq!(json["data"]["commentCount"], 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn dependencies_must_stay_within_the_project(pool: PgPool) {
    let f = fixture(&pool).await;
    let other_project = create_project(&pool, &f.owner, json!({ "title": "Other" })).await;
    let foreign = create_task(&pool, &f.owner, task_body(other_project, f.owner.id)).await;
    let base = create_task(&pool, &f.owner, task_body(f.project_id, f.owner.id)).await;
    let base_id = base["id"].as_i64().unwrap();

    let mut body = task_body(f.project_id, f.owner.id);
    body["dependencies"] = json!([base_id, base_id]);
    let dependent = create_task(&pool, &f.owner, body).await;
    assert_eq!(dependent["dependencies"], json!([base_id]));

    let mut body = task_body(f.project_id, f.owner.id);
    body["dependencies"] = json!([foreign["id"]]);
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/tasks", body, &f.owner.token).await;
    let json = expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
    assert!(json["errors"]["dependencies"].is_string());

    let app = common::build_test_app(pool);
    let response = put_json_auth(
        app,
        &format!("/api/tasks/{base_id}"),
        json!({ "dependencies": [base_id] }),
        &f.owner.token,
    )
    .await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn attachments_are_stamped_and_validated(pool: PgPool) {
    let f = fixture(&pool).await;

    let mut body = task_body(f.project_id, f.owner.id);
    body["attachments"] = json!([{ "name": "spec.pdf", "url": "https://files.example.com/spec.pdf", "size": 2048 }]);
    let task = create_task(&pool, &f.owner, body).await;
    assert_eq!(task["attachments"][0]["name"], "spec.pdf");
    assert!(task["attachments"][0]["uploadedAt"].is_string());

    let mut body = task_body(f.project_id, f.owner.id);
    body["attachments"] = json!([{ "name": "bad", "url": "not a url" }]);
    let app = common::build_test_app(pool);
    let response = post_json_auth(app, "/api/tasks", body, &f.owner.token).await;
    let json = expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
    assert!(json["errors"]["attachments[0].url"].is_string());
}
