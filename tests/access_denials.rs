mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{id_of, recording_app, temp_pool};
use orgtask::audit::{AuditEvent, RecordingAuditSink, RequestContext};
use orgtask::authz::{AccessPolicy, Actor, PermissionTable, Role};
use orgtask::db;
use orgtask::errors::AppError;
use orgtask::models::audit::AuditAction;
use orgtask::models::organization::Organization;
use orgtask::models::task::TaskCreateRequest;
use orgtask::models::user::User;
use orgtask::services::{self, ServiceContext};

fn message(body: &Value) -> &str {
    body["message"].as_str().unwrap_or_default()
}

fn denials(entries: Vec<AuditEvent>) -> Vec<AuditEvent> {
    entries
        .into_iter()
        .filter(|e| e.action == AuditAction::AccessDenied)
        .collect()
}

async fn seed_member(pool: &sqlx::SqlitePool, org: Uuid, email: &str, role: Role) -> Result<Actor> {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        first_name: "Seed".to_string(),
        last_name: "Member".to_string(),
        role,
        organization_id: org,
        created_at: now,
        updated_at: now,
    };
    db::users::insert(pool, &user, "unused").await?;
    Ok(Actor::from(&user))
}

#[tokio::test]
async fn viewer_task_delete_is_denied_by_policy_and_audited_once() -> Result<()> {
    let (_dir, pool) = temp_pool().await?;
    let now = Utc::now();
    let org = Organization {
        id: Uuid::new_v4(),
        name: "Policy".to_string(),
        description: None,
        parent_id: None,
        created_at: now,
        updated_at: now,
    };
    db::organizations::insert(&pool, &org).await?;
    let owner = seed_member(&pool, org.id, "owner@policy.test", Role::Owner).await?;
    let viewer = seed_member(&pool, org.id, "viewer@policy.test", Role::Viewer).await?;

    let policy = AccessPolicy::new(PermissionTable::standard());
    let sink = RecordingAuditSink::new();
    let ctx = ServiceContext::new(&pool, &policy, &sink, RequestContext::default());

    let task = services::tasks::create(
        &ctx,
        &owner,
        TaskCreateRequest {
            title: "Keep me".to_string(),
            description: None,
            status: None,
            category: None,
            priority: None,
            due_date: None,
        },
    )
    .await?;

    let err = services::tasks::delete(&ctx, &viewer, task.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let reason = err.denial_reason().unwrap_or_default();
    assert!(reason.contains("Viewers cannot delete"), "unexpected reason: {reason}");

    let denied = denials(sink.entries());
    assert_eq!(denied.len(), 1);
    assert_eq!(denied[0].actor_id, Some(viewer.id));
    assert_eq!(denied[0].resource, "task");
    assert_eq!(denied[0].resource_id, Some(task.id));
    assert_eq!(denied[0].detail.as_deref(), Some(reason));

    assert!(db::tasks::find_by_id(&pool, task.id).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn route_requirements_reject_before_handlers() -> Result<()> {
    let t = recording_app().await?;
    let (owner, _) = t.register("owner@gate.test", "Gina").await?;
    let (viewer, _) = t.add_member(&owner, "viewer@gate.test", "viewer", None).await?;
    let task_id = id_of(&t.create_task(&owner, "guarded").await?);

    let before = denials(t.recorder().entries()).len();
    let (status, body) = t.send("DELETE", &format!("/api/tasks/{task_id}"), Some(&viewer), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert!(message(&body).contains("Required permissions: task:delete"), "unexpected reason: {body}");

    let denied = denials(t.recorder().entries());
    assert_eq!(denied.len(), before + 1);
    assert_eq!(denied[before].resource, "task");

    let (status, _) = t.send("GET", &format!("/api/tasks/{task_id}"), Some(&viewer), None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t
        .send("POST", "/api/tasks", Some(&viewer), Some(json!({ "title": "sneaky" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t.send("GET", "/api/audit-log", Some(&viewer), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(message(&body).contains("Required roles: owner, admin"), "unexpected reason: {body}");

    Ok(())
}

#[tokio::test]
async fn user_management_rules() -> Result<()> {
    let t = recording_app().await?;
    let (owner, owner_user) = t.register("owner@users.test", "Uma").await?;
    let (admin, admin_user) = t.add_member(&owner, "admin@users.test", "admin", None).await?;

    // Admins hand out viewer only.
    let (status, body) = t
        .send(
            "POST",
            "/api/users",
            Some(&admin),
            Some(json!({
                "email": "promoted@users.test",
                "password": common::PASSWORD,
                "first_name": "Pro",
                "last_name": "Moted",
                "role": "admin"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(message(&body).contains("Admins can only assign Viewer role"));

    let (_, viewer_user) = t.add_member(&admin, "viewer@users.test", "viewer", None).await?;
    assert_eq!(viewer_user["role"], "viewer");
    let viewer_id = id_of(&viewer_user);

    // Duplicate email.
    let (status, _) = t
        .send(
            "POST",
            "/api/users",
            Some(&owner),
            Some(json!({
                "email": "viewer@users.test",
                "password": common::PASSWORD,
                "first_name": "Dup",
                "last_name": "Licate"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, renamed) = t
        .send("PUT", &format!("/api/users/{viewer_id}"), Some(&admin), Some(json!({ "first_name": "Vic" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["first_name"], "Vic");

    let (status, _) = t
        .send("PUT", &format!("/api/users/{viewer_id}"), Some(&admin), Some(json!({ "role": "admin" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin_id = id_of(&admin_user);
    let (status, body) = t
        .send("PUT", &format!("/api/users/{admin_id}"), Some(&admin), Some(json!({ "role": "viewer" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(message(&body).contains("Cannot change your own role"));

    // Admins lack user:delete.
    let (status, _) = t.send("DELETE", &format!("/api/users/{viewer_id}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner_id = id_of(&owner_user);
    let (status, body) = t
        .send("PUT", &format!("/api/users/{owner_id}"), Some(&admin), Some(json!({ "role": "viewer" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(message(&body).contains("Cannot change the role of a user above your own"));
    let (status, owner_after) = t.send("GET", &format!("/api/users/{owner_id}"), Some(&owner), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(owner_after["role"], "owner");

    let (status, body) = t.send("DELETE", &format!("/api/users/{owner_id}"), Some(&owner), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(message(&body).contains("Cannot delete your own account"));

    let (status, demoted) = t
        .send("PUT", &format!("/api/users/{admin_id}"), Some(&owner), Some(json!({ "role": "viewer" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(demoted["role"], "viewer");

    let (status, _) = t.send("DELETE", &format!("/api/users/{viewer_id}"), Some(&owner), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, users) = t.send("GET", "/api/users", Some(&owner), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().map(Vec::len), Some(2));

    Ok(())
}
