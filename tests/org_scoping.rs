mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{id_of, recording_app, TestApp};

fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .map(|items| items.iter().map(id_of).collect())
        .unwrap_or_default()
}

async fn create_org(t: &TestApp, token: &str, name: &str) -> Result<Value> {
    let (status, org) = t
        .send("POST", "/api/organizations", Some(token), Some(json!({ "name": name })))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "org create failed: {org}");
    Ok(org)
}

fn message(body: &Value) -> &str {
    body["message"].as_str().unwrap_or_default()
}

/// Root -> Child -> Grandchild, each with its own members and a task.
#[tokio::test]
async fn access_reaches_one_level_of_child_organizations() -> Result<()> {
    let t = recording_app().await?;

    let (owner_root, owner_user) = t.register("owner@root.test", "Rita").await?;
    let root_id = owner_user["organization_id"].as_str().unwrap_or_default().to_string();

    let child = create_org(&t, &owner_root, "Child").await?;
    let child_id = id_of(&child);
    assert_eq!(child["parent_id"].as_str(), Some(root_id.as_str()));

    let (owner_child, _) = t.add_member(&owner_root, "owner@child.test", "owner", Some(&child_id)).await?;
    let (admin_child, _) = t.add_member(&owner_root, "admin@child.test", "admin", Some(&child_id)).await?;
    let (viewer_child, _) = t.add_member(&owner_root, "viewer@child.test", "viewer", Some(&child_id)).await?;

    let grandchild = create_org(&t, &owner_child, "Grandchild").await?;
    let grandchild_id = id_of(&grandchild);
    assert_eq!(grandchild["parent_id"].as_str(), Some(child_id.as_str()));

    let (admin_grandchild, _) = t
        .add_member(&owner_child, "admin@grandchild.test", "admin", Some(&grandchild_id))
        .await?;

    let task_root = id_of(&t.create_task(&owner_root, "root task").await?);
    let task_child = id_of(&t.create_task(&owner_child, "child task").await?);
    let task_grandchild = t.create_task(&admin_grandchild, "grandchild task").await?;
    assert_eq!(task_grandchild["organization_id"].as_str(), Some(grandchild_id.as_str()));
    let task_grandchild = id_of(&task_grandchild);

    // Admin in the grandchild sees only its own organization.
    let (status, _) = t
        .send("GET", &format!("/api/tasks/{task_grandchild}"), Some(&admin_grandchild), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    for other in [&task_child, &task_root] {
        let (status, body) = t.send("GET", &format!("/api/tasks/{other}"), Some(&admin_grandchild), None).await?;
        assert_eq!(status, StatusCode::FORBIDDEN, "grandchild admin reached {other}");
        assert!(message(&body).contains("cross-organization"), "unexpected reason: {body}");
    }
    let (_, listed) = t.send("GET", "/api/tasks", Some(&admin_grandchild), None).await?;
    assert_eq!(ids(&listed), vec![task_grandchild.clone()]);

    // The root owner sees its child but not the grandchild.
    let (_, listed) = t.send("GET", "/api/tasks", Some(&owner_root), None).await?;
    let listed = ids(&listed);
    assert!(listed.contains(&task_root));
    assert!(listed.contains(&task_child));
    assert!(!listed.contains(&task_grandchild));

    let (status, _) = t
        .send("GET", &format!("/api/tasks/{task_grandchild}"), Some(&owner_root), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, orgs) = t.send("GET", "/api/organizations", Some(&owner_root), None).await?;
    let mut org_ids = ids(&orgs);
    org_ids.sort();
    let mut expected = vec![root_id.clone(), child_id.clone()];
    expected.sort();
    assert_eq!(org_ids, expected);

    // Owners may modify child organization resources.
    let (status, updated) = t
        .send(
            "PUT",
            &format!("/api/tasks/{task_child}"),
            Some(&owner_root),
            Some(json!({ "title": "renamed by root" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "renamed by root");

    // Admins read child resources but only modify their own organization.
    let (status, _) = t
        .send("GET", &format!("/api/tasks/{task_grandchild}"), Some(&admin_child), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = t
        .send(
            "PUT",
            &format!("/api/tasks/{task_grandchild}"),
            Some(&admin_child),
            Some(json!({ "title": "nope" })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(message(&body).contains("own organization"), "unexpected reason: {body}");

    // Viewers never see child organizations.
    let (status, _) = t
        .send("GET", &format!("/api/tasks/{task_grandchild}"), Some(&viewer_child), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, orgs) = t.send("GET", "/api/organizations", Some(&viewer_child), None).await?;
    assert_eq!(ids(&orgs), vec![child_id.clone()]);
    let (status, _) = t
        .send("GET", &format!("/api/organizations/{grandchild_id}"), Some(&viewer_child), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, own) = t
        .send("GET", &format!("/api/organizations/{child_id}"), Some(&viewer_child), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(id_of(&own), child_id);
    let (_, listed) = t.send("GET", "/api/tasks", Some(&viewer_child), None).await?;
    assert_eq!(ids(&listed), vec![task_child.clone()]);

    Ok(())
}

#[tokio::test]
async fn organization_management_rules() -> Result<()> {
    let t = recording_app().await?;

    let (owner, owner_user) = t.register("owner@org.test", "Olga").await?;
    let root_id = owner_user["organization_id"].as_str().unwrap_or_default().to_string();
    let (admin, _) = t.add_member(&owner, "admin@org.test", "admin", None).await?;

    // Admins lack org:create.
    let (status, body) = t
        .send("POST", "/api/organizations", Some(&admin), Some(json!({ "name": "Side" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(message(&body).contains("org:create"), "unexpected reason: {body}");

    let child = create_org(&t, &owner, "Child").await?;
    let child_id = id_of(&child);

    // A child owner cannot attach organizations under someone else's.
    let (child_owner, _) = t.add_member(&owner, "owner@child.test", "owner", Some(&child_id)).await?;
    let (status, body) = t
        .send(
            "POST",
            "/api/organizations",
            Some(&child_owner),
            Some(json!({ "name": "Sibling", "parent_id": root_id })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(message(&body).contains("under your own organization"), "unexpected reason: {body}");

    // Own organization cannot be deleted.
    let (status, body) = t
        .send("DELETE", &format!("/api/organizations/{root_id}"), Some(&owner), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(message(&body).contains("Cannot delete your own organization"));

    // Child with members is refused.
    let (status, _) = t
        .send("DELETE", &format!("/api/organizations/{child_id}"), Some(&owner), None)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // Empty child goes away.
    let empty = id_of(&create_org(&t, &owner, "Empty").await?);
    let (status, renamed) = t
        .send(
            "PUT",
            &format!("/api/organizations/{empty}"),
            Some(&owner),
            Some(json!({ "name": "Still empty" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Still empty");

    let (status, _) = t
        .send("DELETE", &format!("/api/organizations/{empty}"), Some(&owner), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = t
        .send("GET", &format!("/api/organizations/{empty}"), Some(&owner), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}
