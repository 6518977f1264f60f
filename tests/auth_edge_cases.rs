mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{recording_app, PASSWORD};
use orgtask::models::audit::AuditAction;

#[tokio::test]
async fn registration_validates_and_rejects_duplicates() -> Result<()> {
    let t = recording_app().await?;

    // 1. Short password
    let (status, body) = t
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": "short@example.com",
                "password": "short",
                "first_name": "Short",
                "last_name": "Pass"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "short password accepted: {body}");

    // 2. Malformed email
    let (status, _) = t
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": "not-an-email",
                "password": PASSWORD,
                "first_name": "Bad",
                "last_name": "Email"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 3. Missing field is reported by path
    let (status, body) = t
        .send("POST", "/api/auth/register", None, Some(json!({ "email": "x@example.com" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    // 4. Success makes the caller owner of a fresh organization
    let (token, user) = t.register("ada@example.com", "Ada").await?;
    assert!(!token.is_empty());
    assert_eq!(user["role"], "owner");

    let (status, orgs) = t.send("GET", "/api/organizations", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    let orgs = orgs.as_array().cloned().unwrap_or_default();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0]["name"], "Ada's Organization");
    assert_eq!(orgs[0]["id"], user["organization_id"]);

    // 5. Duplicate email
    let (status, body) = t
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": "ada@example.com",
                "password": PASSWORD,
                "first_name": "Ada",
                "last_name": "Again"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap_or_default().contains("already exists"));

    Ok(())
}

#[tokio::test]
async fn login_failures_are_unauthorized_and_audited() -> Result<()> {
    let t = recording_app().await?;
    t.register("grace@example.com", "Grace").await?;

    let (status, _) = t
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = t
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "grace@example.com", "password": "wrong-password" })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap_or_default().contains("Invalid credentials"));

    let denied: Vec<_> = t
        .recorder()
        .entries()
        .into_iter()
        .filter(|e| e.action == AuditAction::AccessDenied)
        .collect();
    assert_eq!(denied.len(), 2);
    assert!(denied.iter().all(|e| e.resource == "auth"));

    // Unknown address: no actor or organization to attach.
    assert_eq!(denied[0].actor_email, "nobody@example.com");
    assert_eq!(denied[0].actor_id, None);
    assert_eq!(denied[0].organization_id, None);
    assert!(denied[0].detail.as_deref().unwrap_or_default().contains("unknown email"));

    assert_eq!(denied[1].actor_email, "grace@example.com");
    assert!(denied[1].actor_id.is_some());

    t.login("grace@example.com").await?;
    assert!(t.recorder().entries().iter().any(|e| e.action == AuditAction::Login));

    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() -> Result<()> {
    let t = recording_app().await?;

    let (status, _) = t.send("GET", "/api/tasks", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.send("GET", "/api/tasks", Some("not-a-jwt"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.send("GET", "/api/auth/me", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Unauthenticated requests never reach the requirement gate.
    assert!(t.recorder().entries().is_empty());

    Ok(())
}

#[tokio::test]
async fn me_and_logout() -> Result<()> {
    let t = recording_app().await?;
    let (token, user) = t.register("linus@example.com", "Linus").await?;

    let (status, me) = t.send("GET", "/api/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user["id"]);
    assert_eq!(me["email"], "linus@example.com");

    let (status, body) = t.send("POST", "/api/auth/logout", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    assert!(t.recorder().entries().iter().any(|e| e.action == AuditAction::Logout));

    Ok(())
}
