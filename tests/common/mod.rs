#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`

use orgtask::audit::{AuditSink, RecordingAuditSink, StoreAuditSink};
use orgtask::create_app_with;
use orgtask::jwt::JwtConfig;

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub recorder: Option<Arc<RecordingAuditSink>>,
    _dir: TempDir,
}

/// Fresh migrated database file in a temp dir.
pub async fn temp_pool() -> Result<(TempDir, SqlitePool)> {
    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;
    Ok((dir, pool))
}

/// App whose audit events are kept in memory.
pub async fn recording_app() -> Result<TestApp> {
    let (dir, pool) = temp_pool().await?;
    let recorder = Arc::new(RecordingAuditSink::new());
    let sink: Arc<dyn AuditSink> = recorder.clone();
    let app = create_app_with(pool.clone(), JwtConfig::new("test-secret", 1), sink);
    Ok(TestApp {
        app,
        pool,
        recorder: Some(recorder),
        _dir: dir,
    })
}

/// App whose audit events are written to `audit_logs` before the response.
pub async fn stored_app() -> Result<TestApp> {
    let (dir, pool) = temp_pool().await?;
    let sink: Arc<dyn AuditSink> = Arc::new(StoreAuditSink::new(pool.clone()));
    let app = create_app_with(pool.clone(), JwtConfig::new("test-secret", 1), sink);
    Ok(TestApp {
        app,
        pool,
        recorder: None,
        _dir: dir,
    })
}

impl TestApp {
    pub fn recorder(&self) -> &RecordingAuditSink {
        self.recorder.as_deref().expect("app was built without a recording sink")
    }

    pub async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    /// Registers a new owner and returns `(token, user)`.
    pub async fn register(&self, email: &str, first_name: &str) -> Result<(String, Value)> {
        let (status, body) = self
            .send(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "first_name": first_name,
                    "last_name": "Tester"
                })),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        Ok((token_of(&body), body["user"].clone()))
    }

    pub async fn login(&self, email: &str) -> Result<String> {
        let (status, body) = self
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        Ok(token_of(&body))
    }

    /// Creates a user through the API as `creator` and logs them in.
    pub async fn add_member(&self, creator: &str, email: &str, role: &str, organization_id: Option<&str>) -> Result<(String, Value)> {
        let mut payload = json!({
            "email": email,
            "password": PASSWORD,
            "first_name": "Member",
            "last_name": "Tester",
            "role": role
        });
        if let Some(org) = organization_id {
            payload["organization_id"] = json!(org);
        }
        let (status, user) = self.send("POST", "/api/users", Some(creator), Some(payload)).await?;
        assert_eq!(status, StatusCode::CREATED, "user create failed: {user}");
        Ok((self.login(email).await?, user))
    }

    pub async fn create_task(&self, token: &str, title: &str) -> Result<Value> {
        let (status, task) = self
            .send("POST", "/api/tasks", Some(token), Some(json!({ "title": title })))
            .await?;
        assert_eq!(status, StatusCode::CREATED, "task create failed: {task}");
        Ok(task)
    }
}

pub fn token_of(body: &Value) -> String {
    body["access_token"].as_str().unwrap_or_default().to_string()
}

pub fn id_of(body: &Value) -> String {
    body["id"].as_str().unwrap_or_default().to_string()
}
