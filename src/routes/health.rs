use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct DatabaseHealth {
    pub ok: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when every dependency answers, `degraded` otherwise.
    pub status: &'static str,
    pub version: &'static str,
    pub database: DatabaseHealth,
}

impl HealthResponse {
    fn from_database(database: DatabaseHealth) -> (StatusCode, Self) {
        let (code, status) = if database.ok {
            (StatusCode::OK, "ok")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "degraded")
        };
        (code, Self { status, version: env!("CARGO_PKG_VERSION"), database })
    }
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service and database are up", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let started = Instant::now();
    let check = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM organizations")
        .fetch_one(&state.pool)
        .await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let database = match check {
        Ok(_) => DatabaseHealth { ok: true, latency_ms, error: None },
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            DatabaseHealth { ok: false, latency_ms, error: Some(e.to_string()) }
        }
    };
    let (code, body) = HealthResponse::from_database(database);
    (code, Json(body))
}
