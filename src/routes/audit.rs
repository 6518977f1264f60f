use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::jwt::AuthUser;
use crate::models::audit::{AuditLogPage, AuditLogQuery};
use crate::services;

#[utoipa::path(
    get,
    path = "/api/audit-log",
    tag = "Audit",
    security(("bearerAuth" = [])),
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Audit entries, newest first", body = AuditLogPage),
        (status = 400, description = "Invalid pagination"),
        (status = 403, description = "Owner or admin role required")
    )
)]
pub async fn list_audit_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AuditLogQuery>,
    auth: AuthUser,
) -> AppResult<Json<AuditLogPage>> {
    let ctx = state.services(&headers);
    Ok(Json(services::audit_log::list(&ctx, &auth.actor, query).await?))
}
