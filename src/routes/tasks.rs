use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::extract::ValidJson;
use crate::jwt::AuthUser;
use crate::models::task::{Task, TaskCreateRequest, TaskListQuery, TaskReorderRequest, TaskStats, TaskUpdateRequest};
use crate::services;

#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "Tasks",
    security(("bearerAuth" = [])),
    params(TaskListQuery),
    responses(
        (status = 200, description = "Tasks visible to the caller", body = [Task]),
        (status = 403, description = "Missing task:read")
    )
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TaskListQuery>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Task>>> {
    let ctx = state.services(&headers);
    Ok(Json(services::tasks::list(&ctx, &auth.actor, query).await?))
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "Tasks",
    security(("bearerAuth" = [])),
    request_body = TaskCreateRequest,
    responses(
        (status = 201, description = "Task created at the end of its column", body = Task),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Missing task:create")
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    auth: AuthUser,
    ValidJson(payload): ValidJson<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let ctx = state.services(&headers);
    let task = services::tasks::create(&ctx, &auth.actor, payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/api/tasks/stats",
    tag = "Tasks",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Task counts per status", body = TaskStats))
)]
pub async fn task_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    auth: AuthUser,
) -> AppResult<Json<TaskStats>> {
    let ctx = state.services(&headers);
    Ok(Json(services::tasks::stats(&ctx, &auth.actor).await?))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task", body = Task),
        (status = 403, description = "Task belongs to another organization"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn get_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<Json<Task>> {
    let ctx = state.services(&headers);
    Ok(Json(services::tasks::get(&ctx, &auth.actor, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskUpdateRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn update_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    auth: AuthUser,
    ValidJson(payload): ValidJson<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    let ctx = state.services(&headers);
    Ok(Json(services::tasks::update(&ctx, &auth.actor, id, payload).await?))
}

#[utoipa::path(
    put,
    path = "/api/tasks/{id}/reorder",
    tag = "Tasks",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskReorderRequest,
    responses(
        (status = 200, description = "Task moved", body = Task),
        (status = 400, description = "Negative position"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn reorder_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    auth: AuthUser,
    ValidJson(payload): ValidJson<TaskReorderRequest>,
) -> AppResult<Json<Task>> {
    let ctx = state.services(&headers);
    Ok(Json(services::tasks::reorder(&ctx, &auth.actor, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn delete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<StatusCode> {
    let ctx = state.services(&headers);
    services::tasks::delete(&ctx, &auth.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
