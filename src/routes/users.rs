use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::extract::ValidJson;
use crate::jwt::AuthUser;
use crate::models::user::{User, UserCreateRequest, UserUpdateRequest};
use crate::services;

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Users in the caller's organizations", body = [User]))
)]
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    auth: AuthUser,
) -> AppResult<Json<Vec<User>>> {
    let ctx = state.services(&headers);
    Ok(Json(services::users::list(&ctx, &auth.actor).await?))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    security(("bearerAuth" = [])),
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Access denied"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    auth: AuthUser,
    ValidJson(payload): ValidJson<UserCreateRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let ctx = state.services(&headers);
    let user = services::users::create(&ctx, &auth.actor, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 403, description = "User belongs to another organization"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<Json<User>> {
    let ctx = state.services(&headers);
    Ok(Json(services::users::get(&ctx, &auth.actor, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Access denied"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    auth: AuthUser,
    ValidJson(payload): ValidJson<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    let ctx = state.services(&headers);
    Ok(Json(services::users::update(&ctx, &auth.actor, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<StatusCode> {
    let ctx = state.services(&headers);
    services::users::delete(&ctx, &auth.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
