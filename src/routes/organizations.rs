use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::extract::ValidJson;
use crate::jwt::AuthUser;
use crate::models::organization::{Organization, OrganizationCreateRequest, OrganizationUpdateRequest};
use crate::services;

#[utoipa::path(
    get,
    path = "/api/organizations",
    tag = "Organizations",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Organizations in the caller's scope", body = [Organization]))
)]
pub async fn list_organizations(
    State(state): State<AppState>,
    headers: HeaderMap,
    auth: AuthUser,
) -> AppResult<Json<Vec<Organization>>> {
    let ctx = state.services(&headers);
    Ok(Json(services::organizations::list(&ctx, &auth.actor).await?))
}

#[utoipa::path(
    post,
    path = "/api/organizations",
    tag = "Organizations",
    security(("bearerAuth" = [])),
    request_body = OrganizationCreateRequest,
    responses(
        (status = 201, description = "Child organization created", body = Organization),
        (status = 403, description = "Access denied")
    )
)]
pub async fn create_organization(
    State(state): State<AppState>,
    headers: HeaderMap,
    auth: AuthUser,
    ValidJson(payload): ValidJson<OrganizationCreateRequest>,
) -> AppResult<(StatusCode, Json<Organization>)> {
    let ctx = state.services(&headers);
    let org = services::organizations::create(&ctx, &auth.actor, payload).await?;
    Ok((StatusCode::CREATED, Json(org)))
}

#[utoipa::path(
    get,
    path = "/api/organizations/{id}",
    tag = "Organizations",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Organization id")),
    responses(
        (status = 200, description = "Organization", body = Organization),
        (status = 403, description = "Outside the caller's scope"),
        (status = 404, description = "Organization not found")
    )
)]
pub async fn get_organization(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<Json<Organization>> {
    let ctx = state.services(&headers);
    Ok(Json(services::organizations::get(&ctx, &auth.actor, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/organizations/{id}",
    tag = "Organizations",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Organization id")),
    request_body = OrganizationUpdateRequest,
    responses(
        (status = 200, description = "Organization updated", body = Organization),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Organization not found")
    )
)]
pub async fn update_organization(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    auth: AuthUser,
    ValidJson(payload): ValidJson<OrganizationUpdateRequest>,
) -> AppResult<Json<Organization>> {
    let ctx = state.services(&headers);
    Ok(Json(services::organizations::update(&ctx, &auth.actor, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/organizations/{id}",
    tag = "Organizations",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Organization id")),
    responses(
        (status = 204, description = "Organization deleted"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Organization not found"),
        (status = 409, description = "Organization still has users, tasks or children")
    )
)]
pub async fn delete_organization(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<StatusCode> {
    let ctx = state.services(&headers);
    services::organizations::delete(&ctx, &auth.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
