use chrono::Utc;
use uuid::Uuid;

use super::ServiceContext;
use crate::audit::AuditEvent;
use crate::authz::{Action, Actor, ResourceRef};
use crate::db;
use crate::errors::{AppError, AppResult};
use crate::models::audit::AuditAction;
use crate::models::organization::{Organization, OrganizationCreateRequest, OrganizationUpdateRequest};

fn not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("Organization with ID {id} not found"))
}

async fn load(ctx: &ServiceContext<'_>, id: Uuid) -> AppResult<Organization> {
    db::organizations::find_by_id(ctx.pool, id).await?.ok_or_else(|| not_found(id))
}

/// Creates a child of the actor's own organization.
pub async fn create(
    ctx: &ServiceContext<'_>,
    actor: &Actor,
    request: OrganizationCreateRequest,
) -> AppResult<Organization> {
    request.validate()?;

    let decision = ctx.policy.authorize_org_create(actor, request.parent_id);
    ctx.enforce(actor, decision, "organization", None).await?;

    let now = Utc::now();
    let org = Organization {
        id: Uuid::new_v4(),
        name: request.name.trim().to_string(),
        description: request.description,
        parent_id: Some(request.parent_id.unwrap_or(actor.organization_id)),
        created_at: now,
        updated_at: now,
    };
    db::organizations::insert(ctx.pool, &org).await?;

    ctx.record(AuditEvent::for_entity(actor, AuditAction::Create, &org)).await;
    Ok(org)
}

pub async fn list(ctx: &ServiceContext<'_>, actor: &Actor) -> AppResult<Vec<Organization>> {
    // Viewers see only their own organization, never its children.
    let scope = ctx.scope(actor).await?;
    db::organizations::list_in(ctx.pool, &scope.to_vec()).await
}

pub async fn get(ctx: &ServiceContext<'_>, actor: &Actor, id: Uuid) -> AppResult<Organization> {
    let org = load(ctx, id).await?;
    // Same visibility as `list`: a viewer's scope stops at their own org.
    let scope = ctx.scope(actor).await?;
    let decision = ctx.policy.authorize(actor, &scope, &ResourceRef::organization(&org), Action::Read);
    ctx.enforce(actor, decision, "organization", Some(id)).await?;
    Ok(org)
}

pub async fn update(
    ctx: &ServiceContext<'_>,
    actor: &Actor,
    id: Uuid,
    request: OrganizationUpdateRequest,
) -> AppResult<Organization> {
    request.validate()?;

    let mut org = load(ctx, id).await?;
    let scope = ctx.scope(actor).await?;
    let decision = ctx.policy.authorize_org_mutation(actor, &scope, org.id, Action::Update);
    ctx.enforce(actor, decision, "organization", Some(id)).await?;

    if let Some(name) = request.name {
        org.name = name.trim().to_string();
    }
    if let Some(description) = request.description {
        org.description = Some(description);
    }
    org.updated_at = Utc::now();
    db::organizations::update(ctx.pool, &org).await?;

    ctx.record(AuditEvent::for_entity(actor, AuditAction::Update, &org)).await;
    Ok(org)
}

/// Deletes an empty organization. Organizations that still have members,
/// tasks or children are refused with a conflict.
pub async fn delete(ctx: &ServiceContext<'_>, actor: &Actor, id: Uuid) -> AppResult<()> {
    let org = load(ctx, id).await?;
    let scope = ctx.scope(actor).await?;
    let decision = ctx.policy.authorize_org_mutation(actor, &scope, org.id, Action::Delete);
    ctx.enforce(actor, decision, "organization", Some(id)).await?;

    let mut tx = ctx.pool.begin().await?;
    let dependents = db::organizations::dependents(&mut *tx, id).await?;
    if !dependents.is_empty() {
        return Err(AppError::conflict(format!(
            "Organization still has {} users, {} tasks and {} child organizations",
            dependents.users, dependents.tasks, dependents.children
        )));
    }
    db::organizations::delete(&mut *tx, id).await?;
    tx.commit().await?;

    ctx.record(AuditEvent::for_entity(actor, AuditAction::Delete, &org)).await;
    Ok(())
}
