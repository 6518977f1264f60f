use chrono::Utc;
use uuid::Uuid;

use super::ServiceContext;
use crate::audit::AuditEvent;
use crate::authz::{Action, Actor, ResourceRef, Role};
use crate::db;
use crate::errors::{AppError, AppResult};
use crate::models::audit::AuditAction;
use crate::models::user::{User, UserCreateRequest, UserUpdateRequest};
use crate::utils::hash_password;

fn not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("User with ID {id} not found"))
}

async fn load(ctx: &ServiceContext<'_>, id: Uuid) -> AppResult<User> {
    db::users::find_by_id(ctx.pool, id).await?.ok_or_else(|| not_found(id))
}

/// Creates a user inside one of the actor's organizations. The role
/// defaults to viewer and the organization to the actor's own.
pub async fn create(ctx: &ServiceContext<'_>, actor: &Actor, request: UserCreateRequest) -> AppResult<User> {
    request.validate()?;

    let role = request.role.unwrap_or(Role::Viewer);
    let organization_id = request.organization_id.unwrap_or(actor.organization_id);
    let scope = ctx.scope(actor).await?;
    let decision = ctx.policy.authorize_user_create(actor, &scope, organization_id, role);
    ctx.enforce(actor, decision, "user", None).await?;

    if db::users::email_exists(ctx.pool, &request.email).await? {
        return Err(AppError::conflict("User with this email already exists"));
    }
    let password_hash = hash_password(&request.password)?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email: request.email,
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        role,
        organization_id,
        created_at: now,
        updated_at: now,
    };
    db::users::insert(ctx.pool, &user, &password_hash).await?;

    ctx.record(AuditEvent::for_entity(actor, AuditAction::Create, &user)).await;
    Ok(user)
}

pub async fn list(ctx: &ServiceContext<'_>, actor: &Actor) -> AppResult<Vec<User>> {
    let scope = ctx.scope(actor).await?;
    db::users::list_in_orgs(ctx.pool, &scope.to_vec()).await
}

pub async fn get(ctx: &ServiceContext<'_>, actor: &Actor, id: Uuid) -> AppResult<User> {
    let user = load(ctx, id).await?;
    let scope = ctx.scope(actor).await?;
    let decision = ctx.policy.authorize(actor, &scope, &ResourceRef::user(&user), Action::Read);
    ctx.enforce(actor, decision, "user", Some(id)).await?;
    Ok(user)
}

pub async fn update(ctx: &ServiceContext<'_>, actor: &Actor, id: Uuid, request: UserUpdateRequest) -> AppResult<User> {
    request.validate()?;

    let mut user = load(ctx, id).await?;
    let scope = ctx.scope(actor).await?;
    let role_change = request.role.filter(|role| *role != user.role);
    let decision = ctx
        .policy
        .authorize_user_update(actor, &scope, &ResourceRef::user(&user), user.role, role_change);
    ctx.enforce(actor, decision, "user", Some(id)).await?;

    if let Some(first_name) = request.first_name {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = request.last_name {
        user.last_name = last_name.trim().to_string();
    }
    if let Some(role) = role_change {
        user.role = role;
    }
    user.updated_at = Utc::now();
    db::users::update(ctx.pool, &user).await?;

    let mut event = AuditEvent::for_entity(actor, AuditAction::Update, &user);
    if let Some(role) = role_change {
        event = event.with_detail(format!("Changed role of user '{}' to {role}", user.email));
    }
    ctx.record(event).await;
    Ok(user)
}

pub async fn delete(ctx: &ServiceContext<'_>, actor: &Actor, id: Uuid) -> AppResult<()> {
    let user = load(ctx, id).await?;
    let scope = ctx.scope(actor).await?;
    let decision = ctx.policy.authorize_user_delete(actor, &scope, &ResourceRef::user(&user));
    ctx.enforce(actor, decision, "user", Some(id)).await?;

    if db::users::delete(ctx.pool, id).await? == 0 {
        return Err(not_found(id));
    }

    ctx.record(AuditEvent::for_entity(actor, AuditAction::Delete, &user)).await;
    Ok(())
}
