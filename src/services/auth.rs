use chrono::Utc;
use uuid::Uuid;

use super::ServiceContext;
use crate::audit::AuditEvent;
use crate::authz::{Actor, Role};
use crate::db;
use crate::errors::{AppError, AppResult};
use crate::jwt::JwtConfig;
use crate::models::audit::AuditAction;
use crate::models::organization::Organization;
use crate::models::user::{AuthResponse, LoginRequest, RegisterRequest, User};
use crate::utils::{hash_password, verify_password};

/// Registers a new owner together with a fresh organization.
pub async fn register(ctx: &ServiceContext<'_>, jwt: &JwtConfig, request: RegisterRequest) -> AppResult<AuthResponse> {
    request.validate()?;
    let password_hash = hash_password(&request.password)?;

    if db::users::email_exists(ctx.pool, &request.email).await? {
        return Err(AppError::conflict("User with this email already exists"));
    }

    let now = Utc::now();
    let first_name = request.first_name.trim().to_string();
    let organization = Organization {
        id: Uuid::new_v4(),
        name: request
            .organization_name
            .map(|name| name.trim().to_string())
            .unwrap_or_else(|| format!("{first_name}'s Organization")),
        description: Some("Default organization".to_string()),
        parent_id: None,
        created_at: now,
        updated_at: now,
    };
    let user = User {
        id: Uuid::new_v4(),
        email: request.email,
        first_name,
        last_name: request.last_name.trim().to_string(),
        role: Role::Owner,
        organization_id: organization.id,
        created_at: now,
        updated_at: now,
    };

    let mut tx = ctx.pool.begin().await?;
    db::organizations::insert(&mut *tx, &organization).await?;
    db::users::insert(&mut *tx, &user, &password_hash).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, organization_id = %organization.id, "user registered");
    let actor = Actor::from(&user);
    ctx.record(AuditEvent::for_entity(&actor, AuditAction::Create, &user).with_detail("User registered"))
        .await;

    let access_token = jwt.encode(&user)?;
    Ok(AuthResponse { access_token, user })
}

pub async fn login(ctx: &ServiceContext<'_>, jwt: &JwtConfig, request: LoginRequest) -> AppResult<AuthResponse> {
    let Some(row) = db::users::find_by_email(ctx.pool, &request.email).await? else {
        tracing::warn!("login attempt for unknown email");
        ctx.record(
            AuditEvent::anonymous(&request.email, AuditAction::AccessDenied, "auth")
                .with_detail("Failed login attempt - unknown email"),
        )
        .await;
        return Err(AppError::unauthorized("Invalid credentials"));
    };

    let valid = verify_password(&request.password, &row.password_hash)?;
    let user = User::try_from(row)?;
    let actor = Actor::from(&user);

    if !valid {
        tracing::warn!(user_id = %user.id, "failed login attempt");
        ctx.record(
            AuditEvent::new(&actor, AuditAction::AccessDenied, "auth")
                .with_detail("Failed login attempt - invalid password"),
        )
        .await;
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    ctx.record(AuditEvent::new(&actor, AuditAction::Login, "auth").with_detail("User logged in successfully"))
        .await;

    let access_token = jwt.encode(&user)?;
    Ok(AuthResponse { access_token, user })
}

/// Tokens are stateless; logging out only leaves an audit entry.
pub async fn logout(ctx: &ServiceContext<'_>, actor: &Actor) {
    ctx.record(AuditEvent::new(actor, AuditAction::Logout, "auth").with_detail("User logged out"))
        .await;
}

pub async fn me(ctx: &ServiceContext<'_>, actor: &Actor) -> AppResult<User> {
    db::users::find_by_id(ctx.pool, actor.id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User no longer exists"))
}
