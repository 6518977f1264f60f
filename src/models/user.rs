use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::Auditable;
use crate::authz::Role;
use crate::errors::AppError;
use crate::models::organization::MAX_ORG_NAME;
use crate::utils::{validate_email, validate_text};

pub const MAX_NAME: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Auditable for User {
    fn resource_name() -> &'static str {
        "user"
    }

    fn audit_id(&self) -> Uuid {
        self.id
    }

    fn audit_label(&self) -> String {
        self.email.clone()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(value: DbUser) -> Result<Self, Self::Error> {
        let role = value
            .role
            .parse::<Role>()
            .map_err(|_| AppError::internal(format!("user {} has unknown role '{}'", value.id, value.role)))?;

        Ok(User {
            id: value.id,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
            role,
            organization_id: value.organization_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
    #[schema(example = "Ada")]
    pub first_name: String,
    #[schema(example = "Lovelace")]
    pub last_name: String,
    /// Name of the organization created for the new owner. Defaults to
    /// "{first_name}'s Organization".
    pub organization_name: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        validate_text("first_name", &self.first_name, MAX_NAME)?;
        validate_text("last_name", &self.last_name, MAX_NAME)?;
        if let Some(name) = &self.organization_name {
            validate_text("organization_name", name, MAX_ORG_NAME)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserCreateRequest {
    #[schema(example = "grace@example.com")]
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// Defaults to viewer.
    pub role: Option<Role>,
    /// Defaults to the caller's own organization.
    pub organization_id: Option<Uuid>,
}

impl UserCreateRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        validate_text("first_name", &self.first_name, MAX_NAME)?;
        validate_text("last_name", &self.last_name, MAX_NAME)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
}

impl UserUpdateRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(first_name) = &self.first_name {
            validate_text("first_name", first_name, MAX_NAME)?;
        }
        if let Some(last_name) = &self.last_name {
            validate_text("last_name", last_name, MAX_NAME)?;
        }
        Ok(())
    }
}
