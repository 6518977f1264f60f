use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::Auditable;
use crate::errors::AppError;
use crate::utils::{validate_optional_text, validate_text};

pub const MAX_ORG_NAME: usize = 100;
pub const MAX_ORG_DESCRIPTION: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Organization {
    pub id: Uuid,
    #[schema(example = "Acme Corp")]
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Auditable for Organization {
    fn resource_name() -> &'static str {
        "organization"
    }

    fn audit_id(&self) -> Uuid {
        self.id
    }

    fn audit_label(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbOrganization {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbOrganization> for Organization {
    type Error = AppError;

    fn try_from(value: DbOrganization) -> Result<Self, Self::Error> {
        Ok(Organization {
            id: value.id,
            name: value.name,
            description: value.description,
            parent_id: value.parent_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrganizationCreateRequest {
    #[schema(example = "Acme Europe")]
    pub name: String,
    pub description: Option<String>,
    /// Defaults to the caller's own organization.
    pub parent_id: Option<Uuid>,
}

impl OrganizationCreateRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_text("name", &self.name, MAX_ORG_NAME)?;
        validate_optional_text("description", self.description.as_deref(), MAX_ORG_DESCRIPTION)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrganizationUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl OrganizationUpdateRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            validate_text("name", name, MAX_ORG_NAME)?;
        }
        validate_optional_text("description", self.description.as_deref(), MAX_ORG_DESCRIPTION)
    }
}

/// Rows that still reference an organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrganizationDependents {
    pub users: i64,
    pub tasks: i64,
    pub children: i64,
}

impl OrganizationDependents {
    pub fn is_empty(&self) -> bool {
        self.users == 0 && self.tasks == 0 && self.children == 0
    }
}
