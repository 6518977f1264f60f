use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use super::model::Role;
use crate::models::organization::Organization;
use crate::models::task::Task;
use crate::models::user::User;

/// The authenticated user performing an operation, as carried by the
/// verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub organization_id: Uuid,
}

impl Actor {
    pub fn new(id: Uuid, email: impl Into<String>, role: Role, organization_id: Uuid) -> Self {
        Self {
            id,
            email: email.into(),
            role,
            organization_id,
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor::new(user.id, user.email.clone(), user.role, user.organization_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Task,
    User,
    Organization,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Task => "task",
            ResourceKind::User => "user",
            ResourceKind::Organization => "organization",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Task => "tasks",
            ResourceKind::User => "users",
            ResourceKind::Organization => "organizations",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The intended action on an already-stored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(self, Action::Update | Action::Delete)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the policy engine needs to know about a stored resource: its kind,
/// its id, and the organization that owns it. An organization owns itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: Uuid,
    pub organization_id: Uuid,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: Uuid, organization_id: Uuid) -> Self {
        Self {
            kind,
            id,
            organization_id,
        }
    }

    pub fn task(task: &Task) -> Self {
        Self::new(ResourceKind::Task, task.id, task.organization_id)
    }

    pub fn user(user: &User) -> Self {
        Self::new(ResourceKind::User, user.id, user.organization_id)
    }

    pub fn organization(org: &Organization) -> Self {
        Self::new(ResourceKind::Organization, org.id, org.id)
    }
}
