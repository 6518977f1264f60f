//! Role and permission tables.
//!
//! The tables are plain immutable values built once at startup
//! ([`PermissionTable::standard`]) and shared by reference with the policy
//! engine.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;

/// Coarse privilege tier. Variants are declared from least to most
/// privileged so the derived ordering follows the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Admin,
    Owner,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Viewer, Role::Admin, Role::Owner];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Plural display name used in denial messages ("Viewers cannot ...").
    pub fn plural_label(&self) -> &'static str {
        match self {
            Role::Viewer => "Viewers",
            Role::Admin => "Admins",
            Role::Owner => "Owners",
        }
    }

    /// Owners and admins also see direct child organizations.
    pub fn sees_child_organizations(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    fn index(&self) -> usize {
        match self {
            Role::Viewer => 0,
            Role::Admin => 1,
            Role::Owner => 2,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Role::Viewer),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(AppError::bad_request(format!("unknown role '{other}'"))),
        }
    }
}

/// Atomic capability tag, namespaced by resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    #[serde(rename = "task:create")]
    TaskCreate,
    #[serde(rename = "task:read")]
    TaskRead,
    #[serde(rename = "task:update")]
    TaskUpdate,
    #[serde(rename = "task:delete")]
    TaskDelete,
    #[serde(rename = "user:create")]
    UserCreate,
    #[serde(rename = "user:read")]
    UserRead,
    #[serde(rename = "user:update")]
    UserUpdate,
    #[serde(rename = "user:delete")]
    UserDelete,
    #[serde(rename = "org:create")]
    OrgCreate,
    #[serde(rename = "org:read")]
    OrgRead,
    #[serde(rename = "org:update")]
    OrgUpdate,
    #[serde(rename = "org:delete")]
    OrgDelete,
    #[serde(rename = "audit:read")]
    AuditRead,
}

impl Permission {
    pub const ALL: [Permission; 13] = [
        Permission::TaskCreate,
        Permission::TaskRead,
        Permission::TaskUpdate,
        Permission::TaskDelete,
        Permission::UserCreate,
        Permission::UserRead,
        Permission::UserUpdate,
        Permission::UserDelete,
        Permission::OrgCreate,
        Permission::OrgRead,
        Permission::OrgUpdate,
        Permission::OrgDelete,
        Permission::AuditRead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::TaskCreate => "task:create",
            Permission::TaskRead => "task:read",
            Permission::TaskUpdate => "task:update",
            Permission::TaskDelete => "task:delete",
            Permission::UserCreate => "user:create",
            Permission::UserRead => "user:read",
            Permission::UserUpdate => "user:update",
            Permission::UserDelete => "user:delete",
            Permission::OrgCreate => "org:create",
            Permission::OrgRead => "org:read",
            Permission::OrgUpdate => "org:update",
            Permission::OrgDelete => "org:delete",
            Permission::AuditRead => "audit:read",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const VIEWER_GRANTS: &[Permission] = &[Permission::TaskRead, Permission::UserRead, Permission::OrgRead];

const ADMIN_EXTRA_GRANTS: &[Permission] = &[
    Permission::TaskCreate,
    Permission::TaskUpdate,
    Permission::TaskDelete,
    Permission::UserCreate,
    Permission::UserUpdate,
    Permission::AuditRead,
];

/// Role → permission set and role → covered-role set, indexed by role.
#[derive(Debug, Clone)]
pub struct PermissionTable {
    grants: [BTreeSet<Permission>; 3],
    coverage: [BTreeSet<Role>; 3],
}

impl PermissionTable {
    /// Viewer reads everything visible, Admin adds task management, user
    /// invitation and audit access, Owner holds every permission.
    pub fn standard() -> Self {
        let viewer: BTreeSet<Permission> = VIEWER_GRANTS.iter().copied().collect();
        let admin: BTreeSet<Permission> = viewer.iter().chain(ADMIN_EXTRA_GRANTS).copied().collect();
        let owner: BTreeSet<Permission> = Permission::ALL.iter().copied().collect();

        let coverage = Role::ALL.map(|role| Role::ALL.iter().copied().filter(|other| *other <= role).collect());

        Self {
            grants: [viewer, admin, owner],
            coverage,
        }
    }

    pub fn permissions_of(&self, role: Role) -> &BTreeSet<Permission> {
        &self.grants[role.index()]
    }

    pub fn has_permission(&self, role: Role, permission: Permission) -> bool {
        self.permissions_of(role).contains(&permission)
    }

    pub fn has_all(&self, role: Role, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.has_permission(role, *p))
    }

    /// Roles whose endpoints `role` may use: itself and every lower tier.
    pub fn covered_roles(&self, role: Role) -> &BTreeSet<Role> {
        &self.coverage[role.index()]
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(role: Role, permission: Permission) -> bool {
        use Permission::*;
        match role {
            Role::Owner => true,
            Role::Admin => matches!(
                permission,
                TaskCreate | TaskRead | TaskUpdate | TaskDelete | UserCreate | UserRead | UserUpdate | OrgRead | AuditRead
            ),
            Role::Viewer => matches!(permission, TaskRead | UserRead | OrgRead),
        }
    }

    #[test]
    fn table_matches_every_role_permission_pair() {
        let table = PermissionTable::standard();
        let mut checked = 0;
        for role in Role::ALL {
            for permission in Permission::ALL {
                assert_eq!(
                    table.has_permission(role, permission),
                    expected(role, permission),
                    "{role} / {permission}"
                );
                checked += 1;
            }
        }
        assert_eq!(checked, 39);
    }

    #[test]
    fn grants_form_a_superset_chain() {
        let table = PermissionTable::standard();
        let viewer = table.permissions_of(Role::Viewer);
        let admin = table.permissions_of(Role::Admin);
        let owner = table.permissions_of(Role::Owner);

        assert!(viewer.is_subset(admin) && viewer.len() < admin.len());
        assert!(admin.is_subset(owner) && admin.len() < owner.len());
        assert_eq!(owner.len(), 13);
    }

    #[test]
    fn admin_lacks_org_management_and_user_delete() {
        let table = PermissionTable::standard();
        for p in [Permission::UserDelete, Permission::OrgCreate, Permission::OrgUpdate, Permission::OrgDelete] {
            assert!(!table.has_permission(Role::Admin, p), "admin must not hold {p}");
        }
        assert!(table.has_permission(Role::Admin, Permission::TaskDelete));
        assert!(table.has_permission(Role::Admin, Permission::AuditRead));
    }

    #[test]
    fn covered_roles_follow_hierarchy() {
        let table = PermissionTable::standard();

        let owner = table.covered_roles(Role::Owner);
        assert_eq!(owner.len(), 3);
        assert!(owner.contains(&Role::Owner) && owner.contains(&Role::Admin) && owner.contains(&Role::Viewer));

        let admin = table.covered_roles(Role::Admin);
        assert_eq!(admin.len(), 2);
        assert!(!admin.contains(&Role::Owner));

        let viewer = table.covered_roles(Role::Viewer);
        assert_eq!(viewer.len(), 1);
        assert!(viewer.contains(&Role::Viewer));
    }

    #[test]
    fn permission_tags_serialize_with_namespace() {
        let json = serde_json::to_string(&Permission::AuditRead).unwrap();
        assert_eq!(json, "\"audit:read\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
        assert_eq!("owner".parse::<Role>().unwrap(), Role::Owner);
        assert!("root".parse::<Role>().is_err());
    }
}
