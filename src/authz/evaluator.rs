use uuid::Uuid;

use super::model::{PermissionTable, Role};
use super::principal::{Action, Actor, ResourceKind, ResourceRef};
use super::requirement::Requirement;
use super::scope::OrgScope;

/// Outcome of a policy check. A denial always carries a human-readable
/// reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn deny(reason: impl Into<String>) -> Self {
        Decision::Deny(reason.into())
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Runs `next` only when this decision allows.
    pub fn and_then(self, next: impl FnOnce() -> Decision) -> Decision {
        match self {
            Decision::Allow => next(),
            deny => deny,
        }
    }
}

/// Access policy engine.
///
/// Evaluation order for resource checks:
/// 1. visibility: the resource's organization must be in the actor's scope
/// 2. viewers never mutate
/// 3. admins only mutate inside their own organization
/// 4. owners are unrestricted within scope
///
/// The permission/role gate ([`AccessPolicy::check_requirement`]) is an
/// independent layer applied before any of the above.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    table: PermissionTable,
}

impl AccessPolicy {
    pub fn new(table: PermissionTable) -> Self {
        Self { table }
    }

    /// Permission and role gate for one operation. Both lists must be
    /// satisfied; an empty requirement is open.
    pub fn check_requirement(&self, actor: &Actor, requirement: &Requirement) -> Decision {
        if !self.table.has_all(actor.role, requirement.permissions) {
            let required = requirement
                .permissions
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::debug!(actor_id = %actor.id, role = %actor.role, %required, "permission gate denied");
            return Decision::deny(format!("Access denied. Required permissions: {required}"));
        }

        if !requirement.roles.is_empty() {
            let covered = self.table.covered_roles(actor.role);
            if !requirement.roles.iter().any(|role| covered.contains(role)) {
                let required = requirement
                    .roles
                    .iter()
                    .map(|r| r.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                tracing::debug!(actor_id = %actor.id, role = %actor.role, %required, "role gate denied");
                return Decision::deny(format!("Access denied. Required roles: {required}"));
            }
        }

        Decision::Allow
    }

    /// Resource-level check for an existing resource.
    pub fn authorize(&self, actor: &Actor, scope: &OrgScope, resource: &ResourceRef, action: Action) -> Decision {
        if !scope.contains(resource.organization_id) {
            return Decision::deny(format!(
                "cross-organization access: {} {} is outside your organizations",
                resource.kind, resource.id
            ));
        }

        if !action.is_mutation() {
            return Decision::Allow;
        }

        match actor.role {
            Role::Viewer => Decision::deny(format!(
                "{} cannot {} {}",
                Role::Viewer.plural_label(),
                action,
                resource.kind.plural()
            )),
            Role::Admin if resource.organization_id != actor.organization_id => {
                Decision::deny("Admins can only modify resources in their own organization")
            }
            Role::Admin | Role::Owner => Decision::Allow,
        }
    }

    pub fn authorize_org_create(&self, actor: &Actor, parent_id: Option<Uuid>) -> Decision {
        if actor.role != Role::Owner {
            return Decision::deny("Only owners can create organizations");
        }
        match parent_id {
            Some(parent) if parent != actor.organization_id => {
                Decision::deny("Can only create child organizations under your own organization")
            }
            _ => Decision::Allow,
        }
    }

    pub fn authorize_org_mutation(&self, actor: &Actor, scope: &OrgScope, org_id: Uuid, action: Action) -> Decision {
        let target = ResourceRef::new(ResourceKind::Organization, org_id, org_id);
        self.authorize(actor, scope, &target, Action::Read).and_then(|| {
            if actor.role != Role::Owner {
                return Decision::deny(format!("Only owners can {action} organizations"));
            }
            if action == Action::Delete && org_id == actor.organization_id {
                return Decision::deny("Cannot delete your own organization");
            }
            Decision::Allow
        })
    }

    /// Role a caller may hand out. Owners assign any role, admins only
    /// viewer.
    pub fn authorize_role_assignment(&self, actor: &Actor, role: Role) -> Decision {
        match actor.role {
            Role::Owner => Decision::Allow,
            Role::Admin if role == Role::Viewer => Decision::Allow,
            Role::Admin => Decision::deny("Admins can only assign Viewer role"),
            Role::Viewer => Decision::deny("Viewers cannot assign roles"),
        }
    }

    pub fn authorize_user_create(&self, actor: &Actor, scope: &OrgScope, target_org: Uuid, role: Role) -> Decision {
        if !scope.contains(target_org) {
            return Decision::deny("Cannot create users in this organization");
        }
        self.authorize_role_assignment(actor, role)
    }

    pub fn authorize_user_update(
        &self,
        actor: &Actor,
        scope: &OrgScope,
        target: &ResourceRef,
        target_role: Role,
        new_role: Option<Role>,
    ) -> Decision {
        self.authorize(actor, scope, target, Action::Update).and_then(|| match new_role {
            None => Decision::Allow,
            Some(role) => self.authorize_role_assignment(actor, role).and_then(|| {
                if target.id == actor.id && actor.role != Role::Owner {
                    Decision::deny("Cannot change your own role")
                } else if target_role > actor.role {
                    Decision::deny("Cannot change the role of a user above your own")
                } else {
                    Decision::Allow
                }
            }),
        })
    }

    pub fn authorize_user_delete(&self, actor: &Actor, scope: &OrgScope, target: &ResourceRef) -> Decision {
        if target.id == actor.id {
            return Decision::deny("Cannot delete your own account");
        }
        self.authorize(actor, scope, target, Action::Read).and_then(|| {
            if actor.role != Role::Owner {
                return Decision::deny("Only owners can delete users");
            }
            self.authorize(actor, scope, target, Action::Delete)
        })
    }
}
