use super::model::{Permission, Role};

/// Gate configuration attached to a route at registration time.
///
/// Every listed permission must be held and, when `roles` is non-empty, the
/// actor's covered roles must include at least one of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Requirement {
    pub resource: &'static str,
    pub permissions: &'static [Permission],
    pub roles: &'static [Role],
}

impl Requirement {
    pub const fn permissions(resource: &'static str, permissions: &'static [Permission]) -> Self {
        Self {
            resource,
            permissions,
            roles: &[],
        }
    }

    pub const fn roles(resource: &'static str, roles: &'static [Role]) -> Self {
        Self {
            resource,
            permissions: &[],
            roles,
        }
    }

    pub const fn open() -> Self {
        Self {
            resource: "",
            permissions: &[],
            roles: &[],
        }
    }

    pub fn is_open(&self) -> bool {
        self.permissions.is_empty() && self.roles.is_empty()
    }
}

/// Requirements for every gated operation.
pub mod ops {
    use super::Requirement;
    use crate::authz::model::{Permission, Role};

    pub const TASK_CREATE: Requirement = Requirement::permissions("task", &[Permission::TaskCreate]);
    pub const TASK_READ: Requirement = Requirement::permissions("task", &[Permission::TaskRead]);
    pub const TASK_UPDATE: Requirement = Requirement::permissions("task", &[Permission::TaskUpdate]);
    pub const TASK_DELETE: Requirement = Requirement::permissions("task", &[Permission::TaskDelete]);

    pub const USER_CREATE: Requirement = Requirement::permissions("user", &[Permission::UserCreate]);
    pub const USER_READ: Requirement = Requirement::permissions("user", &[Permission::UserRead]);
    pub const USER_UPDATE: Requirement = Requirement::permissions("user", &[Permission::UserUpdate]);
    pub const USER_DELETE: Requirement = Requirement::permissions("user", &[Permission::UserDelete]);

    pub const ORG_CREATE: Requirement = Requirement::permissions("organization", &[Permission::OrgCreate]);
    pub const ORG_READ: Requirement = Requirement::permissions("organization", &[Permission::OrgRead]);
    pub const ORG_UPDATE: Requirement = Requirement::permissions("organization", &[Permission::OrgUpdate]);
    pub const ORG_DELETE: Requirement = Requirement::permissions("organization", &[Permission::OrgDelete]);

    pub const AUDIT_LIST: Requirement = Requirement::roles("audit_log", &[Role::Owner, Role::Admin]);
}
