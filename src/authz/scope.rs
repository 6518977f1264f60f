//! Organization scope resolution.
//!
//! Scope is one hop deep: owners and admins see their own organization and
//! its direct children. Grandchildren are never part of the scope.

use std::collections::BTreeSet;

use sqlx::SqliteExecutor;
use uuid::Uuid;

use super::principal::Actor;
use crate::db;
use crate::errors::AppResult;

/// The set of organization ids an actor may read resources from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgScope {
    ids: BTreeSet<Uuid>,
}

impl OrgScope {
    /// Builds the scope from the actor and the direct children of their
    /// organization. Children are ignored for roles that do not see them.
    pub fn resolve(actor: &Actor, child_ids: impl IntoIterator<Item = Uuid>) -> Self {
        let mut ids = BTreeSet::new();
        ids.insert(actor.organization_id);
        if actor.role.sees_child_organizations() {
            ids.extend(child_ids);
        }
        Self { ids }
    }

    pub fn contains(&self, organization_id: Uuid) -> bool {
        self.ids.contains(&organization_id)
    }

    pub fn to_vec(&self) -> Vec<Uuid> {
        self.ids.iter().copied().collect()
    }
}

/// Resolves the organizations `actor` may act within. Performs at most one
/// read; store failures propagate.
pub async fn accessible_org_ids<'e, E>(executor: E, actor: &Actor) -> AppResult<OrgScope>
where
    E: SqliteExecutor<'e>,
{
    let children = if actor.role.sees_child_organizations() {
        db::organizations::child_ids(executor, actor.organization_id).await?
    } else {
        Vec::new()
    };

    let scope = OrgScope::resolve(actor, children);
    tracing::debug!(
        actor_id = %actor.id,
        role = %actor.role,
        organizations = scope.ids.len(),
        "resolved organization scope"
    );
    Ok(scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::Role;
    use crate::db::test_support::{memory_pool, seed_org};

    fn actor(role: Role, org: Uuid) -> Actor {
        Actor::new(Uuid::new_v4(), "someone@example.com", role, org)
    }

    #[test]
    fn viewer_scope_ignores_children() {
        let org = Uuid::new_v4();
        let scope = OrgScope::resolve(&actor(Role::Viewer, org), vec![Uuid::new_v4(), Uuid::new_v4()]);
        assert_eq!(scope.to_vec(), vec![org]);
    }

    #[tokio::test]
    async fn owner_and_admin_see_direct_children_only() -> anyhow::Result<()> {
        let pool = memory_pool().await?;
        let a = seed_org(&pool, "A", None).await?;
        let b = seed_org(&pool, "B", Some(a)).await?;
        let c = seed_org(&pool, "C", Some(b)).await?;
        let sibling = seed_org(&pool, "D", None).await?;

        for role in [Role::Owner, Role::Admin] {
            let scope = accessible_org_ids(&pool, &actor(role, a)).await?;
            assert!(scope.contains(a));
            assert!(scope.contains(b));
            assert!(!scope.contains(c), "grandchild must not be in scope for {role}");
            assert!(!scope.contains(sibling));
            assert_eq!(scope.ids.len(), 2);
        }
        Ok(())
    }

    #[tokio::test]
    async fn viewer_scope_is_own_org_even_with_children() -> anyhow::Result<()> {
        let pool = memory_pool().await?;
        let a = seed_org(&pool, "A", None).await?;
        seed_org(&pool, "B", Some(a)).await?;

        let scope = accessible_org_ids(&pool, &actor(Role::Viewer, a)).await?;
        assert_eq!(scope.to_vec(), vec![a]);
        Ok(())
    }
}
