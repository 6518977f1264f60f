//! Resource services.
//!
//! Every operation follows the same shape: load the target, resolve the
//! actor's scope, ask the policy engine, mutate, then audit. Denials are
//! audited before the error is returned and nothing is mutated.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditSink, RequestContext};
use crate::authz::{accessible_org_ids, AccessPolicy, Actor, Decision, OrgScope};
use crate::errors::{AppError, AppResult};

pub mod audit_log;
pub mod auth;
pub mod ordering;
pub mod organizations;
pub mod tasks;
pub mod users;

/// Per-request collaborators shared by the services.
pub struct ServiceContext<'a> {
    pub pool: &'a SqlitePool,
    pub policy: &'a AccessPolicy,
    pub audit: &'a dyn AuditSink,
    pub request: RequestContext,
}

impl<'a> ServiceContext<'a> {
    pub fn new(pool: &'a SqlitePool, policy: &'a AccessPolicy, audit: &'a dyn AuditSink, request: RequestContext) -> Self {
        Self {
            pool,
            policy,
            audit,
            request,
        }
    }

    pub async fn scope(&self, actor: &Actor) -> AppResult<OrgScope> {
        accessible_org_ids(self.pool, actor).await
    }

    /// Turns a policy decision into a result, auditing denials.
    pub async fn enforce(
        &self,
        actor: &Actor,
        decision: Decision,
        resource: &str,
        resource_id: Option<Uuid>,
    ) -> AppResult<()> {
        match decision {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                tracing::warn!(
                    actor_id = %actor.id,
                    role = %actor.role,
                    resource,
                    resource_id = ?resource_id,
                    %reason,
                    "access denied"
                );
                self.record(AuditEvent::denied(actor, resource, resource_id, &reason)).await;
                Err(AppError::forbidden(reason))
            }
        }
    }

    pub async fn record(&self, event: AuditEvent) {
        self.audit.record(event.with_context(self.request.clone())).await;
    }
}
