use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;

use super::evaluator::Decision;
use super::requirement::Requirement;
use crate::app::AppState;
use crate::audit::{AuditEvent, RequestContext};
use crate::errors::AppError;
use crate::jwt::AuthUser;

/// Route middleware enforcing the [`Requirement`] attached to the route.
///
/// Denials are audited before the 403 is returned.
pub async fn enforce_requirement(
    State(state): State<AppState>,
    Extension(requirement): Extension<Requirement>,
    auth: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if requirement.is_open() {
        return Ok(next.run(request).await);
    }

    match state.policy.check_requirement(&auth.actor, &requirement) {
        Decision::Allow => Ok(next.run(request).await),
        Decision::Deny(reason) => {
            tracing::warn!(
                actor_id = %auth.actor.id,
                role = %auth.actor.role,
                method = %request.method(),
                path = %request.uri().path(),
                %reason,
                "request denied by route requirement"
            );
            let event = AuditEvent::denied(&auth.actor, requirement.resource, None, &reason)
                .with_context(RequestContext::from_headers(request.headers()));
            state.audit.record(event).await;
            Err(AppError::forbidden(reason))
        }
    }
}
