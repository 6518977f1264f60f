use super::ServiceContext;
use crate::authz::Actor;
use crate::db;
use crate::errors::AppResult;
use crate::models::audit::{AuditLogPage, AuditLogQuery};

/// Entries written by actors of the caller's organizations, newest first.
pub async fn list(ctx: &ServiceContext<'_>, actor: &Actor, query: AuditLogQuery) -> AppResult<AuditLogPage> {
    let window = query.pagination()?;
    let scope = ctx.scope(actor).await?;
    let (data, total) = db::audit::list(ctx.pool, &query, &scope.to_vec(), window.limit, window.offset).await?;

    Ok(AuditLogPage {
        data,
        total,
        page: window.page,
        limit: window.limit,
    })
}
