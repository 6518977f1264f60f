use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::audit::AuditEvent;
use crate::errors::AppResult;
use crate::models::audit::{AuditLogEntry, AuditLogQuery, DbAuditLog};

pub async fn insert<'e, E>(executor: E, event: &AuditEvent) -> AppResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, user_email, organization_id, action, resource, resource_id,
                                details, ip_address, user_agent, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.id)
    .bind(event.actor_id)
    .bind(&event.actor_email)
    .bind(event.organization_id)
    .bind(event.action.as_str())
    .bind(&event.resource)
    .bind(event.resource_id)
    .bind(&event.detail)
    .bind(&event.context.ip)
    .bind(&event.context.user_agent)
    .bind(event.occurred_at)
    .execute(executor)
    .await?;
    Ok(())
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &AuditLogQuery, org_ids: &[Uuid]) {
    builder.push(" WHERE organization_id IN (");
    let mut separated = builder.separated(", ");
    for id in org_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    if let Some(user_id) = query.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(action) = query.action {
        builder.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(resource) = query.resource.as_deref().filter(|r| !r.is_empty()) {
        builder.push(" AND resource LIKE ").push_bind(format!("%{resource}%"));
    }
    if let Some(start) = query.start_date {
        builder.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = query.end_date {
        builder.push(" AND created_at <= ").push_bind(end);
    }
}

/// One page of entries, newest first, plus the total matching count.
pub async fn list(
    pool: &SqlitePool,
    query: &AuditLogQuery,
    org_ids: &[Uuid],
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<AuditLogEntry>, i64)> {
    if org_ids.is_empty() {
        return Ok((Vec::new(), 0));
    }

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM audit_logs");
    push_filters(&mut count, query, org_ids);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Sqlite>::new(
        "SELECT id, user_id, user_email, organization_id, action, resource, resource_id, details, \
         ip_address, user_agent, created_at FROM audit_logs",
    );
    push_filters(&mut select, query, org_ids);
    select
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = select.build_query_as::<DbAuditLog>().fetch_all(pool).await?;
    let entries = rows
        .into_iter()
        .map(AuditLogEntry::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok((entries, total))
}
