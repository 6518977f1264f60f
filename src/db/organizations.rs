use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::organization::{DbOrganization, Organization, OrganizationDependents};

const COLUMNS: &str = "id, name, description, parent_id, created_at, updated_at";

pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> AppResult<Option<Organization>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, DbOrganization>(&format!("SELECT {COLUMNS} FROM organizations WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.map(Organization::try_from).transpose()
}

/// Direct children only.
pub async fn child_ids<'e, E>(executor: E, parent_id: Uuid) -> AppResult<Vec<Uuid>>
where
    E: SqliteExecutor<'e>,
{
    let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM organizations WHERE parent_id = ?")
        .bind(parent_id)
        .fetch_all(executor)
        .await?;
    Ok(ids)
}

pub async fn list_in<'e, E>(executor: E, ids: &[Uuid]) -> AppResult<Vec<Organization>>
where
    E: SqliteExecutor<'e>,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM organizations WHERE id IN ("));
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY name ASC");

    let rows = builder.build_query_as::<DbOrganization>().fetch_all(executor).await?;
    rows.into_iter().map(Organization::try_from).collect()
}

pub async fn insert<'e, E>(executor: E, org: &Organization) -> AppResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO organizations (id, name, description, parent_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(org.id)
    .bind(&org.name)
    .bind(&org.description)
    .bind(org.parent_id)
    .bind(org.created_at)
    .bind(org.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Writes name, description and updated_at. The parent never changes.
pub async fn update<'e, E>(executor: E, org: &Organization) -> AppResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE organizations SET name = ?, description = ?, updated_at = ? WHERE id = ?")
        .bind(&org.name)
        .bind(&org.description)
        .bind(org.updated_at)
        .bind(org.id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn delete<'e, E>(executor: E, id: Uuid) -> AppResult<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM organizations WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn dependents<'e, E>(executor: E, id: Uuid) -> AppResult<OrganizationDependents>
where
    E: SqliteExecutor<'e>,
{
    let (users, tasks, children) = sqlx::query_as::<_, (i64, i64, i64)>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users WHERE organization_id = ?),
            (SELECT COUNT(*) FROM tasks WHERE organization_id = ?),
            (SELECT COUNT(*) FROM organizations WHERE parent_id = ?)
        "#,
    )
    .bind(id)
    .bind(id)
    .bind(id)
    .fetch_one(executor)
    .await?;

    Ok(OrganizationDependents { users, tasks, children })
}
