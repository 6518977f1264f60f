use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::user::{DbUser, User};

const COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, role, organization_id, created_at, updated_at";

pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> AppResult<Option<User>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, DbUser>(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.map(User::try_from).transpose()
}

/// Raw row including the password hash, for credential checks.
pub async fn find_by_email<'e, E>(executor: E, email: &str) -> AppResult<Option<DbUser>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, DbUser>(&format!("SELECT {COLUMNS} FROM users WHERE email = ?"))
        .bind(email)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

pub async fn email_exists<'e, E>(executor: E, email: &str) -> AppResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let exists = sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(executor)
        .await?;
    Ok(exists != 0)
}

pub async fn list_in_orgs<'e, E>(executor: E, org_ids: &[Uuid]) -> AppResult<Vec<User>>
where
    E: SqliteExecutor<'e>,
{
    if org_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM users WHERE organization_id IN ("));
    let mut separated = builder.separated(", ");
    for id in org_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY created_at DESC");

    let rows = builder.build_query_as::<DbUser>().fetch_all(executor).await?;
    rows.into_iter().map(User::try_from).collect()
}

pub async fn insert<'e, E>(executor: E, user: &User, password_hash: &str) -> AppResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, role, organization_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.role.as_str())
    .bind(user.organization_id)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Writes names, role and updated_at.
pub async fn update<'e, E>(executor: E, user: &User) -> AppResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE users SET first_name = ?, last_name = ?, role = ?, updated_at = ? WHERE id = ?")
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(user.updated_at)
        .bind(user.id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn delete<'e, E>(executor: E, id: Uuid) -> AppResult<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
