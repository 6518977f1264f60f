use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::task::{DbTask, Task, TaskListQuery, TaskStatus};
use crate::services::ordering::Shift;

const COLUMNS: &str = "id, title, description, status, category, priority, sort_order, due_date, \
                       organization_id, created_by, created_at, updated_at";

pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> AppResult<Option<Task>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, DbTask>(&format!("SELECT {COLUMNS} FROM tasks WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.map(Task::try_from).transpose()
}

/// Tasks in any of `org_ids` matching the filters, ordered by column and
/// position.
pub async fn list<'e, E>(executor: E, org_ids: &[Uuid], filter: &TaskListQuery) -> AppResult<Vec<Task>>
where
    E: SqliteExecutor<'e>,
{
    if org_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM tasks WHERE organization_id IN ("));
    let mut separated = builder.separated(", ");
    for id in org_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(category) = filter.category {
        builder.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(priority) = filter.priority {
        builder.push(" AND priority = ").push_bind(priority.as_str());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder
            .push(" AND LOWER(title) LIKE ")
            .push_bind(format!("%{}%", search.to_lowercase()));
    }
    builder.push(" ORDER BY status ASC, sort_order ASC, created_at DESC");

    let rows = builder.build_query_as::<DbTask>().fetch_all(executor).await?;
    rows.into_iter().map(Task::try_from).collect()
}

/// Inserts `task` at the end of its column. The position is computed in the
/// same statement; the stored row is returned.
pub async fn insert<'e, E>(executor: E, task: &Task) -> AppResult<Task>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, DbTask>(&format!(
        r#"
        INSERT INTO tasks (id, title, description, status, category, priority, sort_order, due_date,
                           organization_id, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?,
                (SELECT COUNT(*) FROM tasks WHERE organization_id = ? AND status = ?),
                ?, ?, ?, ?, ?)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status.as_str())
    .bind(task.category.as_str())
    .bind(task.priority.as_str())
    .bind(task.organization_id)
    .bind(task.status.as_str())
    .bind(task.due_date)
    .bind(task.organization_id)
    .bind(task.created_by)
    .bind(task.created_at)
    .bind(task.updated_at)
    .fetch_one(executor)
    .await?;

    Task::try_from(row)
}

/// Writes every mutable column of `task`, including its position.
pub async fn update<'e, E>(executor: E, task: &Task) -> AppResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE tasks
        SET title = ?, description = ?, status = ?, category = ?, priority = ?, sort_order = ?,
            due_date = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status.as_str())
    .bind(task.category.as_str())
    .bind(task.priority.as_str())
    .bind(task.order)
    .bind(task.due_date)
    .bind(task.updated_at)
    .bind(task.id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Bumps `updated_at`. Run first inside an ordering transaction so the
/// write lock is held before sibling positions are read.
pub async fn touch<'e, E>(executor: E, id: Uuid, now: DateTime<Utc>) -> AppResult<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE tasks SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn column_len<'e, E>(executor: E, organization_id: Uuid, status: TaskStatus) -> AppResult<i64>
where
    E: SqliteExecutor<'e>,
{
    let len = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE organization_id = ? AND status = ?")
        .bind(organization_id)
        .bind(status.as_str())
        .fetch_one(executor)
        .await?;
    Ok(len)
}

/// Positions in one column, ascending.
pub async fn column_orders<'e, E>(executor: E, organization_id: Uuid, status: TaskStatus) -> AppResult<Vec<i64>>
where
    E: SqliteExecutor<'e>,
{
    let orders = sqlx::query_scalar::<_, i64>(
        "SELECT sort_order FROM tasks WHERE organization_id = ? AND status = ? ORDER BY sort_order ASC",
    )
    .bind(organization_id)
    .bind(status.as_str())
    .fetch_all(executor)
    .await?;
    Ok(orders)
}

pub async fn apply_shift<'e, E>(executor: E, organization_id: Uuid, shift: &Shift) -> AppResult<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE tasks
        SET sort_order = sort_order + ?
        WHERE organization_id = ? AND status = ? AND sort_order >= ? AND (? IS NULL OR sort_order <= ?)
        "#,
    )
    .bind(shift.delta)
    .bind(organization_id)
    .bind(shift.status.as_str())
    .bind(shift.from)
    .bind(shift.to)
    .bind(shift.to)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete<'e, E>(executor: E, id: Uuid) -> AppResult<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_by_status<'e, E>(executor: E, org_ids: &[Uuid]) -> AppResult<Vec<(TaskStatus, i64)>>
where
    E: SqliteExecutor<'e>,
{
    if org_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new("SELECT status, COUNT(*) FROM tasks WHERE organization_id IN (");
    let mut separated = builder.separated(", ");
    for id in org_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") GROUP BY status");

    let rows = builder.build_query_as::<(String, i64)>().fetch_all(executor).await?;
    rows.into_iter()
        .map(|(status, count)| Ok((status.parse::<TaskStatus>()?, count)))
        .collect()
}
