use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::ordering::{clamp_target, plan_move, plan_removal, Slot};
use super::ServiceContext;
use crate::audit::AuditEvent;
use crate::authz::{Action, Actor, ResourceRef};
use crate::db;
use crate::errors::{AppError, AppResult};
use crate::models::audit::AuditAction;
use crate::models::task::{
    Task, TaskCreateRequest, TaskListQuery, TaskReorderRequest, TaskStats, TaskStatus, TaskUpdateRequest,
};

/// Where a saved task ends up on the board.
#[derive(Debug, Clone, Copy)]
enum Placement {
    Keep,
    EndOf(TaskStatus),
    At(TaskStatus, i64),
}

fn not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("Task with ID {id} not found"))
}

async fn load(pool: &SqlitePool, id: Uuid) -> AppResult<Task> {
    db::tasks::find_by_id(pool, id).await?.ok_or_else(|| not_found(id))
}

/// Loads a task and checks `action` against it.
async fn load_authorized(ctx: &ServiceContext<'_>, actor: &Actor, id: Uuid, action: Action) -> AppResult<Task> {
    let task = load(ctx.pool, id).await?;
    let scope = ctx.scope(actor).await?;
    let decision = ctx.policy.authorize(actor, &scope, &ResourceRef::task(&task), action);
    ctx.enforce(actor, decision, "task", Some(id)).await?;
    Ok(task)
}

fn apply_patch(task: &mut Task, patch: &TaskUpdateRequest) {
    if let Some(title) = &patch.title {
        task.title = title.trim().to_string();
    }
    if let Some(description) = &patch.description {
        task.description = Some(description.clone());
    }
    if let Some(category) = patch.category {
        task.category = category;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(due_date) = patch.due_date {
        task.due_date = Some(due_date);
    }
}

/// Saves field edits and a position change in one transaction. The task
/// row is written first so the write lock is held before sibling positions
/// are read.
async fn save(pool: &SqlitePool, id: Uuid, placement: Placement, patch: Option<&TaskUpdateRequest>) -> AppResult<Task> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    if db::tasks::touch(&mut *tx, id, now).await? == 0 {
        return Err(not_found(id));
    }
    let mut task = db::tasks::find_by_id(&mut *tx, id).await?.ok_or_else(|| not_found(id))?;

    let from = Slot::new(task.status, task.order);
    let target = match placement {
        Placement::Keep => from,
        Placement::EndOf(status) if status == from.status => from,
        Placement::EndOf(status) => {
            let len = db::tasks::column_len(&mut *tx, task.organization_id, status).await?;
            Slot::new(status, len)
        }
        Placement::At(status, requested) => {
            let len = db::tasks::column_len(&mut *tx, task.organization_id, status).await?;
            Slot::new(status, clamp_target(requested, len, status == from.status)?)
        }
    };

    for shift in plan_move(from, target) {
        db::tasks::apply_shift(&mut *tx, task.organization_id, &shift).await?;
    }

    if let Some(patch) = patch {
        apply_patch(&mut task, patch);
    }
    task.status = target.status;
    task.order = target.order;
    task.updated_at = now;

    db::tasks::update(&mut *tx, &task).await?;
    tx.commit().await?;

    if from != target {
        tracing::debug!(
            task_id = %id,
            from_status = %from.status,
            from_order = from.order,
            to_status = %target.status,
            to_order = target.order,
            "task moved"
        );
    }
    Ok(task)
}

/// Creates a task in the actor's organization at the end of its column.
pub async fn create(ctx: &ServiceContext<'_>, actor: &Actor, request: TaskCreateRequest) -> AppResult<Task> {
    request.validate()?;

    let now = Utc::now();
    let draft = Task {
        id: Uuid::new_v4(),
        title: request.title.trim().to_string(),
        description: request.description,
        status: request.status.unwrap_or_default(),
        category: request.category.unwrap_or_default(),
        priority: request.priority.unwrap_or_default(),
        order: 0,
        due_date: request.due_date,
        organization_id: actor.organization_id,
        created_by: Some(actor.id),
        created_at: now,
        updated_at: now,
    };

    let task = db::tasks::insert(ctx.pool, &draft).await?;
    ctx.record(AuditEvent::for_entity(actor, AuditAction::Create, &task)).await;
    Ok(task)
}

pub async fn list(ctx: &ServiceContext<'_>, actor: &Actor, filter: TaskListQuery) -> AppResult<Vec<Task>> {
    let scope = ctx.scope(actor).await?;
    let tasks = db::tasks::list(ctx.pool, &scope.to_vec(), &filter).await?;

    ctx.record(
        AuditEvent::new(actor, AuditAction::Read, "task").with_detail(format!("Listed {} tasks", tasks.len())),
    )
    .await;
    Ok(tasks)
}

pub async fn get(ctx: &ServiceContext<'_>, actor: &Actor, id: Uuid) -> AppResult<Task> {
    load_authorized(ctx, actor, id, Action::Read).await
}

/// Field edits plus optional moves: an explicit `order` is a reorder, a
/// bare status change moves the task to the end of the new column.
pub async fn update(ctx: &ServiceContext<'_>, actor: &Actor, id: Uuid, request: TaskUpdateRequest) -> AppResult<Task> {
    request.validate()?;
    let current = load_authorized(ctx, actor, id, Action::Update).await?;

    let status = request.status.unwrap_or(current.status);
    let placement = match request.order {
        Some(order) => Placement::At(status, order),
        None if status != current.status => Placement::EndOf(status),
        None => Placement::Keep,
    };

    let task = save(ctx.pool, id, placement, Some(&request)).await?;
    ctx.record(AuditEvent::for_entity(actor, AuditAction::Update, &task)).await;
    Ok(task)
}

pub async fn reorder(ctx: &ServiceContext<'_>, actor: &Actor, id: Uuid, request: TaskReorderRequest) -> AppResult<Task> {
    let current = load_authorized(ctx, actor, id, Action::Update).await?;
    if request.new_order < 0 {
        return Err(AppError::bad_request("new_order must not be negative"));
    }

    let status = request.new_status.unwrap_or(current.status);
    let task = save(ctx.pool, id, Placement::At(status, request.new_order), None).await?;

    ctx.record(
        AuditEvent::for_entity(actor, AuditAction::Update, &task).with_detail(format!(
            "Moved task '{}' to {} #{}",
            task.title, task.status, task.order
        )),
    )
    .await;
    Ok(task)
}

pub async fn delete(ctx: &ServiceContext<'_>, actor: &Actor, id: Uuid) -> AppResult<()> {
    load_authorized(ctx, actor, id, Action::Delete).await?;

    let mut tx = ctx.pool.begin().await?;
    if db::tasks::touch(&mut *tx, id, Utc::now()).await? == 0 {
        return Err(not_found(id));
    }
    let task = db::tasks::find_by_id(&mut *tx, id).await?.ok_or_else(|| not_found(id))?;
    db::tasks::delete(&mut *tx, id).await?;
    db::tasks::apply_shift(&mut *tx, task.organization_id, &plan_removal(Slot::new(task.status, task.order))).await?;
    tx.commit().await?;

    ctx.record(AuditEvent::for_entity(actor, AuditAction::Delete, &task)).await;
    Ok(())
}

pub async fn stats(ctx: &ServiceContext<'_>, actor: &Actor) -> AppResult<TaskStats> {
    let scope = ctx.scope(actor).await?;
    let counts = db::tasks::count_by_status(ctx.pool, &scope.to_vec()).await?;
    Ok(TaskStats::from_counts(&counts))
}
