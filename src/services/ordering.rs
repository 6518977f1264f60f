//! Dense ordering of tasks within a board column.
//!
//! Within one (organization, status) column, `order` values are always
//! exactly `0..len`. This module plans the position shifts that keep that
//! true; `db::tasks::apply_shift` executes them.

use crate::errors::{AppError, AppResult};
use crate::models::task::TaskStatus;

/// A task's position on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub status: TaskStatus,
    pub order: i64,
}

impl Slot {
    pub fn new(status: TaskStatus, order: i64) -> Self {
        Self { status, order }
    }
}

/// Adds `delta` to every order in `status` within `from..=to` (open ended
/// when `to` is `None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub status: TaskStatus,
    pub from: i64,
    pub to: Option<i64>,
    pub delta: i64,
}

impl Shift {
    pub fn covers(&self, status: TaskStatus, order: i64) -> bool {
        status == self.status && order >= self.from && self.to.map_or(true, |to| order <= to)
    }
}

/// Closes the gap left by removing the task at `slot`.
pub fn plan_removal(slot: Slot) -> Shift {
    Shift {
        status: slot.status,
        from: slot.order + 1,
        to: None,
        delta: -1,
    }
}

/// Shifts needed to move a task from `from` to `to`. The moved task itself
/// is never covered by a returned shift.
pub fn plan_move(from: Slot, to: Slot) -> Vec<Shift> {
    if from.status != to.status {
        return vec![
            plan_removal(from),
            Shift {
                status: to.status,
                from: to.order,
                to: None,
                delta: 1,
            },
        ];
    }

    if to.order > from.order {
        vec![Shift {
            status: from.status,
            from: from.order + 1,
            to: Some(to.order),
            delta: -1,
        }]
    } else if to.order < from.order {
        vec![Shift {
            status: from.status,
            from: to.order,
            to: Some(from.order - 1),
            delta: 1,
        }]
    } else {
        Vec::new()
    }
}

/// Clamps a requested position into the target column. `column_len` is the
/// current length of the target column; when the task already sits in that
/// column the last valid index is `column_len - 1`, otherwise the task may
/// be appended at `column_len`.
pub fn clamp_target(requested: i64, column_len: i64, same_column: bool) -> AppResult<i64> {
    if requested < 0 {
        return Err(AppError::bad_request("order must not be negative"));
    }
    let max = if same_column { column_len - 1 } else { column_len };
    Ok(requested.min(max.max(0)))
}
