use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::audit::Auditable;
use crate::errors::AppError;
use crate::utils::{validate_optional_text, validate_text};

pub const MAX_TITLE: usize = 200;
pub const MAX_DESCRIPTION: usize = 2000;

/// Declares a lowercase string enum with `as_str`, `Display` and `FromStr`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal, default = $default:ident, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(AppError::bad_request(format!("unknown {} '{}'", $label, other))),
                }
            }
        }
    };
}

string_enum!(
    /// Board column. Task order is dense within each (organization, status).
    TaskStatus, "status", default = Todo, {
        Todo => "todo",
        InProgress => "in_progress",
        Done => "done",
    }
);

string_enum!(TaskCategory, "category", default = Other, {
    Work => "work",
    Personal => "personal",
    Urgent => "urgent",
    Other => "other",
});

string_enum!(TaskPriority, "priority", default = Medium, {
    Low => "low",
    Medium => "medium",
    High => "high",
});

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    #[schema(example = "Prepare quarterly report")]
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    /// Position within the task's (organization, status) column.
    #[schema(example = 0)]
    pub order: i64,
    #[schema(format = DateTime, example = "2025-10-10T10:00:00Z")]
    pub due_date: Option<DateTime<Utc>>,
    pub organization_id: Uuid,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Auditable for Task {
    fn resource_name() -> &'static str {
        "task"
    }

    fn audit_id(&self) -> Uuid {
        self.id
    }

    fn audit_label(&self) -> String {
        self.title.clone()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTask {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub category: String,
    pub priority: String,
    pub sort_order: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub organization_id: Uuid,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbTask> for Task {
    type Error = AppError;

    fn try_from(value: DbTask) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, raw: &str| AppError::internal(format!("task {} has invalid {field} '{raw}'", value.id));

        Ok(Task {
            id: value.id,
            status: value.status.parse().map_err(|_| corrupt("status", &value.status))?,
            category: value.category.parse().map_err(|_| corrupt("category", &value.category))?,
            priority: value.priority.parse().map_err(|_| corrupt("priority", &value.priority))?,
            title: value.title,
            description: value.description,
            order: value.sort_order,
            due_date: value.due_date,
            organization_id: value.organization_id,
            created_by: value.created_by,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskCreateRequest {
    #[schema(example = "Define launch checklist")]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub category: Option<TaskCategory>,
    pub priority: Option<TaskPriority>,
    #[schema(format = DateTime, example = "2025-10-10T10:00:00Z")]
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskCreateRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_text("title", &self.title, MAX_TITLE)?;
        validate_optional_text("description", self.description.as_deref(), MAX_DESCRIPTION)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TaskUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Changing the status moves the task to the end of the new column
    /// unless `order` is also given.
    pub status: Option<TaskStatus>,
    pub category: Option<TaskCategory>,
    pub priority: Option<TaskPriority>,
    pub order: Option<i64>,
    #[schema(format = DateTime, example = "2025-11-01T10:00:00Z")]
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskUpdateRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            validate_text("title", title, MAX_TITLE)?;
        }
        validate_optional_text("description", self.description.as_deref(), MAX_DESCRIPTION)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskReorderRequest {
    #[schema(example = 0)]
    pub new_order: i64,
    pub new_status: Option<TaskStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub category: Option<TaskCategory>,
    pub priority: Option<TaskPriority>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskStats {
    pub by_status: Vec<StatusCount>,
    pub total: i64,
    pub completed: i64,
    /// Percentage of tasks in `done`, 0 when there are no tasks.
    pub completion_rate: f64,
}

impl TaskStats {
    /// Builds stats from per-status counts. Missing statuses count as zero.
    pub fn from_counts(counts: &[(TaskStatus, i64)]) -> Self {
        let by_status: Vec<StatusCount> = TaskStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: counts
                    .iter()
                    .filter(|(s, _)| s == status)
                    .map(|(_, c)| *c)
                    .sum(),
            })
            .collect();

        let total: i64 = by_status.iter().map(|s| s.count).sum();
        let completed = by_status
            .iter()
            .find(|s| s.status == TaskStatus::Done)
            .map(|s| s.count)
            .unwrap_or(0);
        let completion_rate = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            by_status,
            total,
            completed,
            completion_rate,
        }
    }
}
