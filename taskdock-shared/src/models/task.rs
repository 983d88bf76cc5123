/// Task model
///
/// Tasks belong to exactly one user. Status moves freely between its three
/// values; no transition is forbidden.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(120) NOT NULL,
///     description VARCHAR(2000),
///     status VARCHAR(20) NOT NULL DEFAULT 'todo',
///     priority VARCHAR(20) NOT NULL DEFAULT 'medium',
///     due_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```
/// use taskdock_shared::models::task::{NewTask, Task, TaskPriority, TaskStatus};
/// use uuid::Uuid;
///
/// let task = Task::new(NewTask {
///     user_id: Uuid::new_v4(),
///     title: "Buy milk".to_string(),
///     description: None,
///     status: TaskStatus::default(),
///     priority: TaskPriority::default(),
///     due_date: None,
/// });
///
/// assert_eq!(task.status, TaskStatus::Todo);
/// assert_eq!(task.priority, TaskPriority::Medium);
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Minimum title length, counted in characters after trimming
pub const TITLE_MIN_LEN: usize = 3;

/// Maximum title length
pub const TITLE_MAX_LEN: usize = 120;

/// Maximum description length
pub const DESCRIPTION_MAX_LEN: usize = 2000;

/// Error returned when a status or priority string is not a known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Task progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Converts status to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in-progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    /// Converts priority to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(ParseEnumError {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID, identical in primary and secondary stores
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
}

impl Task {
    /// Builds a new task record with a fresh ID and timestamps
    pub fn new(data: NewTask) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            due_date: data.due_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user_id` owns this task
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Fields supplied when creating or fully replacing a task
///
/// The due date is still the raw client string; services parse it.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<String>,
}

/// Fields supplied for a partial update
///
/// Outer `None` means the field was absent; `Some(None)` means an explicit
/// `null` that clears the value.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<String>>,
}

/// Validated partial update, as written to the stores
///
/// Only `Some` fields are touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    /// True when the patch changes no field
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }

    /// Applies the present fields to `task` and stamps `updated_at`
    pub fn apply(&self, task: &mut Task, updated_at: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        task.updated_at = updated_at;
    }
}

/// Listing filters; all present filters must match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    /// Case-insensitive substring, matched literally
    pub title: Option<String>,

    /// Inclusive lower bound on the due date
    pub due_from: Option<DateTime<Utc>>,

    /// Inclusive upper bound on the due date
    pub due_to: Option<DateTime<Utc>>,
}

impl TaskFilter {
    /// Evaluates the filter against a task in memory
    ///
    /// A task without a due date never matches a due-date bound.
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|status| status != task.status) {
            return false;
        }
        if self.priority.is_some_and(|priority| priority != task.priority) {
            return false;
        }
        if let Some(needle) = &self.title {
            if !task.title.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if self.due_from.is_some() || self.due_to.is_some() {
            let Some(due) = task.due_date else {
                return false;
            };
            if self.due_from.is_some_and(|from| due < from) {
                return false;
            }
            if self.due_to.is_some_and(|to| due > to) {
                return false;
            }
        }
        true
    }
}

/// Parses an ISO 8601 date or date-time
///
/// Accepts RFC 3339 (`2025-03-01T10:00:00Z`, offsets allowed), a date-time
/// without offset (read as UTC) and a bare date (midnight UTC).
pub fn parse_due_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Deserializes a field so that `null` becomes `Some(None)`
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` to tell an
/// absent field (`None`) from an explicit `null`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
