/// Task endpoints
///
/// All routes require a bearer token and act only on the caller's tasks.
///
/// ```text
/// POST   /tasks         create                  -> 201 task
/// GET    /tasks         list, filtered          -> 200 [task]
/// GET    /tasks/:id     fetch one               -> 200 task
/// PUT    /tasks/:id     full replace            -> 200 task
/// PATCH  /tasks/:id     partial update          -> 200 task
/// DELETE /tasks/:id     remove                  -> 204
/// ```
///
/// Bodies and query strings are validated here and rejected with 422 and a
/// `details` list; the service then applies ownership and its own rules.

use std::str::FromStr;

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use taskdock_shared::{
    auth::middleware::AuthContext,
    models::task::{
        double_option, parse_due_date, Task, TaskChanges, TaskDraft, TaskFilter, TaskPriority,
        TaskStatus, DESCRIPTION_MAX_LEN, TITLE_MAX_LEN, TITLE_MIN_LEN,
    },
};
use validator::{Validate, ValidationError};

fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.trim().chars().count();
    if (TITLE_MIN_LEN..=TITLE_MAX_LEN).contains(&len) {
        return Ok(());
    }
    let message = if len < TITLE_MIN_LEN {
        "Title must be at least 3 characters"
    } else {
        "Title must be at most 120 characters"
    };
    let mut error = ValidationError::new("title_length");
    error.message = Some(message.into());
    Err(error)
}

/// Collects per-field failures across `validator` and manual checks
#[derive(Default)]
struct FieldErrors(Vec<ValidationErrorDetail>);

impl FieldErrors {
    fn from_validation<T: Validate>(body: &T) -> Self {
        match body.validate() {
            Ok(()) => Self::default(),
            Err(e) => Self(validation_details(&e)),
        }
    }

    fn push(&mut self, field: &str, message: &str) {
        self.0.push(ValidationErrorDetail::new(field, message));
    }

    fn parse<T: FromStr>(&mut self, field: &str, raw: Option<&str>, message: &str) -> Option<T> {
        let raw = raw?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.push(field, message);
                None
            }
        }
    }

    fn check_date(&mut self, field: &str, raw: Option<&str>) {
        if let Some(raw) = raw {
            if parse_due_date(raw).is_none() {
                self.push(field, &format!("{} must be an ISO 8601 date", field));
            }
        }
    }

    fn finish<T>(self, value: T) -> ApiResult<T> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ApiError::ValidationError(self.0))
        }
    }
}

/// Body of `POST /tasks` and `PUT /tasks/:id`
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskBody {
    #[validate(custom(function = "validate_title"))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
}

impl TaskBody {
    /// Validates the body; the title is mandatory
    pub fn into_draft(self) -> ApiResult<TaskDraft> {
        let mut errors = FieldErrors::from_validation(&self);

        if self.title.is_none() {
            errors.push("title", "Title is required");
        }
        let status = errors.parse::<TaskStatus>("status", self.status.as_deref(), "Invalid status");
        let priority =
            errors.parse::<TaskPriority>("priority", self.priority.as_deref(), "Invalid priority");
        errors.check_date("dueDate", self.due_date.as_deref());

        errors.finish(TaskDraft {
            title: self.title,
            description: self.description,
            status,
            priority,
            due_date: self.due_date,
        })
    }
}

/// Body of `PATCH /tasks/:id`
///
/// `description` and `dueDate` distinguish an absent field from `null`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatchBody {
    #[validate(custom(function = "validate_title"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<String>,
    pub priority: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
}

impl TaskPatchBody {
    pub fn into_changes(self) -> ApiResult<TaskChanges> {
        let mut errors = FieldErrors::from_validation(&self);

        if let Some(Some(description)) = &self.description {
            if description.chars().count() > DESCRIPTION_MAX_LEN {
                errors.push("description", "Description must be at most 2000 characters");
            }
        }
        let status = errors.parse::<TaskStatus>("status", self.status.as_deref(), "Invalid status");
        let priority =
            errors.parse::<TaskPriority>("priority", self.priority.as_deref(), "Invalid priority");
        errors.check_date("dueDate", self.due_date.as_ref().and_then(|d| d.as_deref()));

        errors.finish(TaskChanges {
            title: self.title,
            description: self.description,
            status,
            priority,
            due_date: self.due_date,
        })
    }
}

/// Query string of `GET /tasks`; empty values count as absent
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub title: Option<String>,
    pub due_date_from: Option<String>,
    pub due_date_to: Option<String>,
}

impl ListTasksQuery {
    pub fn into_filter(self) -> ApiResult<TaskFilter> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        let mut errors = FieldErrors::default();
        let status_raw = present(self.status);
        let priority_raw = present(self.priority);
        let from_raw = present(self.due_date_from);
        let to_raw = present(self.due_date_to);

        let status = errors.parse::<TaskStatus>("status", status_raw.as_deref(), "Invalid status");
        let priority =
            errors.parse::<TaskPriority>("priority", priority_raw.as_deref(), "Invalid priority");
        errors.check_date("dueDateFrom", from_raw.as_deref());
        errors.check_date("dueDateTo", to_raw.as_deref());

        errors.finish(TaskFilter {
            status,
            priority,
            title: present(self.title),
            due_from: from_raw.as_deref().and_then(parse_due_date),
            due_to: to_raw.as_deref().and_then(parse_due_date),
        })
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<TaskBody>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let draft = body.into_draft()?;
    let task = state.tasks.create(auth.user_id, draft).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let filter = query.into_filter()?;
    Ok(Json(state.tasks.list(auth.user_id, &filter).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.get_by_id(auth.user_id, &id).await?))
}

/// Full replace; omitted optional fields are reset
pub async fn replace_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(body): Json<TaskBody>,
) -> ApiResult<Json<Task>> {
    let draft = body.into_draft()?;
    Ok(Json(state.tasks.update_put(auth.user_id, &id, draft).await?))
}

pub async fn patch_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(body): Json<TaskPatchBody>,
) -> ApiResult<Json<Task>> {
    let changes = body.into_changes()?;
    Ok(Json(state.tasks.update_patch(auth.user_id, &id, changes).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.tasks.delete(auth.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::ValidationError(details) => details.into_iter().map(|d| d.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_title_counts_trimmed_chars() {
        assert!(validate_title("abc").is_ok());
        assert!(validate_title("  abc  ").is_ok());
        assert!(validate_title("ab").is_err());
        assert!(validate_title("  ab   ").is_err());
        assert!(validate_title(&"t".repeat(120)).is_ok());
        assert!(validate_title(&"t".repeat(121)).is_err());
    }

    #[test]
    fn test_task_body_requires_title() {
        let err = TaskBody::default().into_draft().unwrap_err();
        assert_eq!(fields(err), vec!["title"]);
    }

    #[test]
    fn test_task_body_collects_every_failure() {
        let body: TaskBody = serde_json::from_str(
            r#"{"title":"ab","status":"blocked","priority":"urgent","dueDate":"soon"}"#,
        )
        .unwrap();

        let mut got = fields(body.into_draft().unwrap_err());
        got.sort();
        assert_eq!(got, vec!["dueDate", "priority", "status", "title"]);
    }

    #[test]
    fn test_task_body_parses_enums() {
        let body: TaskBody = serde_json::from_str(
            r#"{"title":"Buy milk","status":"in-progress","priority":"high","dueDate":"2025-05-01"}"#,
        )
        .unwrap();

        let draft = body.into_draft().unwrap();
        assert_eq!(draft.status, Some(TaskStatus::InProgress));
        assert_eq!(draft.priority, Some(TaskPriority::High));
        assert_eq!(draft.due_date.as_deref(), Some("2025-05-01"));
    }

    #[test]
    fn test_patch_body_allows_null_clears() {
        let body: TaskPatchBody =
            serde_json::from_str(r#"{"description":null,"dueDate":null}"#).unwrap();

        let changes = body.into_changes().unwrap();
        assert!(changes.title.is_none());
        assert_eq!(changes.description, Some(None));
        assert_eq!(changes.due_date, Some(None));
    }

    #[test]
    fn test_patch_body_rejects_short_title_and_long_description() {
        let body = TaskPatchBody {
            title: Some("ab".to_string()),
            description: Some(Some("d".repeat(2001))),
            ..Default::default()
        };

        let mut got = fields(body.into_changes().unwrap_err());
        got.sort();
        assert_eq!(got, vec!["description", "title"]);
    }

    #[test]
    fn test_query_treats_empty_values_as_absent() {
        let query = ListTasksQuery {
            status: Some(String::new()),
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.into_filter().unwrap(), TaskFilter::default());
    }

    #[test]
    fn test_query_validation() {
        let query = ListTasksQuery {
            status: Some("archived".to_string()),
            due_date_to: Some("31/01/2025".to_string()),
            ..Default::default()
        };
        let mut got = fields(query.into_filter().unwrap_err());
        got.sort();
        assert_eq!(got, vec!["dueDateTo", "status"]);

        let query = ListTasksQuery {
            priority: Some("high".to_string()),
            due_date_from: Some("2025-01-01".to_string()),
            ..Default::default()
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(filter.priority, Some(TaskPriority::High));
        assert_eq!(filter.due_from, parse_due_date("2025-01-01"));
    }
}
