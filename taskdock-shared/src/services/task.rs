//! Task CRUD with per-user ownership checks
//!
//! Every lookup by ID follows the same order: malformed ID (400), missing
//! task (404), foreign owner (403). Mutations go to the primary store first
//! and are then mirrored through [`DualWrite`].

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::task::{
    parse_due_date, NewTask, Task, TaskChanges, TaskDraft, TaskFilter, TaskPatch,
    DESCRIPTION_MAX_LEN, TITLE_MAX_LEN, TITLE_MIN_LEN,
};
use crate::store::{require_found, DualWrite};

fn parse_task_id(raw: &str) -> ServiceResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::BadRequest("Invalid task id".to_string()))
}

/// Trims and length-checks a title
fn clean_title(title: Option<&str>) -> ServiceResult<String> {
    let title = title.map(str::trim).unwrap_or_default();
    let len = title.chars().count();

    if len < TITLE_MIN_LEN {
        return Err(ServiceError::UnprocessableEntity(format!(
            "Title must be at least {} characters",
            TITLE_MIN_LEN
        )));
    }
    if len > TITLE_MAX_LEN {
        return Err(ServiceError::UnprocessableEntity(format!(
            "Title must be at most {} characters",
            TITLE_MAX_LEN
        )));
    }

    Ok(title.to_string())
}

/// Trims and length-checks a description
fn clean_description(description: &str) -> ServiceResult<String> {
    let description = description.trim();

    if description.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(ServiceError::UnprocessableEntity(format!(
            "Description must be at most {} characters",
            DESCRIPTION_MAX_LEN
        )));
    }

    Ok(description.to_string())
}

fn clean_due_date(raw: &str) -> ServiceResult<chrono::DateTime<Utc>> {
    parse_due_date(raw).ok_or_else(|| {
        ServiceError::UnprocessableEntity("dueDate must be an ISO 8601 date".to_string())
    })
}

#[derive(Clone)]
pub struct TaskService {
    stores: DualWrite,
}

impl TaskService {
    pub fn new(stores: DualWrite) -> Self {
        Self { stores }
    }

    /// Loads a task and checks the caller owns it
    async fn owned_task(&self, user_id: Uuid, id: &str) -> ServiceResult<Task> {
        let id = parse_task_id(id)?;

        let task = self
            .stores
            .primary()
            .find_task(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))?;

        if !task.is_owned_by(user_id) {
            return Err(ServiceError::Forbidden(
                "You do not have access to this task".to_string(),
            ));
        }

        Ok(task)
    }

    /// Creates a task owned by `user_id`
    ///
    /// Defaults: status `todo`, priority `medium`, no due date.
    #[instrument(skip(self, draft), fields(user_id = %user_id))]
    pub async fn create(&self, user_id: Uuid, draft: TaskDraft) -> ServiceResult<Task> {
        let title = clean_title(draft.title.as_deref())?;
        let description = draft.description.as_deref().map(clean_description).transpose()?;
        let due_date = draft.due_date.as_deref().map(clean_due_date).transpose()?;

        let task = Task::new(NewTask {
            user_id,
            title,
            description,
            status: draft.status.unwrap_or_default(),
            priority: draft.priority.unwrap_or_default(),
            due_date,
        });

        self.stores.primary().insert_task(&task).await?;
        info!(task_id = %task.id, "task created");

        let record = &task;
        self.stores
            .mirror("insert_task", |store| async move { store.insert_task(record).await })
            .await;

        Ok(task)
    }

    /// Lists the caller's tasks, newest first
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list(&self, user_id: Uuid, filter: &TaskFilter) -> ServiceResult<Vec<Task>> {
        Ok(self.stores.primary().list_tasks(user_id, filter).await?)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_by_id(&self, user_id: Uuid, id: &str) -> ServiceResult<Task> {
        self.owned_task(user_id, id).await
    }

    /// Full replace
    ///
    /// Omitted fields are reset: status `todo`, priority `medium`,
    /// description empty, due date cleared.
    #[instrument(skip(self, draft), fields(user_id = %user_id))]
    pub async fn update_put(&self, user_id: Uuid, id: &str, draft: TaskDraft) -> ServiceResult<Task> {
        let mut task = self.owned_task(user_id, id).await?;

        task.title = clean_title(draft.title.as_deref())?;
        task.description = Some(clean_description(draft.description.as_deref().unwrap_or_default())?);
        task.status = draft.status.unwrap_or_default();
        task.priority = draft.priority.unwrap_or_default();
        task.due_date = draft.due_date.as_deref().map(clean_due_date).transpose()?;
        task.updated_at = Utc::now();

        if !self.stores.primary().replace_task(&task).await? {
            return Err(ServiceError::NotFound("Task not found".to_string()));
        }
        info!(task_id = %task.id, "task replaced");

        let record = &task;
        self.stores
            .mirror("replace_task", |store| async move {
                store
                    .replace_task(record)
                    .await
                    .and_then(|found| require_found(found, record.id))
            })
            .await;

        Ok(task)
    }

    /// Partial update; only fields present in `changes` are written
    ///
    /// `description: null` and `dueDate: null` clear those fields.
    #[instrument(skip(self, changes), fields(user_id = %user_id))]
    pub async fn update_patch(
        &self,
        user_id: Uuid,
        id: &str,
        changes: TaskChanges,
    ) -> ServiceResult<Task> {
        let mut task = self.owned_task(user_id, id).await?;

        let patch = TaskPatch {
            title: changes.title.as_deref().map(|t| clean_title(Some(t))).transpose()?,
            description: changes
                .description
                .map(|d| d.as_deref().map(clean_description).transpose())
                .transpose()?,
            status: changes.status,
            priority: changes.priority,
            due_date: changes
                .due_date
                .map(|d| d.as_deref().map(clean_due_date).transpose())
                .transpose()?,
        };

        let updated_at = Utc::now();
        if !self.stores.primary().patch_task(task.id, &patch, updated_at).await? {
            return Err(ServiceError::NotFound("Task not found".to_string()));
        }
        patch.apply(&mut task, updated_at);
        info!(task_id = %task.id, "task patched");

        let task_id = task.id;
        let patch = &patch;
        self.stores
            .mirror("patch_task", |store| async move {
                store
                    .patch_task(task_id, patch, updated_at)
                    .await
                    .and_then(|found| require_found(found, task_id))
            })
            .await;

        Ok(task)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete(&self, user_id: Uuid, id: &str) -> ServiceResult<()> {
        let task = self.owned_task(user_id, id).await?;

        if !self.stores.primary().delete_task(task.id).await? {
            return Err(ServiceError::NotFound("Task not found".to_string()));
        }
        info!(task_id = %task.id, "task deleted");

        let task_id = task.id;
        self.stores
            .mirror("delete_task", |store| async move {
                store
                    .delete_task(task_id)
                    .await
                    .and_then(|found| require_found(found, task_id))
            })
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title_trims_and_checks_length() {
        assert_eq!(clean_title(Some("  abc  ")).unwrap(), "abc");
        assert!(matches!(
            clean_title(Some("ab")),
            Err(ServiceError::UnprocessableEntity(_))
        ));
        assert!(matches!(
            clean_title(Some("   ab   ")),
            Err(ServiceError::UnprocessableEntity(_))
        ));
        assert!(clean_title(None).is_err());
        assert!(clean_title(Some(&"x".repeat(121))).is_err());
        assert!(clean_title(Some(&"x".repeat(120))).is_ok());
    }

    #[test]
    fn test_clean_description_limit() {
        assert_eq!(clean_description("  notes ").unwrap(), "notes");
        assert!(clean_description(&"d".repeat(2001)).is_err());
    }

    #[test]
    fn test_parse_task_id() {
        assert!(parse_task_id(&Uuid::new_v4().to_string()).is_ok());
        assert!(matches!(
            parse_task_id("not-a-uuid"),
            Err(ServiceError::BadRequest(_))
        ));
    }
}
