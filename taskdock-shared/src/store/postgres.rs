//! PostgreSQL store
//!
//! Plain `sqlx::query_as` calls against the `users` and `tasks` tables created
//! by the migrations in `migrations/`. Status and priority are stored as
//! short strings and validated on the way out.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, TaskStore, UserStore};
use crate::models::task::{Task, TaskFilter, TaskPatch, TaskPriority, TaskStatus};
use crate::models::user::User;

const TASK_COLUMNS: &str =
    "id, user_id, title, description, status, priority, due_date, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for migrations and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Raw `tasks` row
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            status: TaskStatus::from_str(&row.status)
                .map_err(|e| StoreError::Corrupt(format!("task {}: {}", row.id, e)))?,
            priority: TaskPriority::from_str(&row.priority)
                .map_err(|e| StoreError::Corrupt(format!("task {}: {}", row.id, e)))?,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Escapes `LIKE` wildcards so the needle matches literally
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds the listing query; parameters are bound in the order they appear
fn list_query(filter: &TaskFilter) -> String {
    let mut query = format!("SELECT {} FROM tasks WHERE user_id = $1", TASK_COLUMNS);
    let mut bind_count = 1;

    if filter.status.is_some() {
        bind_count += 1;
        query.push_str(&format!(" AND status = ${}", bind_count));
    }
    if filter.priority.is_some() {
        bind_count += 1;
        query.push_str(&format!(" AND priority = ${}", bind_count));
    }
    if filter.title.is_some() {
        bind_count += 1;
        query.push_str(&format!(" AND title ILIKE ${} ESCAPE '\\'", bind_count));
    }
    if filter.due_from.is_some() {
        bind_count += 1;
        query.push_str(&format!(" AND due_date >= ${}", bind_count));
    }
    if filter.due_to.is_some() {
        bind_count += 1;
        query.push_str(&format!(" AND due_date <= ${}", bind_count));
    }

    query.push_str(" ORDER BY created_at DESC");
    query
}

/// Builds the partial update; `$1` is the ID and `$2` is `updated_at`
fn patch_query(patch: &TaskPatch) -> String {
    let mut query = String::from("UPDATE tasks SET updated_at = $2");
    let mut bind_count = 2;

    if patch.title.is_some() {
        bind_count += 1;
        query.push_str(&format!(", title = ${}", bind_count));
    }
    if patch.description.is_some() {
        bind_count += 1;
        query.push_str(&format!(", description = ${}", bind_count));
    }
    if patch.status.is_some() {
        bind_count += 1;
        query.push_str(&format!(", status = ${}", bind_count));
    }
    if patch.priority.is_some() {
        bind_count += 1;
        query.push_str(&format!(", priority = ${}", bind_count));
    }
    if patch.due_date.is_some() {
        bind_count += 1;
        query.push_str(&format!(", due_date = ${}", bind_count));
    }

    query.push_str(" WHERE id = $1");
    query
}

#[async_trait]
impl UserStore for PgStore {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Duplicate("email")
            }
            other => StoreError::Postgres(other),
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    #[instrument(skip(self, task), fields(task_id = %task.id, user_id = %task.user_id))]
    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, user_id, title, description, status, priority,
                               due_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(task.id)
        .bind(task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let query = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);

        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Task::try_from)
            .transpose()
    }

    #[instrument(skip(self, filter))]
    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let query = list_query(filter);
        let mut q = sqlx::query_as::<_, TaskRow>(&query).bind(owner);

        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority.as_str());
        }
        if let Some(title) = &filter.title {
            q = q.bind(format!("%{}%", escape_like(title)));
        }
        if let Some(from) = filter.due_from {
            q = q.bind(from);
        }
        if let Some(to) = filter.due_to {
            q = q.bind(to);
        }

        q.fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Task::try_from)
            .collect()
    }

    #[instrument(skip(self, task), fields(task_id = %task.id))]
    async fn replace_task(&self, task: &Task) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, status = $4, priority = $5,
                due_date = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, patch))]
    async fn patch_task(
        &self,
        id: Uuid,
        patch: &TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let query = patch_query(patch);
        let mut q = sqlx::query(&query).bind(id).bind(updated_at);

        if let Some(title) = &patch.title {
            q = q.bind(title);
        }
        if let Some(description) = &patch.description {
            q = q.bind(description);
        }
        if let Some(status) = patch.status {
            q = q.bind(status.as_str());
        }
        if let Some(priority) = patch.priority {
            q = q.bind(priority.as_str());
        }
        if let Some(due_date) = patch.due_date {
            q = q.bind(due_date);
        }

        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_list_query_without_filters() {
        assert_eq!(
            list_query(&TaskFilter::default()),
            format!("SELECT {} FROM tasks WHERE user_id = $1 ORDER BY created_at DESC", TASK_COLUMNS)
        );
    }

    #[test]
    fn test_list_query_numbers_binds_in_order() {
        let filter = TaskFilter {
            status: Some(TaskStatus::Done),
            title: Some("milk".to_string()),
            due_to: Some(Utc::now()),
            ..Default::default()
        };
        let query = list_query(&filter);

        assert!(query.contains("status = $2"));
        assert!(query.contains("title ILIKE $3"));
        assert!(query.contains("due_date <= $4"));
        assert!(!query.contains("priority ="));
    }

    #[test]
    fn test_patch_query_only_sets_present_fields() {
        let patch = TaskPatch {
            status: Some(TaskStatus::Done),
            due_date: Some(None),
            ..Default::default()
        };

        assert_eq!(
            patch_query(&patch),
            "UPDATE tasks SET updated_at = $2, status = $3, due_date = $4 WHERE id = $1"
        );
    }
}
