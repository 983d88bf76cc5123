//! MongoDB store
//!
//! Collections `users` and `tasks`. Documents use the UUID string as `_id` so
//! the same record can live in PostgreSQL and MongoDB under one identifier.
//! Timestamps are stored as BSON dates (millisecond precision).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions},
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, TaskStore, UserStore};
use crate::models::task::{Task, TaskFilter, TaskPatch};
use crate::models::user::User;

/// Server error code for a unique index violation
const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    database: Database,
    users: Collection<UserDocument>,
    tasks: Collection<TaskDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    password_hash: String,
    created_at: mongodb::bson::DateTime,
    updated_at: mongodb::bson::DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaskDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    due_date: Option<mongodb::bson::DateTime>,
    created_at: mongodb::bson::DateTime,
    updated_at: mongodb::bson::DateTime,
}

fn to_bson_date(dt: DateTime<Utc>) -> mongodb::bson::DateTime {
    mongodb::bson::DateTime::from_millis(dt.timestamp_millis())
}

fn from_bson_date(dt: mongodb::bson::DateTime) -> StoreResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis())
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {}", dt)))
}

fn parse_id(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("bad id {}: {}", raw, e)))
}

fn id_filter(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: to_bson_date(user.created_at),
            updated_at: to_bson_date(user.updated_at),
        }
    }
}

impl TryFrom<UserDocument> for User {
    type Error = StoreError;

    fn try_from(doc: UserDocument) -> Result<Self, Self::Error> {
        Ok(User {
            id: parse_id(&doc.id)?,
            name: doc.name,
            email: doc.email,
            password_hash: doc.password_hash,
            created_at: from_bson_date(doc.created_at)?,
            updated_at: from_bson_date(doc.updated_at)?,
        })
    }
}

impl From<&Task> for TaskDocument {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            user_id: task.user_id.to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status.as_str().to_string(),
            priority: task.priority.as_str().to_string(),
            due_date: task.due_date.map(to_bson_date),
            created_at: to_bson_date(task.created_at),
            updated_at: to_bson_date(task.updated_at),
        }
    }
}

impl TryFrom<TaskDocument> for Task {
    type Error = StoreError;

    fn try_from(doc: TaskDocument) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::models::task::ParseEnumError| {
            StoreError::Corrupt(format!("task {}: {}", doc.id, e))
        };

        Ok(Task {
            id: parse_id(&doc.id)?,
            user_id: parse_id(&doc.user_id)?,
            status: doc.status.parse().map_err(corrupt)?,
            priority: doc.priority.parse().map_err(corrupt)?,
            due_date: doc.due_date.map(from_bson_date).transpose()?,
            created_at: from_bson_date(doc.created_at)?,
            updated_at: from_bson_date(doc.updated_at)?,
            title: doc.title,
            description: doc.description,
        })
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

impl MongoStore {
    pub fn new(database: Database) -> Self {
        Self {
            users: database.collection("users"),
            tasks: database.collection("tasks"),
            database,
        }
    }

    /// Creates the unique email index and the per-user task indexes
    ///
    /// Idempotent; existing indexes with the same keys are left alone.
    #[instrument(skip(self), fields(database = %self.database.name()))]
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let unique = IndexOptions::builder().unique(true).build();
        self.users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;

        let task_indexes = [
            doc! { "user_id": 1, "status": 1 },
            doc! { "user_id": 1, "priority": 1 },
            doc! { "user_id": 1, "created_at": -1 },
        ]
        .into_iter()
        .map(|keys| IndexModel::builder().keys(keys).build());
        self.tasks.create_indexes(task_indexes).await?;

        tracing::debug!("mongodb indexes ensured");
        Ok(())
    }

    fn build_filter(owner: Uuid, filter: &TaskFilter) -> Document {
        let mut doc = doc! { "user_id": owner.to_string() };

        if let Some(status) = filter.status {
            doc.insert("status", status.as_str());
        }
        if let Some(priority) = filter.priority {
            doc.insert("priority", priority.as_str());
        }
        if let Some(title) = &filter.title {
            doc.insert(
                "title",
                doc! { "$regex": regex::escape(title), "$options": "i" },
            );
        }

        let mut due = Document::new();
        if let Some(from) = filter.due_from {
            due.insert("$gte", to_bson_date(from));
        }
        if let Some(to) = filter.due_to {
            due.insert("$lte", to_bson_date(to));
        }
        if !due.is_empty() {
            doc.insert("due_date", due);
        }

        doc
    }

    fn build_set(patch: &TaskPatch, updated_at: DateTime<Utc>) -> Document {
        let mut set = doc! { "updated_at": to_bson_date(updated_at) };

        if let Some(title) = &patch.title {
            set.insert("title", title.as_str());
        }
        if let Some(description) = &patch.description {
            set.insert(
                "description",
                description.as_deref().map_or(Bson::Null, |d| Bson::String(d.to_string())),
            );
        }
        if let Some(status) = patch.status {
            set.insert("status", status.as_str());
        }
        if let Some(priority) = patch.priority {
            set.insert("priority", priority.as_str());
        }
        if let Some(due_date) = patch.due_date {
            set.insert(
                "due_date",
                due_date.map_or(Bson::Null, |d| Bson::DateTime(to_bson_date(d))),
            );
        }

        set
    }
}

#[async_trait]
impl UserStore for MongoStore {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        match self.users.insert_one(UserDocument::from(user)).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate("email")),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.users
            .find_one(doc! { "email": email })
            .await?
            .map(User::try_from)
            .transpose()
    }
}

#[async_trait]
impl TaskStore for MongoStore {
    #[instrument(skip(self, task), fields(task_id = %task.id, user_id = %task.user_id))]
    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        self.tasks.insert_one(TaskDocument::from(task)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        self.tasks
            .find_one(id_filter(id))
            .await?
            .map(Task::try_from)
            .transpose()
    }

    #[instrument(skip(self, filter))]
    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();

        let cursor = self
            .tasks
            .find(Self::build_filter(owner, filter))
            .with_options(options)
            .await?;
        let documents: Vec<TaskDocument> = cursor.try_collect().await?;

        documents.into_iter().map(Task::try_from).collect()
    }

    #[instrument(skip(self, task), fields(task_id = %task.id))]
    async fn replace_task(&self, task: &Task) -> StoreResult<bool> {
        let result = self
            .tasks
            .replace_one(id_filter(task.id), TaskDocument::from(task))
            .await?;

        Ok(result.matched_count > 0)
    }

    #[instrument(skip(self, patch))]
    async fn patch_task(
        &self,
        id: Uuid,
        patch: &TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let update = doc! { "$set": Self::build_set(patch, updated_at) };
        let result = self.tasks.update_one(id_filter(id), update).await?;

        Ok(result.matched_count > 0)
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let result = self.tasks.delete_one(id_filter(id)).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl Store for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
