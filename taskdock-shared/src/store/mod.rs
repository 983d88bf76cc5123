//! Storage interface
//!
//! One async trait pair covers everything the services persist. Three
//! implementations exist:
//!
//! - [`postgres::PgStore`]: relational variant on sqlx
//! - [`mongo::MongoStore`]: document variant on the mongodb driver
//! - [`memory::MemoryStore`]: process-local maps for development and tests
//!
//! Services never hold a store directly; they go through
//! [`dual_write::DualWrite`], which owns the primary and the optional
//! secondary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::task::{Task, TaskFilter, TaskPatch};
use crate::models::user::User;

pub mod connect;
pub mod dual_write;
pub mod memory;
pub mod mongo;
pub mod postgres;

pub use dual_write::{DualWrite, MirrorOutcome};

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique constraint violated on the named field
    #[error("duplicate value for unique field `{0}`")]
    Duplicate(&'static str),

    #[error("database error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// A stored record could not be mapped back to a domain type
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A write addressed a record the store does not hold
    #[error("record {0} not found")]
    Missing(Uuid),
}

/// Maps the `bool` of an update or delete to an error when nothing matched
pub fn require_found(found: bool, id: Uuid) -> StoreResult<()> {
    if found {
        Ok(())
    } else {
        Err(StoreError::Missing(id))
    }
}

/// Credential persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user; `StoreError::Duplicate("email")` if the email is taken
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
}

/// Task persistence
///
/// Mutations report whether a record with the given ID existed.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: &Task) -> StoreResult<()>;

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Tasks owned by `owner` matching `filter`, newest first
    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    /// Overwrites every mutable field of the stored task with `task`
    async fn replace_task(&self, task: &Task) -> StoreResult<bool>;

    /// Writes only the fields present in `patch`, plus `updated_at`
    async fn patch_task(
        &self,
        id: Uuid,
        patch: &TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;
}

/// A complete backend
#[async_trait]
pub trait Store: UserStore + TaskStore {
    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Round-trips to the backend
    async fn ping(&self) -> StoreResult<()>;
}
