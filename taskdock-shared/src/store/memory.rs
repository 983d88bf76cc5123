//! In-memory store
//!
//! Process-local maps behind tokio `RwLock`s. Used with
//! `STORE_BACKEND=memory` for local runs and by the test suites; data is lost
//! on restart. Clones share the same maps.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, TaskStore, UserStore};
use crate::models::task::{Task, TaskFilter, TaskPatch};
use crate::models::user::User;

#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    tasks: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Number of stored tasks
    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;

        if users.values().any(|existing| existing.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }

        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(())
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let tasks = self.tasks.read().await;

        let mut matching: Vec<Task> = tasks
            .values()
            .filter(|task| task.is_owned_by(owner) && filter.matches(task))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matching)
    }

    async fn replace_task(&self, task: &Task) -> StoreResult<bool> {
        let mut tasks = self.tasks.write().await;

        match tasks.get_mut(&task.id) {
            Some(stored) => {
                *stored = task.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn patch_task(
        &self,
        id: Uuid,
        patch: &TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut tasks = self.tasks.write().await;

        match tasks.get_mut(&id) {
            Some(stored) => {
                patch.apply(stored, updated_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tasks.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
