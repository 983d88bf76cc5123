//! Shared fixtures for service and store integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taskdock_shared::models::task::{Task, TaskFilter, TaskPatch};
use taskdock_shared::models::user::User;
use taskdock_shared::services::{AuthService, TaskService, TokenSettings};
use taskdock_shared::store::memory::MemoryStore;
use taskdock_shared::store::{DualWrite, Store, StoreError, StoreResult, TaskStore, UserStore};
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Store whose every call fails, standing in for an unreachable database
#[derive(Clone, Default)]
pub struct FailingStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl UserStore for FailingStore {
    async fn insert_user(&self, _user: &User) -> StoreResult<()> {
        down()
    }

    async fn find_user_by_email(&self, _email: &str) -> StoreResult<Option<User>> {
        down()
    }
}

#[async_trait]
impl TaskStore for FailingStore {
    async fn insert_task(&self, _task: &Task) -> StoreResult<()> {
        down()
    }

    async fn find_task(&self, _id: Uuid) -> StoreResult<Option<Task>> {
        down()
    }

    async fn list_tasks(&self, _owner: Uuid, _filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        down()
    }

    async fn replace_task(&self, _task: &Task) -> StoreResult<bool> {
        down()
    }

    async fn patch_task(
        &self,
        _id: Uuid,
        _patch: &TaskPatch,
        _updated_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        down()
    }

    async fn delete_task(&self, _id: Uuid) -> StoreResult<bool> {
        down()
    }
}

#[async_trait]
impl Store for FailingStore {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn ping(&self) -> StoreResult<()> {
        down()
    }
}

/// Services wired to in-memory stores
pub struct Harness {
    pub primary: MemoryStore,
    pub secondary: Option<MemoryStore>,
    pub auth: AuthService,
    pub tasks: TaskService,
}

impl Harness {
    fn build(primary: MemoryStore, secondary: Option<Arc<dyn Store>>, enabled: bool) -> DualWrite {
        DualWrite::new(Arc::new(primary), secondary, enabled)
    }

    fn wire(stores: DualWrite) -> (AuthService, TaskService) {
        (
            AuthService::new(stores.clone(), TokenSettings::new(SECRET, 3600)),
            TaskService::new(stores),
        )
    }

    /// Primary only
    pub fn single() -> Self {
        let primary = MemoryStore::new();
        let (auth, tasks) = Self::wire(Self::build(primary.clone(), None, false));
        Self {
            primary,
            secondary: None,
            auth,
            tasks,
        }
    }

    /// Primary plus a healthy in-memory secondary
    pub fn mirrored() -> Self {
        let primary = MemoryStore::new();
        let secondary = MemoryStore::new();
        let (auth, tasks) = Self::wire(Self::build(
            primary.clone(),
            Some(Arc::new(secondary.clone())),
            true,
        ));
        Self {
            primary,
            secondary: Some(secondary),
            auth,
            tasks,
        }
    }

    /// Primary plus a secondary that rejects everything
    pub fn broken_secondary() -> Self {
        let primary = MemoryStore::new();
        let (auth, tasks) = Self::wire(Self::build(
            primary.clone(),
            Some(Arc::new(FailingStore)),
            true,
        ));
        Self {
            primary,
            secondary: None,
            auth,
            tasks,
        }
    }

    /// Registers a user with a fixed password and returns its ID
    pub async fn user(&self, name: &str, email: &str) -> Uuid {
        self.auth
            .register(name, email, "secret123")
            .await
            .expect("registration should succeed")
            .id
    }
}
