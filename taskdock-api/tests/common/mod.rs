//! Common test utilities for router tests
//!
//! Builds the full Axum router on top of in-memory stores so every test runs
//! without external services, and offers small request helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use taskdock_api::app::{build_router, AppState};
use taskdock_api::config::Config;
use taskdock_shared::models::task::{Task, TaskFilter, TaskPatch};
use taskdock_shared::models::user::User;
use taskdock_shared::store::memory::MemoryStore;
use taskdock_shared::store::{DualWrite, Store, StoreError, StoreResult, TaskStore, UserStore};
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "router-test-secret-at-least-32-bytes!!";

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

pub fn test_config(production: bool) -> Config {
    let vars: HashMap<&str, &str> = [
        ("JWT_SECRET", SECRET),
        ("STORE_BACKEND", "memory"),
        ("APP_ENV", if production { "production" } else { "development" }),
    ]
    .into_iter()
    .collect();

    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).expect("test config")
}

/// Router plus handles on the stores behind it
pub struct TestApp {
    pub router: Router,
    pub primary: MemoryStore,
    pub secondary: Option<MemoryStore>,
}

impl TestApp {
    fn build(stores: DualWrite, primary: MemoryStore, secondary: Option<MemoryStore>) -> Self {
        Self {
            router: build_router(AppState::new(stores, test_config(false))),
            primary,
            secondary,
        }
    }

    /// Primary only
    pub fn new() -> Self {
        let primary = MemoryStore::new();
        Self::build(DualWrite::single(Arc::new(primary.clone())), primary, None)
    }

    /// Mirroring into a healthy in-memory secondary
    pub fn mirrored() -> Self {
        let primary = MemoryStore::new();
        let secondary = MemoryStore::new();
        let stores = DualWrite::new(
            Arc::new(primary.clone()),
            Some(Arc::new(secondary.clone())),
            true,
        );
        Self::build(stores, primary, Some(secondary))
    }

    /// Mirroring into a secondary that rejects everything
    pub fn broken_secondary() -> Self {
        let primary = MemoryStore::new();
        let stores = DualWrite::new(Arc::new(primary.clone()), Some(Arc::new(FailingStore)), true);
        Self::build(stores, primary, None)
    }

    /// Primary store is down
    pub fn broken_primary() -> Self {
        let stores = DualWrite::single(Arc::new(FailingStore));
        Self::build(stores, MemoryStore::new(), None)
    }

    /// Sends a request and returns the status and JSON body (`Null` if empty)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/register",
            None,
            Some(json!({ "name": name, "email": email, "password": password })),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Registers a user and returns a bearer token for it
    pub async fn user_token(&self, email: &str) -> String {
        let (status, _) = self.register("Test User", email, "secret123").await;
        assert_eq!(status, StatusCode::CREATED, "registration failed");

        let (status, body) = self.login(email, "secret123").await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().expect("token in login response").to_string()
    }

    /// Creates a task and returns its JSON
    pub async fn create_task(&self, token: &str, body: Value) -> Value {
        let (status, task) = self.send(Method::POST, "/tasks", Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", task);
        task
    }
}
