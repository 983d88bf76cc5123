//! # TaskDock Shared Library
//!
//! Domain types, storage and business logic used by the TaskDock API server.
//!
//! ## Module Organization
//!
//! - `models`: user and task records plus the input types services accept
//! - `auth`: password hashing, JWT issuance and the request auth context
//! - `store`: the storage interface, its PostgreSQL / MongoDB / in-memory
//!   implementations and the dual-write coordinator
//! - `services`: registration, login and task operations
//! - `db`: connection management and migrations
//! - `error`: service-level error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the TaskDock shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
