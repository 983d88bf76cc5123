//! # TaskDock API Server Library
//!
//! HTTP surface of TaskDock: configuration, routing, request validation and
//! the translation of service errors into responses. Business rules and
//! storage live in `taskdock_shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
