//! Business logic on top of the store interface
//!
//! - [`auth::AuthService`]: registration, login, token verification
//! - [`task::TaskService`]: task CRUD and filtered listing
//!
//! Both are cheap to clone and hold a [`crate::store::DualWrite`].

pub mod auth;
pub mod task;

pub use auth::{AuthService, TokenSettings};
pub use task::TaskService;
