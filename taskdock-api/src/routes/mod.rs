/// API route handlers
///
/// - `health`: liveness banner and store health
/// - `auth`: registration and login
/// - `protected`: token probe
/// - `tasks`: task CRUD and filtered listing

pub mod auth;
pub mod health;
pub mod protected;
pub mod tasks;
