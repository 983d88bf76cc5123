/// Connection management for TaskDock's backends
///
/// # Modules
///
/// - `pool`: PostgreSQL pool construction, TLS resolution, health checks
/// - `migrations`: embedded sqlx migrations
/// - `mongo`: MongoDB client and database handles
///
/// Turning these handles into stores is done by [`crate::store::connect`].

pub mod migrations;
pub mod mongo;
pub mod pool;
