/// Database migration runner
///
/// Migrations live in `taskdock-shared/migrations/` and are embedded at
/// compile time. Applied at startup when `DATABASE_AUTO_MIGRATE` is on.

use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Applies all pending migrations; already-applied ones are skipped
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Starting database migrations");

    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("All database migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}
