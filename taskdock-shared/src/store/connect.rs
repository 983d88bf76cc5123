//! Startup wiring: from connection targets to a ready [`DualWrite`]
//!
//! Policy when opening the stores:
//!
//! - primary reachable: use it; mirror to the secondary if one is configured
//! - secondary unreachable: keep a lazily connecting handle, so mirrors fail
//!   (and are logged) until it comes back
//! - primary unreachable, secondary reachable: promote the secondary,
//!   mirroring off
//! - primary unreachable otherwise: fatal in production, lazily connecting
//!   handle in development so the server still boots

use std::sync::Arc;

use tracing::{error, info, warn};

use super::memory::MemoryStore;
use super::mongo::MongoStore;
use super::postgres::PgStore;
use super::{DualWrite, Store, StoreError};
use crate::db::migrations::run_migrations;
use crate::db::mongo::{self as mongo_db, MongoConfig};
use crate::db::pool::{create_lazy_pool, create_pool, DatabaseConfig};

/// A backend to connect to
#[derive(Debug, Clone)]
pub enum StoreTarget {
    Postgres(DatabaseConfig),
    Mongo(MongoConfig),
    Memory,
}

/// Environment-dependent startup behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupPolicy {
    /// Primary connection failure aborts startup
    pub production: bool,

    /// Apply PostgreSQL migrations after connecting
    pub auto_migrate: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("postgres connection failed: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("postgres migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("mongodb connection failed: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StoreTarget {
    pub fn backend(&self) -> &'static str {
        match self {
            StoreTarget::Postgres(_) => "postgres",
            StoreTarget::Mongo(_) => "mongodb",
            StoreTarget::Memory => "memory",
        }
    }

    /// Connects, verifies reachability and prepares the schema
    pub async fn connect(&self, policy: StartupPolicy) -> Result<Arc<dyn Store>, ConnectError> {
        match self {
            StoreTarget::Postgres(config) => {
                let pool = create_pool(config).await?;
                if policy.auto_migrate {
                    run_migrations(&pool).await?;
                }
                Ok(Arc::new(PgStore::new(pool)))
            }
            StoreTarget::Mongo(config) => {
                let store = MongoStore::new(mongo_db::connect(config).await?);
                store.ensure_indexes().await?;
                Ok(Arc::new(store))
            }
            StoreTarget::Memory => Ok(Arc::new(MemoryStore::new())),
        }
    }

    /// Builds a handle without contacting the backend
    pub async fn connect_lazy(&self) -> Result<Arc<dyn Store>, ConnectError> {
        match self {
            StoreTarget::Postgres(config) => Ok(Arc::new(PgStore::new(create_lazy_pool(config)?))),
            StoreTarget::Mongo(config) => {
                Ok(Arc::new(MongoStore::new(mongo_db::open_database(config).await?)))
            }
            StoreTarget::Memory => Ok(Arc::new(MemoryStore::new())),
        }
    }
}

/// Opens the primary and, when mirroring is on, the secondary store
pub async fn open_stores(
    primary: &StoreTarget,
    secondary: Option<&StoreTarget>,
    dual_write: bool,
    policy: StartupPolicy,
) -> Result<DualWrite, ConnectError> {
    let secondary = if dual_write {
        if secondary.is_none() {
            error!("DUAL_WRITE is enabled but no secondary database is configured");
        }
        secondary
    } else {
        None
    };

    let primary_result = primary.connect(policy).await;
    let secondary_result = match secondary {
        Some(target) => Some(target.connect(policy).await),
        None => None,
    };

    match (primary_result, secondary_result) {
        (Ok(primary_store), None) => {
            info!(backend = primary_store.backend(), dual_write, "primary store ready");
            Ok(DualWrite::new(primary_store, None, dual_write))
        }
        (Ok(primary_store), Some(Ok(secondary_store))) => {
            info!(
                primary = primary_store.backend(),
                secondary = secondary_store.backend(),
                "dual write enabled, both stores ready"
            );
            Ok(DualWrite::new(primary_store, Some(secondary_store), true))
        }
        (Ok(primary_store), Some(Err(e))) => {
            error!(error = %e, "secondary store unreachable, mirrored writes will fail until it recovers");
            let lazy = lazy_secondary(secondary).await;
            Ok(DualWrite::new(primary_store, lazy, true))
        }
        (Err(e), Some(Ok(secondary_store))) => {
            warn!(
                error = %e,
                promoted = secondary_store.backend(),
                "primary store unreachable, promoting secondary to primary; dual write disabled"
            );
            Ok(DualWrite::single(secondary_store))
        }
        (Err(e), _) if policy.production => {
            error!(error = %e, backend = primary.backend(), "primary store unreachable");
            Err(e)
        }
        (Err(e), _) => {
            warn!(
                error = %e,
                backend = primary.backend(),
                "primary store unreachable, continuing with a lazy connection (development)"
            );
            let primary_store = primary.connect_lazy().await?;
            let lazy = lazy_secondary(secondary).await;
            Ok(DualWrite::new(primary_store, lazy, dual_write))
        }
    }
}

async fn lazy_secondary(target: Option<&StoreTarget>) -> Option<Arc<dyn Store>> {
    let target = target?;
    match target.connect_lazy().await {
        Ok(store) => Some(store),
        Err(e) => {
            error!(error = %e, backend = target.backend(), "could not build secondary store handle");
            None
        }
    }
}
