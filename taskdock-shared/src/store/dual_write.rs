//! Dual-write coordinator
//!
//! Holds the authoritative primary store and, when mirroring is configured,
//! a secondary store. Services run every mutation against [`DualWrite::primary`]
//! first and then hand the same operation to [`DualWrite::mirror`], which
//! attempts it on the secondary and swallows any failure after logging it.
//!
//! There is no retry and no reconciliation: a failed mirror leaves the
//! secondary behind until the next write touches the same record.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, info};

use super::{Store, StoreResult};

/// What happened to the secondary copy of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// Mirroring is switched off
    Disabled,

    /// Mirroring is on but no secondary store is configured
    Unavailable,

    /// The secondary accepted the write
    Mirrored,

    /// The secondary rejected the write; the error was logged and dropped
    Failed,
}

#[derive(Clone)]
pub struct DualWrite {
    primary: Arc<dyn Store>,
    secondary: Option<Arc<dyn Store>>,
    enabled: bool,
}

impl DualWrite {
    pub fn new(primary: Arc<dyn Store>, secondary: Option<Arc<dyn Store>>, enabled: bool) -> Self {
        Self {
            primary,
            secondary,
            enabled,
        }
    }

    /// Primary only, mirroring off
    pub fn single(primary: Arc<dyn Store>) -> Self {
        Self::new(primary, None, false)
    }

    pub fn primary(&self) -> &dyn Store {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> Option<&dyn Store> {
        self.secondary.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Replays a write on the secondary store
    ///
    /// Call only after the primary write succeeded. `write` receives the
    /// secondary store and performs the same mutation there. The outcome is
    /// returned for the caller's logs and tests; it never affects the result
    /// of the request.
    pub async fn mirror<F, Fut>(&self, operation: &'static str, write: F) -> MirrorOutcome
    where
        F: FnOnce(Arc<dyn Store>) -> Fut,
        Fut: Future<Output = StoreResult<()>>,
    {
        if !self.enabled {
            debug!(operation, "dual write disabled, skipping mirror");
            return MirrorOutcome::Disabled;
        }

        let Some(secondary) = self.secondary.clone() else {
            error!(operation, "dual write enabled but no secondary store is available");
            return MirrorOutcome::Unavailable;
        };

        let backend = secondary.backend();
        match write(secondary).await {
            Ok(()) => {
                info!(operation, backend, "mirrored write to secondary store");
                MirrorOutcome::Mirrored
            }
            Err(e) => {
                error!(operation, backend, error = %e, "mirror write to secondary store failed");
                MirrorOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{NewTask, Task, TaskPriority, TaskStatus};
    use crate::store::memory::MemoryStore;
    use crate::store::{require_found, StoreError, TaskStore};
    use uuid::Uuid;

    fn task() -> Task {
        Task::new(NewTask {
            user_id: Uuid::new_v4(),
            title: "Buy milk".to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
        })
    }

    #[tokio::test]
    async fn test_disabled_never_touches_secondary() {
        let secondary = MemoryStore::new();
        let dual = DualWrite::new(
            Arc::new(MemoryStore::new()),
            Some(Arc::new(secondary.clone())),
            false,
        );
        let t = task();

        let outcome = dual
            .mirror("insert_task", |store| async move { store.insert_task(&t).await })
            .await;

        assert_eq!(outcome, MirrorOutcome::Disabled);
        assert_eq!(secondary.task_count().await, 0);
    }

    #[tokio::test]
    async fn test_enabled_without_secondary_is_unavailable() {
        let dual = DualWrite::new(Arc::new(MemoryStore::new()), None, true);
        let outcome = dual.mirror("insert_task", |_| async { Ok(()) }).await;
        assert_eq!(outcome, MirrorOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_enabled_writes_secondary() {
        let secondary = MemoryStore::new();
        let dual = DualWrite::new(
            Arc::new(MemoryStore::new()),
            Some(Arc::new(secondary.clone())),
            true,
        );
        let t = task();
        let record = &t;

        let outcome = dual
            .mirror("insert_task", |store| async move { store.insert_task(record).await })
            .await;

        assert_eq!(outcome, MirrorOutcome::Mirrored);
        assert_eq!(secondary.find_task(t.id).await.unwrap(), Some(t));
    }

    #[tokio::test]
    async fn test_secondary_failure_is_swallowed() {
        let dual = DualWrite::new(
            Arc::new(MemoryStore::new()),
            Some(Arc::new(MemoryStore::new())),
            true,
        );

        let outcome = dual
            .mirror("insert_task", |_| async {
                Err(StoreError::Unavailable("connection refused".to_string()))
            })
            .await;

        assert_eq!(outcome, MirrorOutcome::Failed);
    }

    #[tokio::test]
    async fn test_secondary_without_record_is_failed() {
        let dual = DualWrite::new(
            Arc::new(MemoryStore::new()),
            Some(Arc::new(MemoryStore::new())),
            true,
        );
        let id = Uuid::new_v4();

        let outcome = dual
            .mirror("delete_task", |store| async move {
                store
                    .delete_task(id)
                    .await
                    .and_then(|found| require_found(found, id))
            })
            .await;

        assert_eq!(outcome, MirrorOutcome::Failed);
    }
}
