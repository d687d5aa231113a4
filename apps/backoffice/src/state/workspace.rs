//! # Workspace State
//!
//! The loaded account and the in-memory store it persists into.
//!
//! ## Command Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Command Under the Lock                           │
//! │                                                                         │
//! │  lock ──► f(&mut Workspace) ──► Err? ── return (nothing changed)       │
//! │                 │ Ok                                                    │
//! │                 ▼                                                       │
//! │           workspace.save(&mut store)   (diffed JSON writes)            │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │           db.flush(&mut store).await   (one transaction)               │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │              unlock                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lock is a `tokio::sync::Mutex` because it stays held across the
//! flush: change logs reach SQLite in the order commands ran.

use pharmadesk_core::migration::{bootstrap, BootstrapReport};
use pharmadesk_core::{CoreResult, MemoryStore, Namespace, SharedClock, SharedIds, Workspace};
use pharmadesk_db::{Database, DbResult};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::ApiError;

#[derive(Debug)]
struct Loaded {
    workspace: Workspace,
    store: MemoryStore,
}

/// Shared handle to the current account's workspace.
#[derive(Debug)]
pub struct WorkspaceState {
    inner: Mutex<Loaded>,
}

impl WorkspaceState {
    pub fn new(workspace: Workspace, store: MemoryStore) -> Self {
        WorkspaceState {
            inner: Mutex::new(Loaded { workspace, store }),
        }
    }

    /// Loads every entry, runs migration and seeding for the account, and
    /// persists whatever that produced.
    pub async fn open(
        db: &Database,
        namespace: Namespace,
        ids: SharedIds,
        clock: SharedClock,
    ) -> DbResult<(Self, BootstrapReport)> {
        let mut store = db.load_store().await?;
        let report = bootstrap(&mut store, &namespace, ids.as_ref(), clock.as_ref())?;
        let workspace = Workspace::load(&store, namespace, ids, clock);
        let written = db.flush(&mut store).await?;
        info!(written, "Workspace opened");
        Ok((WorkspaceState::new(workspace, store), report))
    }

    /// Executes a function with read access to the workspace.
    pub async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Workspace) -> R,
    {
        let loaded = self.inner.lock().await;
        f(&loaded.workspace)
    }

    /// Runs a mutation and persists its effects before releasing the lock.
    ///
    /// ## Returns
    /// * `Err` from `f` - Rejected, no state changed
    /// * `Err` from the flush - Applied in memory, writes requeued for the
    ///   next command
    pub async fn commit<F, R>(&self, db: &Database, f: F) -> Result<R, ApiError>
    where
        F: FnOnce(&mut Workspace) -> CoreResult<R>,
    {
        let mut guard = self.inner.lock().await;
        let Loaded { workspace, store } = &mut *guard;

        let value = f(workspace)?;
        let writes = workspace.save(store)?;
        let flushed = db.flush(store).await?;
        debug!(writes, flushed, "Command committed");
        Ok(value)
    }
}
