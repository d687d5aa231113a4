//! # Database State
//!
//! Wraps the `Database` connection for use in commands.
//!
//! ## Thread Safety
//! The `Database` struct from `pharmadesk-db` contains a `SqlitePool` which
//! is inherently thread-safe. Writes are still serialized, because every
//! flush happens while the workspace lock is held.

use pharmadesk_db::Database;

/// Wrapper around `Database` for state management.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
