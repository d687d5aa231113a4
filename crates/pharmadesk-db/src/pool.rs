//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite, plus the bridge
//! between persisted rows and the core's in-memory store.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Lifecycle                                 │
//! │                                                                         │
//! │  DbConfig::new(path)            ← Configure pool settings              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await    ← Create pool + run migrations         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.load_store().await          ← Every kv row → MemoryStore           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────────────────────┐                          │
//! │  │  command mutates Workspace + MemoryStore │ ◄──┐                     │
//! │  └───────────────────┬──────────────────────┘    │                     │
//! │                      ▼                           │                     │
//! │  db.flush(&mut store).await ── next command ─────┘                     │
//! │   (change log → one transaction)                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so the `seed` binary or
//! a diagnostic reader can open the file while the back office holds it.

use pharmadesk_core::MemoryStore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::kv::KvRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/pharmadesk.db")
///     .max_connections(2)
///     .run_migrations(true);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 4 (one writer, a few readers)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a configuration for the file at `path`, created if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 4,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// Each call yields an isolated database that lives as long as its
    /// single connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        // sqlite://path creates the file if it does not exist
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            // May lose the last transaction on power loss, never corrupts
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the key-value repository.
    pub fn kv(&self) -> KvRepository {
        KvRepository::new(self.pool.clone())
    }

    /// Reads every persisted entry into a fresh [`MemoryStore`].
    ///
    /// The returned store has an empty change log.
    pub async fn load_store(&self) -> DbResult<MemoryStore> {
        let entries = self.kv().list_all().await?;
        info!(entries = entries.len(), "Loaded key-value store");
        Ok(MemoryStore::from_entries(
            entries.into_iter().map(|e| (e.key, e.value)),
        ))
    }

    /// Writes the store's pending changes in one transaction.
    ///
    /// ## Returns
    /// Number of changes written. On failure the changes are put back into
    /// the store's log so the next flush retries them.
    pub async fn flush(&self, store: &mut MemoryStore) -> DbResult<usize> {
        let changes = store.take_changes();
        if changes.is_empty() {
            return Ok(0);
        }

        match self.kv().apply(&changes).await {
            Ok(count) => Ok(count),
            Err(err) => {
                warn!(error = %err, changes = changes.len(), "Flush failed, changes requeued");
                store.requeue_changes(changes);
                Err(err)
            }
        }
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pharmadesk_core::KeyValueStore;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
    }

    #[tokio::test]
    async fn test_flush_then_reload_round_trips_entries() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut store = db.load_store().await.unwrap();
        assert!(store.is_empty());
        store.set("pharmadesk:a:bills", "[]".to_string());
        store.set("pharmadesk:global:initialized", "true".to_string());

        assert_eq!(db.flush(&mut store).await.unwrap(), 2);
        assert_eq!(db.flush(&mut store).await.unwrap(), 0);

        let reloaded = db.load_store().await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("pharmadesk:global:initialized").as_deref(), Some("true"));
        assert!(!reloaded.has_pending_changes());
    }

    #[tokio::test]
    async fn test_failed_flush_requeues_changes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut store = MemoryStore::new();
        store.set("k", "1".to_string());

        db.close().await;
        assert!(db.flush(&mut store).await.is_err());
        assert!(store.has_pending_changes());
    }
}
