//! # Key-Value Repository
//!
//! Rows of the `kv_entries` table. Each value is the JSON document of one
//! logical table, written by `pharmadesk-core` through its store trait.
//!
//! ## Flush Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Command, One Transaction                         │
//! │                                                                         │
//! │  MemoryStore (after a command)                                         │
//! │       │  take_changes()                                                 │
//! │       ▼                                                                 │
//! │  [Put bills] [Put userMedicineData] [Delete medicines]                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  BEGIN                                                          │   │
//! │  │    INSERT ... ON CONFLICT(key) DO UPDATE   (each Put)           │   │
//! │  │    DELETE FROM kv_entries WHERE key = ?    (each Delete)        │   │
//! │  │  COMMIT                                                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  A failure rolls the whole batch back; no half-finalized bill where    │
//! │  the bill is stored but the cleared session is not.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use pharmadesk_core::Change;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

const UPSERT_SQL: &str = r#"
    INSERT INTO kv_entries (key, value, updated_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
"#;

const DELETE_SQL: &str = "DELETE FROM kv_entries WHERE key = ?1";

/// One persisted row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct KvEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Repository for key-value rows.
#[derive(Debug, Clone)]
pub struct KvRepository {
    pool: SqlitePool,
}

impl KvRepository {
    pub fn new(pool: SqlitePool) -> Self {
        KvRepository { pool }
    }

    /// Gets the value stored under `key`.
    ///
    /// ## Returns
    /// * `Ok(Some(json))` - Key present
    /// * `Ok(None)` - Key never written or deleted
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_entries WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    /// Inserts or replaces a single value.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        sqlx::query(UPSERT_SQL)
            .bind(key)
            .bind(value)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Deletes `key`, returning whether a row existed.
    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query(DELETE_SQL).bind(key).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Every row, ordered by key.
    pub async fn list_all(&self) -> DbResult<Vec<KvEntry>> {
        let rows = sqlx::query_as::<_, KvEntry>(
            "SELECT key, value, updated_at FROM kv_entries ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Rows whose key starts with `prefix`, ordered by key.
    ///
    /// Compared with `substr` rather than `LIKE` so `_` and `%` in account
    /// ids match literally.
    pub async fn list_prefix(&self, prefix: &str) -> DbResult<Vec<KvEntry>> {
        let rows = sqlx::query_as::<_, KvEntry>(
            r#"
            SELECT key, value, updated_at
            FROM kv_entries
            WHERE substr(key, 1, length(?1)) = ?1
            ORDER BY key
            "#,
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM kv_entries")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Applies a change log atomically.
    ///
    /// ## Returns
    /// Number of changes applied. An empty slice opens no transaction.
    pub async fn apply(&self, changes: &[Change]) -> DbResult<usize> {
        if changes.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for change in changes {
            match change {
                Change::Put { key, value } => {
                    sqlx::query(UPSERT_SQL)
                        .bind(key)
                        .bind(value)
                        .bind(now)
                        .execute(&mut *tx)
                        .await?;
                }
                Change::Delete { key } => {
                    sqlx::query(DELETE_SQL).bind(key).execute(&mut *tx).await?;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(changes = changes.len(), "Applied change log");
        Ok(changes.len())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
