//! # pharmadesk-db: Database Layer for Pharmadesk
//!
//! SQLite persistence for the back office. The core reads and writes JSON
//! documents through its `KeyValueStore` trait; this crate stores those
//! documents as rows and flushes each command's change log atomically.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pharmadesk Data Flow                             │
//! │                                                                         │
//! │  Backoffice command (finalize bill)                                    │
//! │       │  Workspace mutates MemoryStore                                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  pharmadesk-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │ KvRepository  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ get/set/apply │    │  (embedded)  │  │   │
//! │  │   │ load / flush  │    │               │    │ 001_kv.sql   │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   SQLite Database  <data dir>/pharmadesk.db  (kv_entries)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, store loading and flushing
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - Database error types
//! - [`repository`] - Key-value repository
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pharmadesk_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("pharmadesk.db")).await?;
//! let mut store = db.load_store().await?;
//! // ... run a command against a Workspace and `store` ...
//! db.flush(&mut store).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::kv::{KvEntry, KvRepository};
