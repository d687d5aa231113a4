//! # Repository Module
//!
//! Database repository implementations for Pharmadesk.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Backoffice command                                                    │
//! │       │                                                                 │
//! │       │  db.flush(&mut store)                                          │
//! │       ▼                                                                 │
//! │  KvRepository                                                          │
//! │  ├── get / set / delete                                                │
//! │  ├── list_all / list_prefix / count                                    │
//! │  └── apply(changes)  ← one transaction                                 │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database (kv_entries)                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The core never sees SQL: it works on a `MemoryStore`, and this layer
//! moves entries in and change logs out.
//!
//! ## Available Repositories
//!
//! - [`KvRepository`](kv::KvRepository) - Key-value rows and change-log flushing

pub mod kv;
