//! # State Module
//!
//! Manages application state for the back office.
//!
//! Separate state types rather than one `AppState`, so each command
//! declares exactly what it touches.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐ ┌──────────────────┐ ┌─────────────┐ ┌─────────────┐ │
//! │  │   DbState    │ │  WorkspaceState  │ │ ConfigState │ │Notification │ │
//! │  │              │ │                  │ │             │ │   State     │ │
//! │  │  Database    │ │  async Mutex<    │ │  account_id │ │  Mutex<     │ │
//! │  │  (SQLite     │ │   Workspace +    │ │  db path    │ │   Queue     │ │
//! │  │   pool)      │ │   MemoryStore >  │ │  ttl, ¤     │ │  >          │ │
//! │  └──────────────┘ └──────────────────┘ └─────────────┘ └─────────────┘ │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has internal connection pool (thread-safe)        │
//! │  • WorkspaceState: held across the flush, one command at a time        │
//! │  • ConfigState: Read-only after initialization                         │
//! │  • NotificationState: short std Mutex sections                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod notifications;
mod workspace;

pub use config::{ConfigState, DEFAULT_NOTIFICATION_TTL_MS};
pub use db::DbState;
pub use notifications::{Notification, NotificationState, Severity};
pub use workspace::WorkspaceState;
