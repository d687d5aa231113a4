//! # pharmadesk-core: Pure Business Logic for Pharmadesk
//!
//! Everything the distributor back office decides lives here: line and cart
//! math, the shared medicine catalog, account projections, bill and purchase
//! sessions, migration and seeding. No I/O happens in this crate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Pharmadesk Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                apps/backoffice (orchestration)                  │   │
//! │  │   config • logging • commands • notifications                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ pharmadesk-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌────────────────┐  │   │
//! │  │   │  money   │ │ identity │ │ projection │ │    session     │  │   │
//! │  │   │ line math│ │ catalog  │ │ def + data │ │ billing/purch. │  │   │
//! │  │   └──────────┘ └──────────┘ └────────────┘ └────────────────┘  │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌────────────────┐  │   │
//! │  │   │ account  │ │migration │ │  transfer  │ │    reports     │  │   │
//! │  │   │workspace │ │ seeding  │ │  backups   │ │    profit      │  │   │
//! │  │   └──────────┘ └──────────┘ └────────────┘ └────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • persistence only through the KeyValueStore trait     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                pharmadesk-db (SQLite key-value store)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (MedicineDefinition, CartItem, FinalizedBill, ...)
//! - [`money`] - Decimal line math, rounding only at the boundaries
//! - [`identity`] - Catalog with name-normalized identity
//! - [`projection`] - Catalog + account overrides → `Medicine`
//! - [`session`] - Generic session state machine
//! - [`billing`] / [`purchase`] - Session lines and finalization
//! - [`inventory`] / [`counterparty`] - Account record management
//! - [`store`] - Key-value persistence trait, key layout, in-memory store
//! - [`account`] - The loaded workspace of one account
//! - [`migration`] - Legacy migration and first-run seeding
//! - [`transfer`] - Backup export and import
//! - [`reports`] - Profit and purchase reporting
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use pharmadesk_core::{Namespace, SequentialIds, SystemClock, Workspace};
//! use pharmadesk_core::counterparty::CounterpartyInput;
//! use pharmadesk_core::inventory::MedicineInput;
//!
//! let mut ws = Workspace::new(
//!     Namespace::new("demo"),
//!     Arc::new(SequentialIds::new("id")),
//!     Arc::new(SystemClock),
//! );
//! let store = ws
//!     .add_store(&CounterpartyInput { name: "City Pharma".into(), ..Default::default() })
//!     .unwrap();
//! let medicine = ws
//!     .add_medicine(MedicineInput { name: "Panadol".into(), price: Some(100.0), ..Default::default() })
//!     .unwrap();
//!
//! ws.start_bill(&store.id).unwrap();
//! ws.add_bill_line(&medicine.id).unwrap();
//! ws.set_bill_quantity(&medicine.id, 10.0).unwrap();
//! ws.set_bill_discount(&medicine.id, Some(20.0)).unwrap();
//!
//! assert_eq!(ws.bill_totals().unwrap().grand_total, 800.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod account;
pub mod billing;
pub mod clock;
pub mod counterparty;
pub mod error;
pub mod identity;
pub mod ids;
pub mod inventory;
pub mod migration;
pub mod money;
pub mod projection;
pub mod purchase;
pub mod reports;
pub mod seed_data;
pub mod session;
pub mod store;
pub mod transfer;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use account::{AccountData, SharedClock, SharedIds, Workspace};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use identity::Catalog;
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use session::{SessionKind, View};
pub use store::{Change, KeyValueStore, MemoryStore, Namespace};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Account namespace used when none is configured.
///
/// Sign-in is handled outside this system; a single-operator install works
/// under this id.
pub const DEFAULT_ACCOUNT_ID: &str = "local";
