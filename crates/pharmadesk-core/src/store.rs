//! # Key-Value Persistence
//!
//! The persistence collaborator as the core sees it: string keys holding JSON.
//!
//! ## Key Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pharmadesk:global:medicineDefinitions     shared catalog               │
//! │  pharmadesk:global:initialized             seeding flag                 │
//! │                                                                         │
//! │  pharmadesk:<account>:userMedicineData     overrides by definition id  │
//! │  pharmadesk:<account>:medicalStores        MedicalStore[]               │
//! │  pharmadesk:<account>:suppliers            Supplier[]                   │
//! │  pharmadesk:<account>:bills                FinalizedBill[]              │
//! │  pharmadesk:<account>:purchases            FinalizedPurchase[]          │
//! │  pharmadesk:<account>:billingSession       in-progress bill             │
//! │  pharmadesk:<account>:purchaseSession      in-progress purchase         │
//! │  pharmadesk:<account>:billLayoutSettings                                │
//! │  pharmadesk:<account>:salesSettings                                     │
//! │  pharmadesk:<account>:medicines            legacy per-account list      │
//! │  pharmadesk:<account>:sharedCatalogMigrated  migration flag             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Diffed Writes
//! [`write_json`] serializes the value and compares it with what the store
//! already holds; identical JSON is never written again. Repeated saves of an
//! unchanged workspace therefore cost zero writes.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CoreResult;

const KEY_PREFIX: &str = "pharmadesk";

// =============================================================================
// Store Trait
// =============================================================================

/// Persistence collaborator.
///
/// Reads must reflect the latest write made through the same store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

// =============================================================================
// Keys
// =============================================================================

/// Keys shared by every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalKey {
    MedicineDefinitions,
    Initialized,
}

impl GlobalKey {
    fn name(self) -> &'static str {
        match self {
            GlobalKey::MedicineDefinitions => "medicineDefinitions",
            GlobalKey::Initialized => "initialized",
        }
    }

    pub fn key(self) -> String {
        format!("{KEY_PREFIX}:global:{}", self.name())
    }
}

/// Keys scoped to one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKey {
    UserMedicineData,
    MedicalStores,
    Suppliers,
    Bills,
    Purchases,
    BillingSession,
    PurchaseSession,
    BillLayoutSettings,
    SalesSettings,
    LegacyMedicines,
    SharedCatalogMigrated,
}

impl AccountKey {
    fn name(self) -> &'static str {
        match self {
            AccountKey::UserMedicineData => "userMedicineData",
            AccountKey::MedicalStores => "medicalStores",
            AccountKey::Suppliers => "suppliers",
            AccountKey::Bills => "bills",
            AccountKey::Purchases => "purchases",
            AccountKey::BillingSession => "billingSession",
            AccountKey::PurchaseSession => "purchaseSession",
            AccountKey::BillLayoutSettings => "billLayoutSettings",
            AccountKey::SalesSettings => "salesSettings",
            AccountKey::LegacyMedicines => "medicines",
            AccountKey::SharedCatalogMigrated => "sharedCatalogMigrated",
        }
    }
}

/// Account-prefixed key namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    account_id: String,
}

impl Namespace {
    pub fn new(account_id: impl Into<String>) -> Self {
        Namespace {
            account_id: account_id.into(),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn key(&self, key: AccountKey) -> String {
        format!("{KEY_PREFIX}:{}:{}", self.account_id, key.name())
    }
}

// =============================================================================
// JSON Helpers
// =============================================================================

/// Reads and parses a value, falling back to `T::default()`.
///
/// Missing keys are normal (first run). Unparseable values are logged and
/// treated as missing; the application never fails to start on corrupt
/// data.
pub fn read_json<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    read_json_opt(store, key).unwrap_or_default()
}

/// Like [`read_json`] but distinguishes "absent or corrupt" from present.
pub fn read_json_opt<T>(store: &dyn KeyValueStore, key: &str) -> Option<T>
where
    T: DeserializeOwned,
{
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "Corrupt persisted value, using default");
            None
        }
    }
}

/// Writes a value unless the store already holds identical JSON.
///
/// ## Returns
/// `true` if a write happened.
pub fn write_json<T>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> CoreResult<bool>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(value)?;
    if store.get(key).as_deref() == Some(json.as_str()) {
        return Ok(false);
    }
    debug!(key, bytes = json.len(), "Persisting value");
    store.set(key, json);
    Ok(true)
}

/// Reads a boolean marker; absent or corrupt means `false`.
pub fn read_flag(store: &dyn KeyValueStore, key: &str) -> bool {
    read_json::<bool>(store, key)
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// A pending mutation recorded by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Put { key: String, value: String },
    Delete { key: String },
}

impl Change {
    pub fn key(&self) -> &str {
        match self {
            Change::Put { key, .. } | Change::Delete { key } => key,
        }
    }
}

/// In-memory store with a change log.
///
/// The database layer loads every entry into one of these at startup, the
/// core mutates it synchronously, and the collected [`Change`]s are flushed
/// back in a single transaction.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    pending: BTreeMap<String, Option<String>>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Builds a store from persisted entries without recording changes.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        MemoryStore {
            entries: entries.into_iter().collect(),
            ..MemoryStore::default()
        }
    }

    /// Total number of `set`/`remove` calls since creation.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drains the change log, last write per key wins.
    pub fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => Change::Put { key, value },
                None => Change::Delete { key },
            })
            .collect()
    }

    /// Puts undelivered changes back into the log after a failed flush.
    ///
    /// Keys written again since the drain keep their newer pending value.
    pub fn requeue_changes(&mut self, changes: Vec<Change>) {
        for change in changes {
            let (key, value) = match change {
                Change::Put { key, value } => (key, Some(value)),
                Change::Delete { key } => (key, None),
            };
            self.pending.entry(key).or_insert(value);
        }
    }

    /// Keys with the given prefix, for diagnostics and export.
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.as_str())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.writes += 1;
        self.entries.insert(key.to_string(), value.clone());
        self.pending.insert(key.to_string(), Some(value));
    }

    fn remove(&mut self, key: &str) {
        self.writes += 1;
        self.entries.remove(key);
        self.pending.insert(key.to_string(), None);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let ns = Namespace::new("acct-1");
        assert_eq!(ns.key(AccountKey::Bills), "pharmadesk:acct-1:bills");
        assert_eq!(
            GlobalKey::MedicineDefinitions.key(),
            "pharmadesk:global:medicineDefinitions"
        );
    }

    #[test]
    fn test_read_missing_returns_default() {
        let store = MemoryStore::new();
        let value: Vec<String> = read_json(&store, "missing");
        assert!(value.is_empty());
        assert!(!read_flag(&store, "missing"));
    }

    #[test]
    fn test_corrupt_value_falls_back_to_default() {
        let mut store = MemoryStore::new();
        store.set("k", "{not json".to_string());
        let value: Vec<u32> = read_json(&store, "k");
        assert!(value.is_empty());
    }

    #[test]
    fn test_write_json_skips_identical_value() {
        let mut store = MemoryStore::new();
        assert!(write_json(&mut store, "k", &vec![1, 2, 3]).unwrap());
        assert!(!write_json(&mut store, "k", &vec![1, 2, 3]).unwrap());
        assert!(write_json(&mut store, "k", &vec![1, 2]).unwrap());
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_change_log_keeps_last_write_per_key() {
        let mut store = MemoryStore::new();
        store.set("a", "1".to_string());
        store.set("a", "2".to_string());
        store.set("b", "x".to_string());
        store.remove("b");

        let changes = store.take_changes();
        assert_eq!(
            changes,
            vec![
                Change::Put {
                    key: "a".to_string(),
                    value: "2".to_string()
                },
                Change::Delete {
                    key: "b".to_string()
                },
            ]
        );
        assert!(!store.has_pending_changes());
    }

    #[test]
    fn test_requeue_keeps_newer_pending_write() {
        let mut store = MemoryStore::new();
        store.set("a", "1".to_string());
        store.set("b", "1".to_string());
        let drained = store.take_changes();

        store.set("a", "2".to_string());
        store.requeue_changes(drained);

        let changes = store.take_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[0],
            Change::Put {
                key: "a".to_string(),
                value: "2".to_string()
            }
        );
    }

    #[test]
    fn test_from_entries_records_no_changes() {
        let store = MemoryStore::from_entries(vec![("a".to_string(), "1".to_string())]);
        assert_eq!(store.get("a").as_deref(), Some("1"));
        assert!(!store.has_pending_changes());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_keys_with_prefix() {
        let ns = Namespace::new("acct-1");
        let mut store = MemoryStore::new();
        store.set(&ns.key(AccountKey::Bills), "[]".to_string());
        store.set(&ns.key(AccountKey::Suppliers), "[]".to_string());
        store.set(&GlobalKey::Initialized.key(), "true".to_string());

        let keys: Vec<&str> = store.keys_with_prefix("pharmadesk:acct-1:").collect();
        assert_eq!(keys.len(), 2);
    }
}
