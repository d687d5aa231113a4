//! # Account Workspace
//!
//! Everything one signed-in account works with, loaded from the store in one
//! go and saved back with diffed writes.
//!
//! ```text
//! ┌──────────────────────── Workspace ────────────────────────┐
//! │                                                           │
//! │  catalog   ◄── pharmadesk:global:medicineDefinitions      │
//! │                                                           │
//! │  account                                                  │
//! │   ├── overrides        ◄── <ns>:userMedicineData          │
//! │   ├── stores           ◄── <ns>:medicalStores             │
//! │   ├── suppliers        ◄── <ns>:suppliers                 │
//! │   ├── bills            ◄── <ns>:bills                     │
//! │   ├── purchases        ◄── <ns>:purchases                 │
//! │   ├── billing          ◄── <ns>:billingSession            │
//! │   ├── purchase         ◄── <ns>:purchaseSession           │
//! │   ├── bill_layout      ◄── <ns>:billLayoutSettings        │
//! │   └── sales            ◄── <ns>:salesSettings             │
//! │                                                           │
//! │  ids, clock            injected capabilities              │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations live in `billing`, `purchase`, `inventory`, `counterparty` and
//! `transfer` as `impl Workspace` blocks. Each one validates first and only
//! then mutates, so an `Err` leaves the workspace exactly as it was.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::billing::BillingSession;
use crate::clock::Clock;
use crate::error::CoreResult;
use crate::identity::Catalog;
use crate::ids::IdGenerator;
use crate::projection::{self, OverrideMap};
use crate::purchase::PurchaseSession;
use crate::session::{AutoCancelled, View};
use crate::store::{read_json, write_json, AccountKey, GlobalKey, KeyValueStore, Namespace};
use crate::types::{
    BillLayoutSettings, FinalizedBill, FinalizedPurchase, MedicalStore, Medicine, SalesSettings,
    Supplier,
};

/// Shared id generator handle.
pub type SharedIds = Arc<dyn IdGenerator + Send + Sync>;

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

// =============================================================================
// Account Data
// =============================================================================

/// Per-account tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountData {
    pub overrides: OverrideMap,
    pub stores: Vec<MedicalStore>,
    pub suppliers: Vec<Supplier>,
    pub bills: Vec<FinalizedBill>,
    pub purchases: Vec<FinalizedPurchase>,
    pub billing: BillingSession,
    pub purchase: PurchaseSession,
    pub bill_layout: BillLayoutSettings,
    pub sales: SalesSettings,
}

impl AccountData {
    /// Loads every table, defaulting missing or corrupt ones.
    pub fn load(store: &dyn KeyValueStore, ns: &Namespace) -> Self {
        AccountData {
            overrides: read_json(store, &ns.key(AccountKey::UserMedicineData)),
            stores: read_json(store, &ns.key(AccountKey::MedicalStores)),
            suppliers: read_json(store, &ns.key(AccountKey::Suppliers)),
            bills: read_json(store, &ns.key(AccountKey::Bills)),
            purchases: read_json(store, &ns.key(AccountKey::Purchases)),
            billing: read_json(store, &ns.key(AccountKey::BillingSession)),
            purchase: read_json(store, &ns.key(AccountKey::PurchaseSession)),
            bill_layout: read_json(store, &ns.key(AccountKey::BillLayoutSettings)),
            sales: read_json(store, &ns.key(AccountKey::SalesSettings)),
        }
    }

    /// Re-points everything that names a medicine through `remap`.
    ///
    /// An override moves to its new id unless that id already has one; the
    /// existing override wins. Returns how many references changed.
    pub fn remap_medicine_ids(&mut self, remap: &HashMap<String, String>) -> usize {
        let mut changed = 0;
        for (from, to) in remap {
            let Some(data) = self.overrides.remove(from) else {
                continue;
            };
            changed += 1;
            if self.overrides.contains_key(to) {
                warn!(from = %from, to = %to, "Dropping override of merged duplicate medicine");
            } else {
                self.overrides.insert(to.clone(), data);
            }
        }
        for item in self.bills.iter_mut().flat_map(|b| b.items.iter_mut()) {
            if let Some(to) = remap.get(&item.medicine.id) {
                item.medicine.id = to.clone();
                changed += 1;
            }
        }
        for row in self.purchases.iter_mut().flat_map(|p| p.items.iter_mut()) {
            if let Some(to) = remap.get(&row.medicine_id) {
                row.medicine_id = to.clone();
                changed += 1;
            }
        }
        changed += self.billing.remap_medicine_ids(remap);
        changed += self.purchase.remap_medicine_ids(remap);
        changed
    }

    /// Writes the tables whose JSON changed. Returns the number of writes.
    pub fn save(&self, store: &mut dyn KeyValueStore, ns: &Namespace) -> CoreResult<usize> {
        let written = [
            write_json(store, &ns.key(AccountKey::UserMedicineData), &self.overrides)?,
            write_json(store, &ns.key(AccountKey::MedicalStores), &self.stores)?,
            write_json(store, &ns.key(AccountKey::Suppliers), &self.suppliers)?,
            write_json(store, &ns.key(AccountKey::Bills), &self.bills)?,
            write_json(store, &ns.key(AccountKey::Purchases), &self.purchases)?,
            write_json(store, &ns.key(AccountKey::BillingSession), &self.billing)?,
            write_json(store, &ns.key(AccountKey::PurchaseSession), &self.purchase)?,
            write_json(store, &ns.key(AccountKey::BillLayoutSettings), &self.bill_layout)?,
            write_json(store, &ns.key(AccountKey::SalesSettings), &self.sales)?,
        ];
        Ok(written.into_iter().filter(|w| *w).count())
    }
}

// =============================================================================
// Workspace
// =============================================================================

/// The catalog plus one account's data, with injected capabilities.
pub struct Workspace {
    namespace: Namespace,
    pub catalog: Catalog,
    pub account: AccountData,
    pub(crate) ids: SharedIds,
    pub(crate) clock: SharedClock,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("account", &self.namespace.account_id())
            .field("definitions", &self.catalog.len())
            .field("bills", &self.account.bills.len())
            .field("purchases", &self.account.purchases.len())
            .finish()
    }
}

impl Workspace {
    /// An empty workspace, for tests and first-run tooling.
    pub fn new(namespace: Namespace, ids: SharedIds, clock: SharedClock) -> Self {
        Workspace {
            namespace,
            catalog: Catalog::new(),
            account: AccountData::default(),
            ids,
            clock,
        }
    }

    /// Loads the catalog and the account's tables.
    pub fn load(
        store: &dyn KeyValueStore,
        namespace: Namespace,
        ids: SharedIds,
        clock: SharedClock,
    ) -> Self {
        let catalog: Catalog = read_json(store, &GlobalKey::MedicineDefinitions.key());
        let mut account = AccountData::load(store, &namespace);
        if !catalog.aliases().is_empty() {
            let changed = account.remap_medicine_ids(catalog.aliases());
            warn!(
                account = namespace.account_id(),
                aliases = catalog.aliases().len(),
                changed,
                "Re-pointed account data at deduplicated catalog definitions"
            );
        }
        debug!(
            account = namespace.account_id(),
            definitions = catalog.len(),
            bills = account.bills.len(),
            purchases = account.purchases.len(),
            "Workspace loaded"
        );
        Workspace {
            namespace,
            catalog,
            account,
            ids,
            clock,
        }
    }

    /// Persists everything that changed since it was last written.
    pub fn save(&self, store: &mut dyn KeyValueStore) -> CoreResult<usize> {
        let catalog_written = write_json(
            store,
            &GlobalKey::MedicineDefinitions.key(),
            &self.catalog,
        )?;
        let account_writes = self.account.save(store, &self.namespace)?;
        let writes = account_writes + usize::from(catalog_written);
        if writes > 0 {
            debug!(account = self.namespace.account_id(), writes, "Workspace saved");
        }
        Ok(writes)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The account's inventory: one entry per catalog definition.
    pub fn medicines(&self) -> Vec<Medicine> {
        projection::project(self.catalog.definitions(), &self.account.overrides)
    }

    /// Projects a single medicine.
    pub fn medicine(&self, id: &str) -> Option<Medicine> {
        self.catalog
            .get(id)
            .map(|def| Medicine::from_parts(def, self.account.overrides.get(id)))
    }

    /// Applies the navigation rule to both sessions.
    ///
    /// Edit sessions are reset as soon as the user leaves their entry screen;
    /// the returned list names each one that was dropped.
    pub fn on_view_change(&mut self, view: View) -> Vec<AutoCancelled> {
        [
            self.account.billing.on_view_change(view),
            self.account.purchase.on_view_change(view),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::ids::SequentialIds;
    use crate::session::SessionKind;
    use crate::store::MemoryStore;
    use crate::types::UserMedicineData;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeSet;

    pub(crate) fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap()
    }

    /// Empty workspace with deterministic ids and a fixed clock.
    pub(crate) fn workspace() -> Workspace {
        Workspace::new(
            Namespace::new("acct-1"),
            Arc::new(SequentialIds::new("id")),
            Arc::new(FixedClock(fixed_now())),
        )
    }

    /// Adds a definition with pricing for the account and returns its id.
    pub(crate) fn priced_medicine(ws: &mut Workspace, name: &str, price: f64, discount: f64) -> String {
        let id = ws
            .catalog
            .resolve_or_create(ws.ids.as_ref(), name, "Cipla", "Tablet", &BTreeSet::new())
            .id;
        ws.account.overrides.insert(
            id.clone(),
            UserMedicineData {
                price: Some(price),
                discount: Some(discount),
                sale_discount: None,
                batch_no: "B-0".to_string(),
                last_updated: DateTime::<Utc>::default(),
            },
        );
        id
    }

    pub(crate) fn with_store(ws: &mut Workspace, id: &str, name: &str) {
        ws.account.stores.push(MedicalStore {
            id: id.to_string(),
            name: name.to_string(),
            address: format!("{name} Road"),
            phone: String::new(),
        });
    }

    pub(crate) fn with_supplier(ws: &mut Workspace, id: &str, name: &str) {
        ws.account.suppliers.push(Supplier {
            id: id.to_string(),
            name: name.to_string(),
            address: String::new(),
            phone: String::new(),
        });
    }

    #[test]
    fn test_save_then_load_restores_workspace() {
        let mut store = MemoryStore::new();
        let mut ws = workspace();
        priced_medicine(&mut ws, "Dolo 650", 30.0, 10.0);
        with_store(&mut ws, "s1", "City Pharma");
        ws.start_bill("s1").unwrap();

        let writes = ws.save(&mut store).unwrap();
        assert!(writes > 0);

        let loaded = Workspace::load(
            &store,
            Namespace::new("acct-1"),
            Arc::new(SequentialIds::new("id")),
            Arc::new(FixedClock(fixed_now())),
        );
        assert_eq!(loaded.catalog, ws.catalog);
        assert_eq!(loaded.account, ws.account);
        assert_eq!(loaded.account.billing.kind(), SessionKind::Billing);
    }

    #[test]
    fn test_load_moves_overrides_off_duplicate_definitions() {
        use crate::types::MedicineDefinition;

        let def = |id: &str, name: &str| MedicineDefinition {
            id: id.to_string(),
            name: name.to_string(),
            company: "Cipla".to_string(),
            medicine_type: "Tablet".to_string(),
            tags: BTreeSet::new(),
        };
        let ns = Namespace::new("acct-1");
        let mut store = MemoryStore::new();
        write_json(
            &mut store,
            &GlobalKey::MedicineDefinitions.key(),
            &vec![def("m1", "Dolo 650"), def("m2", "dolo 650 ")],
        )
        .unwrap();
        let mut overrides = OverrideMap::new();
        overrides.insert(
            "m2".to_string(),
            UserMedicineData {
                price: Some(30.0),
                ..Default::default()
            },
        );
        write_json(&mut store, &ns.key(AccountKey::UserMedicineData), &overrides).unwrap();

        let ws = Workspace::load(
            &store,
            ns,
            Arc::new(SequentialIds::new("id")),
            Arc::new(FixedClock(fixed_now())),
        );
        assert!(!ws.account.overrides.contains_key("m2"));
        assert_eq!(ws.medicine("m1").unwrap().price, Some(30.0));
    }

    #[test]
    fn test_remap_keeps_override_already_on_target() {
        let mut account = AccountData::default();
        for (id, price) in [("m1", 10.0), ("m2", 20.0)] {
            account.overrides.insert(
                id.to_string(),
                UserMedicineData {
                    price: Some(price),
                    ..Default::default()
                },
            );
        }
        let remap = HashMap::from([("m2".to_string(), "m1".to_string())]);

        assert_eq!(account.remap_medicine_ids(&remap), 1);
        assert_eq!(account.overrides.len(), 1);
        assert_eq!(account.overrides["m1"].price, Some(10.0));
    }

    #[test]
    fn test_second_save_writes_nothing() {
        let mut store = MemoryStore::new();
        let mut ws = workspace();
        priced_medicine(&mut ws, "Dolo 650", 30.0, 10.0);

        ws.save(&mut store).unwrap();
        let before = store.write_count();
        assert_eq!(ws.save(&mut store).unwrap(), 0);
        assert_eq!(store.write_count(), before);
    }

    #[test]
    fn test_accounts_share_catalog_but_not_overrides() {
        let mut store = MemoryStore::new();
        let mut ws = workspace();
        let id = priced_medicine(&mut ws, "Dolo 650", 30.0, 10.0);
        ws.save(&mut store).unwrap();

        let other = Workspace::load(
            &store,
            Namespace::new("acct-2"),
            Arc::new(SequentialIds::new("id")),
            Arc::new(FixedClock(fixed_now())),
        );
        let medicine = other.medicine(&id).unwrap();
        assert_eq!(medicine.name, "Dolo 650");
        assert_eq!(medicine.price, None);
    }

    #[test]
    fn test_leaving_entry_views_cancels_both_edit_sessions() {
        let mut ws = workspace();
        ws.account.billing.start_editing("s1", 3, Vec::new());
        ws.account.purchase.start_editing("p1", 9, Vec::new());

        let cancelled = ws.on_view_change(View::Dashboard);
        assert_eq!(cancelled.len(), 2);
        assert!(!ws.account.billing.is_active());
        assert!(!ws.account.purchase.is_active());
    }
}
