//! # Migration and Seeding
//!
//! Startup procedures that run against the raw store, before the
//! [`Workspace`](crate::account::Workspace) is loaded.
//!
//! ## Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  bootstrap()                                                            │
//! │     │                                                                   │
//! │     ├── 1. migrate_account()       gated by <ns>:sharedCatalogMigrated  │
//! │     │      legacy <ns>:medicines ──► catalog + <ns>:userMedicineData   │
//! │     │                                                                   │
//! │     └── 2. seed_initial_data()     gated by global:initialized          │
//! │            only when the catalog is still empty                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Migration runs first so that an account with legacy data never receives
//! the demo catalog on top of its own medicines.
//!
//! ## Idempotence
//! The flags are the only guards. Once set, both procedures return without
//! reading anything else and perform zero writes.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::billing::BillingSession;
use crate::clock::Clock;
use crate::error::CoreResult;
use crate::identity::Catalog;
use crate::ids::IdGenerator;
use crate::projection::OverrideMap;
use crate::purchase::PurchaseSession;
use crate::seed_data::{SeedCounterparty, DEMO_STORE, DEMO_SUPPLIER, SEED_MEDICINES};
use crate::store::{
    read_flag, read_json, read_json_opt, write_json, AccountKey, GlobalKey, KeyValueStore,
    Namespace,
};
use crate::types::{FinalizedBill, FinalizedPurchase, MedicalStore, Supplier, UserMedicineData};
use crate::validation::validate_medicine_name;

// =============================================================================
// Legacy Records
// =============================================================================

/// A per-account medicine record from before the shared catalog existed.
///
/// Every field is optional on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyMedicine {
    pub id: String,
    pub name: String,
    pub company: String,
    #[serde(rename = "type")]
    pub medicine_type: String,
    pub tags: BTreeSet<String>,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub sale_discount: Option<f64>,
    pub batch_no: String,
    pub last_updated: DateTime<Utc>,
}

impl LegacyMedicine {
    fn override_data(&self) -> UserMedicineData {
        UserMedicineData {
            price: self.price,
            discount: self.discount,
            sale_discount: self.sale_discount,
            batch_no: self.batch_no.clone(),
            last_updated: self.last_updated,
        }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// The flag was already set; nothing was read or written.
    AlreadyMigrated,
    /// No legacy list existed; only the flag was written.
    NoLegacyData,
    Migrated {
        records: usize,
        /// New catalog definitions created.
        created: usize,
        /// Records dropped for having no usable name.
        skipped: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeedOutcome {
    AlreadyInitialized,
    /// The catalog had entries; only the flag was written.
    CatalogPresent,
    Seeded {
        medicines: usize,
        store_created: bool,
        supplier_created: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapReport {
    pub migration: MigrationOutcome,
    pub seed: SeedOutcome,
}

// =============================================================================
// Procedures
// =============================================================================

/// Runs migration, then seeding.
pub fn bootstrap(
    store: &mut dyn KeyValueStore,
    ns: &Namespace,
    ids: &dyn IdGenerator,
    clock: &dyn Clock,
) -> CoreResult<BootstrapReport> {
    let migration = migrate_account(store, ns, ids)?;
    let seed = seed_initial_data(store, ns, ids, clock)?;
    info!(account = ns.account_id(), ?migration, ?seed, "Bootstrap complete");
    Ok(BootstrapReport { migration, seed })
}

/// Moves the account's legacy medicine list into the shared catalog.
///
/// ## Steps
/// 1. No legacy list: set the flag and stop.
/// 2. Resolve each record by normalized name, creating definitions with the
///    record's company, type and tags when new.
/// 3. Replace the account's overrides with ones built from the records.
///    When two records share a name the later one wins.
/// 4. Rewrite medicine ids in the account's bills, purchases and saved
///    sessions to the resolved catalog ids.
/// 5. Delete the legacy list and set the flag.
pub fn migrate_account(
    store: &mut dyn KeyValueStore,
    ns: &Namespace,
    ids: &dyn IdGenerator,
) -> CoreResult<MigrationOutcome> {
    let flag_key = ns.key(AccountKey::SharedCatalogMigrated);
    if read_flag(store, &flag_key) {
        debug!(account = ns.account_id(), "Shared catalog migration already done");
        return Ok(MigrationOutcome::AlreadyMigrated);
    }

    let legacy_key = ns.key(AccountKey::LegacyMedicines);
    let Some(legacy) = read_json_opt::<Vec<LegacyMedicine>>(store, &legacy_key) else {
        write_json(store, &flag_key, &true)?;
        return Ok(MigrationOutcome::NoLegacyData);
    };

    let catalog_key = GlobalKey::MedicineDefinitions.key();
    let mut catalog: Catalog = read_json(store, &catalog_key);
    let mut overrides = OverrideMap::new();
    let mut remap: HashMap<String, String> = HashMap::new();
    let (mut created, mut skipped) = (0, 0);

    for record in &legacy {
        let Ok(name) = validate_medicine_name(&record.name) else {
            warn!(legacy_id = %record.id, "Skipping legacy medicine without a name");
            skipped += 1;
            continue;
        };
        let resolution = catalog.resolve_or_create(
            ids,
            &name,
            &record.company,
            &record.medicine_type,
            &record.tags,
        );
        if resolution.created {
            created += 1;
        }
        if !record.id.is_empty() && record.id != resolution.id {
            remap.insert(record.id.clone(), resolution.id.clone());
        }
        overrides.insert(resolution.id, record.override_data());
    }

    write_json(store, &catalog_key, &catalog)?;
    write_json(store, &ns.key(AccountKey::UserMedicineData), &overrides)?;
    remap_history(store, ns, &remap)?;
    store.remove(&legacy_key);
    write_json(store, &flag_key, &true)?;

    info!(
        account = ns.account_id(),
        records = legacy.len(),
        created,
        skipped,
        "Migrated legacy medicines to shared catalog"
    );
    Ok(MigrationOutcome::Migrated {
        records: legacy.len(),
        created,
        skipped,
    })
}

/// Points finalized bills, purchases and the persisted sessions at the
/// resolved catalog ids.
fn remap_history(
    store: &mut dyn KeyValueStore,
    ns: &Namespace,
    remap: &HashMap<String, String>,
) -> CoreResult<()> {
    if remap.is_empty() {
        return Ok(());
    }

    let bills_key = ns.key(AccountKey::Bills);
    let mut bills: Vec<FinalizedBill> = read_json(store, &bills_key);
    for item in bills.iter_mut().flat_map(|b| b.items.iter_mut()) {
        if let Some(id) = remap.get(&item.medicine.id) {
            item.medicine.id = id.clone();
        }
    }
    if !bills.is_empty() {
        write_json(store, &bills_key, &bills)?;
    }

    let purchases_key = ns.key(AccountKey::Purchases);
    let mut purchases: Vec<FinalizedPurchase> = read_json(store, &purchases_key);
    for row in purchases.iter_mut().flat_map(|p| p.items.iter_mut()) {
        if let Some(id) = remap.get(&row.medicine_id) {
            row.medicine_id = id.clone();
        }
    }
    if !purchases.is_empty() {
        write_json(store, &purchases_key, &purchases)?;
    }

    let billing_key = ns.key(AccountKey::BillingSession);
    if let Some(mut session) = read_json_opt::<BillingSession>(store, &billing_key) {
        if session.remap_medicine_ids(remap) > 0 {
            write_json(store, &billing_key, &session)?;
        }
    }
    let purchase_key = ns.key(AccountKey::PurchaseSession);
    if let Some(mut session) = read_json_opt::<PurchaseSession>(store, &purchase_key) {
        if session.remap_medicine_ids(remap) > 0 {
            write_json(store, &purchase_key, &session)?;
        }
    }
    Ok(())
}

/// Populates an empty catalog with the starter list on first run.
///
/// The account running it also gets default pricing for the seeded
/// medicines and, when it has none, a demo store and a demo supplier.
pub fn seed_initial_data(
    store: &mut dyn KeyValueStore,
    ns: &Namespace,
    ids: &dyn IdGenerator,
    clock: &dyn Clock,
) -> CoreResult<SeedOutcome> {
    let flag_key = GlobalKey::Initialized.key();
    if read_flag(store, &flag_key) {
        return Ok(SeedOutcome::AlreadyInitialized);
    }

    let catalog_key = GlobalKey::MedicineDefinitions.key();
    let mut catalog: Catalog = read_json(store, &catalog_key);
    if !catalog.is_empty() {
        write_json(store, &flag_key, &true)?;
        return Ok(SeedOutcome::CatalogPresent);
    }

    let now = clock.now();
    let overrides_key = ns.key(AccountKey::UserMedicineData);
    let mut overrides: OverrideMap = read_json(store, &overrides_key);
    for seed in SEED_MEDICINES {
        let tags: BTreeSet<String> = seed.tags.iter().map(|t| t.to_string()).collect();
        let resolution =
            catalog.resolve_or_create(ids, seed.name, seed.company, seed.medicine_type, &tags);
        overrides
            .entry(resolution.id)
            .or_insert_with(|| UserMedicineData {
                price: Some(seed.price),
                discount: Some(seed.discount),
                sale_discount: Some(seed.sale_discount),
                batch_no: seed.batch_no.to_string(),
                last_updated: now,
            });
    }

    let stores_key = ns.key(AccountKey::MedicalStores);
    let mut stores: Vec<MedicalStore> = read_json(store, &stores_key);
    let store_created = stores.is_empty();
    if store_created {
        let SeedCounterparty { name, address, phone } = DEMO_STORE;
        stores.push(MedicalStore {
            id: ids.next_id(),
            name: name.to_string(),
            address: address.to_string(),
            phone: phone.to_string(),
        });
    }

    let suppliers_key = ns.key(AccountKey::Suppliers);
    let mut suppliers: Vec<Supplier> = read_json(store, &suppliers_key);
    let supplier_created = suppliers.is_empty();
    if supplier_created {
        let SeedCounterparty { name, address, phone } = DEMO_SUPPLIER;
        suppliers.push(Supplier {
            id: ids.next_id(),
            name: name.to_string(),
            address: address.to_string(),
            phone: phone.to_string(),
        });
    }

    write_json(store, &catalog_key, &catalog)?;
    write_json(store, &overrides_key, &overrides)?;
    write_json(store, &stores_key, &stores)?;
    write_json(store, &suppliers_key, &suppliers)?;
    write_json(store, &flag_key, &true)?;

    info!(medicines = catalog.len(), store_created, supplier_created, "Seeded initial data");
    Ok(SeedOutcome::Seeded {
        medicines: catalog.len(),
        store_created,
        supplier_created,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::ids::SequentialIds;
    use crate::store::MemoryStore;
    use crate::types::PurchaseRowData;
    use chrono::TimeZone;

    fn legacy(id: &str, name: &str, price: f64) -> LegacyMedicine {
        LegacyMedicine {
            id: id.to_string(),
            name: name.to_string(),
            company: "Getz".to_string(),
            medicine_type: "Tablet".to_string(),
            tags: BTreeSet::from(["gastro".to_string()]),
            price: Some(price),
            discount: Some(10.0),
            sale_discount: Some(4.0),
            batch_no: "L1".to_string(),
            last_updated: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    fn store_with_legacy(ns: &Namespace, records: &[LegacyMedicine]) -> MemoryStore {
        let mut store = MemoryStore::new();
        write_json(&mut store, &ns.key(AccountKey::LegacyMedicines), records).unwrap();
        store
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_migrates_legacy_records() {
        let ns = Namespace::new("acct-1");
        let mut store = store_with_legacy(&ns, &[legacy("old-1", "Risek 20", 240.0)]);
        let ids = SequentialIds::new("def");

        let outcome = migrate_account(&mut store, &ns, &ids).unwrap();
        assert_eq!(
            outcome,
            MigrationOutcome::Migrated {
                records: 1,
                created: 1,
                skipped: 0
            }
        );

        let catalog: Catalog = read_json(&store, &GlobalKey::MedicineDefinitions.key());
        let def = catalog.find_by_name("risek 20").unwrap();
        assert_eq!(def.company, "Getz");
        assert!(def.tags.contains("gastro"));

        let overrides: OverrideMap = read_json(&store, &ns.key(AccountKey::UserMedicineData));
        assert_eq!(overrides[&def.id].price, Some(240.0));
        assert_eq!(overrides[&def.id].batch_no, "L1");

        assert!(store.get(&ns.key(AccountKey::LegacyMedicines)).is_none());
        assert!(read_flag(&store, &ns.key(AccountKey::SharedCatalogMigrated)));
    }

    #[test]
    fn test_second_run_is_a_no_op_with_zero_writes() {
        let ns = Namespace::new("acct-1");
        let mut store = store_with_legacy(&ns, &[legacy("old-1", "Risek 20", 240.0)]);
        let ids = SequentialIds::new("def");

        migrate_account(&mut store, &ns, &ids).unwrap();
        let snapshot = store.clone();
        let writes = store.write_count();

        assert_eq!(
            migrate_account(&mut store, &ns, &ids).unwrap(),
            MigrationOutcome::AlreadyMigrated
        );
        assert_eq!(store.write_count(), writes);
        assert_eq!(
            store.get(&GlobalKey::MedicineDefinitions.key()),
            snapshot.get(&GlobalKey::MedicineDefinitions.key())
        );
    }

    #[test]
    fn test_no_legacy_data_only_sets_flag() {
        let ns = Namespace::new("acct-1");
        let mut store = MemoryStore::new();
        let ids = SequentialIds::new("def");

        assert_eq!(
            migrate_account(&mut store, &ns, &ids).unwrap(),
            MigrationOutcome::NoLegacyData
        );
        assert_eq!(store.write_count(), 1);
        assert!(store.get(&GlobalKey::MedicineDefinitions.key()).is_none());
    }

    #[test]
    fn test_existing_definition_is_reused_and_kept() {
        let ns = Namespace::new("acct-2");
        let mut store = store_with_legacy(
            &ns,
            &[legacy("old-1", " RISEK 20 ", 250.0), legacy("old-2", "   ", 1.0)],
        );
        let ids = SequentialIds::new("def");
        let mut catalog = Catalog::new();
        let existing = catalog
            .resolve_or_create(&ids, "Risek 20", "Getz Pharma", "Capsule", &BTreeSet::new())
            .id;
        write_json(&mut store, &GlobalKey::MedicineDefinitions.key(), &catalog).unwrap();

        let outcome = migrate_account(&mut store, &ns, &ids).unwrap();
        assert_eq!(
            outcome,
            MigrationOutcome::Migrated {
                records: 2,
                created: 0,
                skipped: 1
            }
        );

        let catalog: Catalog = read_json(&store, &GlobalKey::MedicineDefinitions.key());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(&existing).unwrap().medicine_type, "Capsule");

        let overrides: OverrideMap = read_json(&store, &ns.key(AccountKey::UserMedicineData));
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[&existing].price, Some(250.0));
    }

    #[test]
    fn test_overrides_are_replaced_not_merged() {
        let ns = Namespace::new("acct-1");
        let mut store = store_with_legacy(&ns, &[legacy("old-1", "Risek 20", 240.0)]);
        let mut stale = OverrideMap::new();
        stale.insert("stale".to_string(), UserMedicineData::default());
        write_json(&mut store, &ns.key(AccountKey::UserMedicineData), &stale).unwrap();

        migrate_account(&mut store, &ns, &SequentialIds::new("def")).unwrap();
        let overrides: OverrideMap = read_json(&store, &ns.key(AccountKey::UserMedicineData));
        assert!(!overrides.contains_key("stale"));
    }

    #[test]
    fn test_saved_purchase_session_is_remapped_and_finalizes() {
        use crate::account::Workspace;
        use crate::purchase::PurchaseSession;
        use std::sync::Arc;

        let ns = Namespace::new("acct-1");
        let mut store = store_with_legacy(&ns, &[legacy("old-1", "Risek 20", 240.0)]);
        let supplier = Supplier {
            id: "sup-1".to_string(),
            name: "Mehta Distributors".to_string(),
            address: String::new(),
            phone: String::new(),
        };
        write_json(&mut store, &ns.key(AccountKey::Suppliers), &vec![supplier]).unwrap();

        let mut session = PurchaseSession::default();
        session.start("sup-1");
        session.push_line(PurchaseRowData {
            medicine_id: "old-1".to_string(),
            name: "Risek 20".to_string(),
            company: "Getz".to_string(),
            batch_no: "L1".to_string(),
            quantity: 2.0,
            rate: Some(200.0),
            discount: None,
            net_amount: 400.0,
        });
        write_json(&mut store, &ns.key(AccountKey::PurchaseSession), &session).unwrap();

        migrate_account(&mut store, &ns, &SequentialIds::new("def")).unwrap();

        let mut ws = Workspace::load(
            &store,
            ns,
            Arc::new(SequentialIds::new("id")),
            Arc::new(clock()),
        );
        assert_eq!(ws.account.purchase.lines()[0].medicine_id, "def-1");
        let posting = ws.finalize_purchase().unwrap();
        assert_eq!(posting.purchase.items[0].medicine_id, "def-1");
        assert_eq!(posting.purchase.total_amount, 400.0);
    }

    #[test]
    fn test_history_is_pointed_at_catalog_ids() {
        let ns = Namespace::new("acct-1");
        let mut store = store_with_legacy(&ns, &[legacy("old-1", "Risek 20", 240.0)]);
        let purchase = FinalizedPurchase {
            purchase_id: 1,
            supplier_id: "sup".to_string(),
            supplier_name: "Sup".to_string(),
            date: Utc::now(),
            items: vec![PurchaseRowData {
                medicine_id: "old-1".to_string(),
                name: "Risek 20".to_string(),
                company: String::new(),
                batch_no: String::new(),
                quantity: 1.0,
                rate: Some(200.0),
                discount: None,
                net_amount: 200.0,
            }],
            total_amount: 200.0,
        };
        write_json(&mut store, &ns.key(AccountKey::Purchases), &vec![purchase]).unwrap();

        migrate_account(&mut store, &ns, &SequentialIds::new("def")).unwrap();
        let purchases: Vec<FinalizedPurchase> = read_json(&store, &ns.key(AccountKey::Purchases));
        assert_eq!(purchases[0].items[0].medicine_id, "def-1");
    }

    #[test]
    fn test_seeding_populates_empty_catalog_once() {
        let ns = Namespace::new("acct-1");
        let mut store = MemoryStore::new();
        let ids = SequentialIds::new("seed");

        let outcome = seed_initial_data(&mut store, &ns, &ids, &clock()).unwrap();
        assert_eq!(
            outcome,
            SeedOutcome::Seeded {
                medicines: SEED_MEDICINES.len(),
                store_created: true,
                supplier_created: true
            }
        );
        let stores: Vec<MedicalStore> = read_json(&store, &ns.key(AccountKey::MedicalStores));
        assert_eq!(stores.len(), 1);

        let writes = store.write_count();
        assert_eq!(
            seed_initial_data(&mut store, &ns, &ids, &clock()).unwrap(),
            SeedOutcome::AlreadyInitialized
        );
        assert_eq!(store.write_count(), writes);
    }

    #[test]
    fn test_bootstrap_with_legacy_data_skips_demo_catalog() {
        let ns = Namespace::new("acct-1");
        let mut store = store_with_legacy(&ns, &[legacy("old-1", "Risek 20", 240.0)]);
        let ids = SequentialIds::new("def");

        let report = bootstrap(&mut store, &ns, &ids, &clock()).unwrap();
        assert!(matches!(report.migration, MigrationOutcome::Migrated { .. }));
        assert_eq!(report.seed, SeedOutcome::CatalogPresent);

        let catalog: Catalog = read_json(&store, &GlobalKey::MedicineDefinitions.key());
        assert_eq!(catalog.len(), 1);
    }
}
