//! # Backup Export and Import
//!
//! A full-state JSON document for one account plus the shared catalog.
//!
//! ## Import Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  parse_backup(json)                                                     │
//! │   ├── strict schema: unknown top-level fields are rejected             │
//! │   ├── formatVersion must be supported                                  │
//! │   └── validate: ids present, numbers finite, bill/purchase ids unique  │
//! │                                                                         │
//! │  Workspace::import_backup(doc)                                          │
//! │   ├── catalog: merge by id (present → skip) and by normalized name     │
//! │   │            (taken → document id remapped to the existing one)      │
//! │   ├── per-account tables: replaced wholesale                           │
//! │   └── sessions: reset                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use crate::account::Workspace;
use crate::error::{CoreError, CoreResult};
use crate::identity::MergeOutcome;
use crate::projection::OverrideMap;
use crate::types::{
    BillLayoutSettings, FinalizedBill, FinalizedPurchase, MedicalStore, MedicineDefinition,
    SalesSettings, Supplier,
};

/// Current backup document format.
pub const BACKUP_FORMAT_VERSION: u32 = 1;

/// The exported state of one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BackupDocument {
    pub format_version: u32,
    #[ts(as = "String")]
    pub exported_at: DateTime<Utc>,
    pub account_id: String,
    pub medicine_definitions: Vec<MedicineDefinition>,
    #[serde(default)]
    pub user_medicine_data: OverrideMap,
    #[serde(default)]
    pub medical_stores: Vec<MedicalStore>,
    #[serde(default)]
    pub suppliers: Vec<Supplier>,
    #[serde(default)]
    pub bills: Vec<FinalizedBill>,
    #[serde(default)]
    pub purchases: Vec<FinalizedPurchase>,
    #[serde(default)]
    pub bill_layout_settings: BillLayoutSettings,
    #[serde(default)]
    pub sales_settings: SalesSettings,
}

/// What an import changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    #[ts(type = "number")]
    pub definitions_added: usize,
    /// Definitions whose id was already in the catalog.
    #[ts(type = "number")]
    pub definitions_skipped: usize,
    /// Definitions whose name matched an existing one under another id.
    #[ts(type = "number")]
    pub definitions_remapped: usize,
    #[ts(type = "number")]
    pub bills: usize,
    #[ts(type = "number")]
    pub purchases: usize,
}

// =============================================================================
// Parsing and Validation
// =============================================================================

/// Parses and validates a backup. Nothing is applied.
pub fn parse_backup(json: &str) -> CoreResult<BackupDocument> {
    let doc: BackupDocument = serde_json::from_str(json)
        .map_err(|e| CoreError::import_rejected(format!("not a valid backup: {e}")))?;
    doc.validate()?;
    Ok(doc)
}

fn reject<T>(reason: String) -> CoreResult<T> {
    Err(CoreError::import_rejected(reason))
}

fn finite(field: &str, value: f64) -> CoreResult<()> {
    if !value.is_finite() {
        return reject(format!("{field} is not a finite number"));
    }
    Ok(())
}

fn finite_opt(field: &str, value: Option<f64>) -> CoreResult<()> {
    value.map_or(Ok(()), |v| finite(field, v))
}

impl BackupDocument {
    /// Checks the document against the rules the workspace relies on.
    pub fn validate(&self) -> CoreResult<()> {
        if self.format_version == 0 || self.format_version > BACKUP_FORMAT_VERSION {
            return reject(format!(
                "unsupported format version {} (expected {BACKUP_FORMAT_VERSION})",
                self.format_version
            ));
        }

        let mut ids = HashSet::new();
        for def in &self.medicine_definitions {
            if def.id.trim().is_empty() || def.name.trim().is_empty() {
                return reject("medicine definition without id or name".to_string());
            }
            if !ids.insert(def.id.as_str()) {
                return reject(format!("medicine definition {} appears twice", def.id));
            }
        }

        for (id, data) in &self.user_medicine_data {
            finite_opt(&format!("price of {id}"), data.price)?;
            finite_opt(&format!("discount of {id}"), data.discount)?;
            finite_opt(&format!("sale discount of {id}"), data.sale_discount)?;
        }

        unique_ids("medical store", self.medical_stores.iter().map(|s| s.id.as_str()))?;
        unique_ids("supplier", self.suppliers.iter().map(|s| s.id.as_str()))?;

        let mut bill_numbers = HashSet::new();
        for bill in &self.bills {
            if bill.bill_no == 0 || !bill_numbers.insert(bill.bill_no) {
                return reject(format!("bill number {} is invalid or repeated", bill.bill_no));
            }
            for item in &bill.items {
                finite(&format!("quantity on bill #{}", bill.bill_no), item.quantity)?;
                finite_opt(&format!("rate on bill #{}", bill.bill_no), item.mrp)?;
                finite_opt(&format!("discount on bill #{}", bill.bill_no), item.discount_value)?;
            }
            finite(&format!("total of bill #{}", bill.bill_no), bill.grand_total)?;
        }

        let mut purchase_ids = HashSet::new();
        for purchase in &self.purchases {
            if purchase.purchase_id == 0 || !purchase_ids.insert(purchase.purchase_id) {
                return reject(format!(
                    "purchase id {} is invalid or repeated",
                    purchase.purchase_id
                ));
            }
            for row in &purchase.items {
                if row.medicine_id.is_empty() {
                    return reject(format!("purchase #{} has a row without medicine", purchase.purchase_id));
                }
                finite(&format!("quantity on purchase #{}", purchase.purchase_id), row.quantity)?;
                finite_opt(&format!("rate on purchase #{}", purchase.purchase_id), row.rate)?;
            }
        }

        finite("sales tax", self.sales_settings.sales_tax_percent)?;
        Ok(())
    }

    /// Pretty JSON for writing to a file.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn unique_ids<'a>(what: &str, ids: impl Iterator<Item = &'a str>) -> CoreResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() || !seen.insert(id) {
            return reject(format!("{what} id '{id}' is empty or repeated"));
        }
    }
    Ok(())
}

// =============================================================================
// Workspace Operations
// =============================================================================

impl Workspace {
    /// Snapshot of the account and the catalog.
    pub fn export_backup(&self) -> BackupDocument {
        let account = &self.account;
        BackupDocument {
            format_version: BACKUP_FORMAT_VERSION,
            exported_at: self.clock.now(),
            account_id: self.namespace().account_id().to_string(),
            medicine_definitions: self.catalog.definitions().to_vec(),
            user_medicine_data: account.overrides.clone(),
            medical_stores: account.stores.clone(),
            suppliers: account.suppliers.clone(),
            bills: account.bills.clone(),
            purchases: account.purchases.clone(),
            bill_layout_settings: account.bill_layout.clone(),
            sales_settings: account.sales.clone(),
        }
    }

    /// Applies a backup: merges the catalog and replaces account tables.
    ///
    /// The document is validated first; on error nothing changes.
    pub fn import_backup(&mut self, doc: BackupDocument) -> CoreResult<ImportReport> {
        doc.validate()?;

        let mut report = ImportReport::default();
        let mut remap: HashMap<String, String> = HashMap::new();
        for def in doc.medicine_definitions {
            let id = def.id.clone();
            match self.catalog.merge(def) {
                MergeOutcome::Inserted => report.definitions_added += 1,
                MergeOutcome::IdExists => report.definitions_skipped += 1,
                MergeOutcome::NameTaken(existing) => {
                    report.definitions_remapped += 1;
                    remap.insert(id, existing);
                }
            }
        }
        let resolve = |id: &str| remap.get(id).cloned().unwrap_or_else(|| id.to_string());

        let mut overrides = OverrideMap::new();
        for (id, data) in doc.user_medicine_data {
            let id = resolve(&id);
            if !self.catalog.contains_id(&id) {
                warn!(%id, "Imported pricing for unknown medicine dropped");
                continue;
            }
            overrides.insert(id, data);
        }

        let mut bills = doc.bills;
        for item in bills.iter_mut().flat_map(|b| b.items.iter_mut()) {
            item.medicine.id = resolve(&item.medicine.id);
        }
        let mut purchases = doc.purchases;
        for row in purchases.iter_mut().flat_map(|p| p.items.iter_mut()) {
            row.medicine_id = resolve(&row.medicine_id);
        }

        report.bills = bills.len();
        report.purchases = purchases.len();

        let account = &mut self.account;
        account.overrides = overrides;
        account.stores = doc.medical_stores;
        account.suppliers = doc.suppliers;
        account.bills = bills;
        account.purchases = purchases;
        account.bill_layout = doc.bill_layout_settings;
        account.sales = doc.sales_settings;
        account.billing.reset();
        account.purchase.reset();

        info!(
            from_account = %doc.account_id,
            added = report.definitions_added,
            skipped = report.definitions_skipped,
            remapped = report.definitions_remapped,
            bills = report.bills,
            purchases = report.purchases,
            "Backup imported"
        );
        Ok(report)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::tests::{priced_medicine, with_store, workspace};

    fn populated() -> Workspace {
        let mut ws = workspace();
        let m = priced_medicine(&mut ws, "Risek 20", 240.0, 15.0);
        with_store(&mut ws, "s1", "City Pharma");
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&m).unwrap();
        ws.finalize_bill(1).unwrap();
        ws
    }

    #[test]
    fn test_export_then_import_into_fresh_workspace() {
        let source = populated();
        let json = source.export_backup().to_json().unwrap();

        let mut target = workspace();
        let report = target.import_backup(parse_backup(&json).unwrap()).unwrap();
        assert_eq!(report.definitions_added, 1);
        assert_eq!(report.bills, 1);
        assert_eq!(target.catalog, source.catalog);
        assert_eq!(target.account.bills, source.account.bills);
        assert_eq!(target.account.overrides, source.account.overrides);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let mut value = serde_json::to_value(populated().export_backup()).unwrap();
        value["surprise"] = serde_json::json!(true);
        let err = parse_backup(&value.to_string()).unwrap_err();
        assert!(matches!(err, CoreError::ImportRejected { .. }));
    }

    #[test]
    fn test_future_version_is_rejected() {
        let mut doc = populated().export_backup();
        doc.format_version = BACKUP_FORMAT_VERSION + 1;
        assert!(parse_backup(&doc.to_json().unwrap()).is_err());
    }

    #[test]
    fn test_repeated_bill_numbers_are_rejected() {
        let mut doc = populated().export_backup();
        doc.bills.push(doc.bills[0].clone());
        assert!(doc.validate().is_err());

        let mut ws = workspace();
        assert!(ws.import_backup(doc).is_err());
        assert!(ws.catalog.is_empty());
    }

    #[test]
    fn test_name_collision_remaps_to_existing_definition() {
        let doc = populated().export_backup();
        let doc_id = doc.medicine_definitions[0].id.clone();

        let mut target = workspace();
        // Different id generator prefix, same medicine name
        target.ids = std::sync::Arc::new(crate::ids::SequentialIds::new("local"));
        let local = priced_medicine(&mut target, "RISEK 20", 1.0, 0.0);
        assert_ne!(local, doc_id);

        let report = target.import_backup(doc).unwrap();
        assert_eq!(report.definitions_remapped, 1);
        assert_eq!(target.catalog.len(), 1);
        assert_eq!(target.account.bills[0].items[0].medicine.id, local);
        assert_eq!(target.account.overrides[&local].price, Some(240.0));
    }

    #[test]
    fn test_import_resets_sessions_and_replaces_tables() {
        let doc = populated().export_backup();
        let mut target = workspace();
        with_store(&mut target, "other", "Other Store");
        target.start_bill("other").unwrap();

        target.import_backup(doc).unwrap();
        assert!(!target.account.billing.is_active());
        assert_eq!(target.account.stores.len(), 1);
        assert_eq!(target.account.stores[0].id, "s1");
    }
}
