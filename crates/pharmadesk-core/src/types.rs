//! # Domain Types
//!
//! Core domain types used throughout Pharmadesk.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐        ┌─────────────────────┐                │
//! │  │ MedicineDefinition  │        │  UserMedicineData   │                │
//! │  │  (shared, global)   │        │  (per account)      │                │
//! │  │  ─────────────────  │        │  ─────────────────  │                │
//! │  │  id                 │◄──key──│  price, discount    │                │
//! │  │  name, company      │        │  saleDiscount       │                │
//! │  │  type, tags         │        │  batchNo, updated   │                │
//! │  └──────────┬──────────┘        └──────────┬──────────┘                │
//! │             └──────────── join ────────────┘                            │
//! │                            ▼                                            │
//! │                  ┌─────────────────────┐                                │
//! │                  │      Medicine       │  derived, never persisted      │
//! │                  └──────────┬──────────┘                                │
//! │              ┌──────────────┴──────────────┐                            │
//! │              ▼                             ▼                            │
//! │     CartItem → FinalizedBill      PurchaseRowData → FinalizedPurchase  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names serialize in camelCase so persisted tables and backups keep
//! the layout the frontend reads.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::identity::normalize_name;

// =============================================================================
// Medicine Definition (shared catalog)
// =============================================================================

/// A medicine in the catalog shared by every account.
///
/// ## Identity
/// Two definitions never share a normalized name (`trim().to_lowercase()`).
/// Definitions are never deleted; an account "deleting" a medicine only
/// drops its own [`UserMedicineData`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MedicineDefinition {
    /// Opaque, globally unique id.
    pub id: String,

    /// Display name as first entered (trimmed).
    pub name: String,

    /// Manufacturer.
    #[serde(default)]
    pub company: String,

    /// Dosage form: tablet, syrup, injection...
    #[serde(rename = "type", default)]
    pub medicine_type: String,

    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl MedicineDefinition {
    /// Returns the deduplication key for this definition.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

// =============================================================================
// User Medicine Data (per-account override)
// =============================================================================

/// Per-account pricing layered onto a catalog definition.
///
/// Missing records project as all-`None`, empty batch and the epoch
/// timestamp, which is exactly what `Default` produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserMedicineData {
    /// Current rate (MRP) for this account. Refreshed by purchases.
    pub price: Option<f64>,

    /// Purchase discount percentage.
    pub discount: Option<f64>,

    /// Default sale discount percentage applied to new bill lines.
    pub sale_discount: Option<f64>,

    #[serde(default)]
    pub batch_no: String,

    #[serde(default)]
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

// =============================================================================
// Medicine (projection)
// =============================================================================

/// The joined view of a definition and the calling account's override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(rename = "type", default)]
    pub medicine_type: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub sale_discount: Option<f64>,
    #[serde(default)]
    pub batch_no: String,
    #[serde(default)]
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

impl Medicine {
    /// Joins a definition with an optional override.
    pub fn from_parts(definition: &MedicineDefinition, data: Option<&UserMedicineData>) -> Self {
        let data = data.cloned().unwrap_or_default();
        Medicine {
            id: definition.id.clone(),
            name: definition.name.clone(),
            company: definition.company.clone(),
            medicine_type: definition.medicine_type.clone(),
            tags: definition.tags.clone(),
            price: data.price,
            discount: data.discount,
            sale_discount: data.sale_discount,
            batch_no: data.batch_no,
            last_updated: data.last_updated,
        }
    }

    /// Splits the view back into its shared and per-account halves.
    pub fn split(self) -> (MedicineDefinition, UserMedicineData) {
        (
            MedicineDefinition {
                id: self.id,
                name: self.name,
                company: self.company,
                medicine_type: self.medicine_type,
                tags: self.tags,
            },
            UserMedicineData {
                price: self.price,
                discount: self.discount,
                sale_discount: self.sale_discount,
                batch_no: self.batch_no,
                last_updated: self.last_updated,
            },
        )
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// A medicine on an in-progress or finalized bill.
///
/// Uses the snapshot pattern: `mrp` and `purchase_discount` are frozen when
/// the line is added, so later price changes never alter a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(flatten)]
    pub medicine: Medicine,

    pub quantity: f64,

    /// Sale discount % for this line; `None` falls back to the medicine's
    /// `sale_discount`.
    pub discount_value: Option<f64>,

    /// Purchase discount % at add time (for profit reporting).
    pub purchase_discount: Option<f64>,

    /// Rate at add time, editable per line.
    pub mrp: Option<f64>,

    #[serde(default)]
    pub calculated_discount_amount: f64,

    #[serde(default)]
    pub net_amount: f64,

    #[serde(default)]
    pub sales_tax_amount: Option<f64>,
}

impl CartItem {
    /// Id of the catalog definition this line bills.
    #[inline]
    pub fn medicine_id(&self) -> &str {
        &self.medicine.id
    }
}

// =============================================================================
// Finalized Bill
// =============================================================================

/// A bill persisted on finalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedBill {
    /// Unique per account, chosen by the user.
    #[ts(type = "number")]
    pub bill_no: u64,
    pub store_id: String,
    /// Store name at time of billing (frozen).
    pub store_name: String,
    /// Store address at time of billing (frozen).
    pub store_address: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub items: Vec<CartItem>,
    /// Sum of gross amounts (quantity × rate).
    pub subtotal: f64,
    #[serde(default)]
    pub total_discount: f64,
    #[serde(default)]
    pub total_tax: f64,
    pub grand_total: f64,
}

// =============================================================================
// Purchases
// =============================================================================

/// A line on a purchase from a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRowData {
    pub medicine_id: String,
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub batch_no: String,
    pub quantity: f64,
    pub rate: Option<f64>,
    /// Purchase discount %.
    pub discount: Option<f64>,
    #[serde(default)]
    pub net_amount: f64,
}

/// A purchase persisted on finalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedPurchase {
    /// Auto-incremented (max + 1), never user-editable.
    #[ts(type = "number")]
    pub purchase_id: u64,
    pub supplier_id: String,
    pub supplier_name: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub items: Vec<PurchaseRowData>,
    pub total_amount: f64,
}

// =============================================================================
// Counterparties
// =============================================================================

/// A customer pharmacy that bills are issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MedicalStore {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

/// A wholesaler that purchases are made from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

// =============================================================================
// Settings
// =============================================================================

/// Header/footer content printed on bills.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct BillLayoutSettings {
    pub business_name: String,
    pub business_address: String,
    pub business_phone: String,
    pub license_no: String,
    pub footer_note: String,
    pub show_batch_no: bool,
    pub show_company: bool,
}

/// Sales tax configuration for billing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct SalesSettings {
    pub sales_tax_enabled: bool,
    /// Tax % applied to each line's discounted amount.
    pub sales_tax_percent: f64,
}

// =============================================================================
// Unit Tests
// =============================================================================
