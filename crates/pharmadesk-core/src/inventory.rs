//! # Inventory
//!
//! Account-level medicine management on top of the shared catalog.
//!
//! | Operation              | Catalog (shared)        | Override (account)   |
//! |------------------------|-------------------------|----------------------|
//! | `add_medicine`         | new definition          | created              |
//! | `edit_medicine`        | name/company/type/tags  | replaced             |
//! | `delete_medicine`      | untouched               | removed              |
//! | `apply_discount_sheet` | untouched               | discounts updated    |
//!
//! Catalog edits are visible to every account sharing the catalog.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use crate::account::Workspace;
use crate::error::{CoreError, CoreResult};
use crate::identity::normalize_name;
use crate::projection::{search, sort_for_display};
use crate::types::{Medicine, UserMedicineData};
use crate::validation::{
    validate_medicine_name, validate_optional_percentage, validate_optional_rate,
};

/// Form data for adding or editing a medicine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicineInput {
    pub name: String,
    pub company: String,
    #[serde(rename = "type")]
    pub medicine_type: String,
    pub tags: BTreeSet<String>,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub sale_discount: Option<f64>,
    pub batch_no: String,
}

impl MedicineInput {
    /// Validates every field; returns the trimmed name.
    fn validate(&self) -> CoreResult<String> {
        let name = validate_medicine_name(&self.name)?;
        validate_optional_rate(self.price)?;
        validate_optional_percentage("discount", self.discount)?;
        validate_optional_percentage("sale discount", self.sale_discount)?;
        Ok(name)
    }

    fn tags(&self) -> BTreeSet<String> {
        self.tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// One row of the discount sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountSheetEntry {
    pub medicine_id: String,
    pub sale_discount: Option<f64>,
    pub discount: Option<f64>,
}

impl Workspace {
    /// The account's inventory, sorted by name.
    pub fn inventory(&self) -> Vec<Medicine> {
        let mut medicines = self.medicines();
        sort_for_display(&mut medicines);
        medicines
    }

    /// Inventory entries matching `query` on name, company or tag.
    pub fn search_inventory(&self, query: &str) -> Vec<Medicine> {
        search(&self.inventory(), query).into_iter().cloned().collect()
    }

    /// Adds a medicine to the catalog with this account's pricing.
    ///
    /// ## Errors
    /// - `Validation` for an empty name or out-of-range numbers
    /// - `DuplicateMedicineName` if the name is already in the catalog
    pub fn add_medicine(&mut self, input: MedicineInput) -> CoreResult<Medicine> {
        let name = input.validate()?;
        if self.catalog.find_by_name(&name).is_some() {
            return Err(CoreError::DuplicateMedicineName {
                name: normalize_name(&name),
            });
        }

        let resolution = self.catalog.resolve_or_create(
            self.ids.as_ref(),
            &name,
            &input.company,
            &input.medicine_type,
            &input.tags(),
        );
        let data = self.override_from(&input);
        self.account.overrides.insert(resolution.id.clone(), data);

        info!(id = %resolution.id, %name, "Medicine added");
        self.medicine(&resolution.id)
            .ok_or(CoreError::MedicineNotFound(resolution.id))
    }

    /// Edits the shared fields and this account's pricing of a medicine.
    pub fn edit_medicine(&mut self, id: &str, input: MedicineInput) -> CoreResult<Medicine> {
        let name = input.validate()?;
        self.catalog.update(
            id,
            &name,
            &input.company,
            &input.medicine_type,
            &input.tags(),
        )?;
        let data = self.override_from(&input);
        self.account.overrides.insert(id.to_string(), data);

        info!(id, %name, "Medicine edited");
        self.medicine(id)
            .ok_or_else(|| CoreError::MedicineNotFound(id.to_string()))
    }

    /// Removes this account's pricing for a medicine.
    ///
    /// The shared definition stays; the medicine reappears with empty
    /// pricing. Returns whether an override existed.
    pub fn delete_medicine(&mut self, id: &str) -> CoreResult<bool> {
        if !self.catalog.contains_id(id) {
            return Err(CoreError::MedicineNotFound(id.to_string()));
        }
        let removed = self.account.overrides.remove(id).is_some();
        info!(id, removed, "Medicine pricing deleted");
        Ok(removed)
    }

    /// Bulk-updates sale and purchase discounts.
    ///
    /// Every entry is checked before any is applied. Returns how many
    /// overrides changed.
    pub fn apply_discount_sheet(&mut self, entries: &[DiscountSheetEntry]) -> CoreResult<usize> {
        for entry in entries {
            if !self.catalog.contains_id(&entry.medicine_id) {
                return Err(CoreError::MedicineNotFound(entry.medicine_id.clone()));
            }
            validate_optional_percentage("sale discount", entry.sale_discount)?;
            validate_optional_percentage("discount", entry.discount)?;
        }

        let now = self.clock.now();
        let mut changed = 0;
        for entry in entries {
            let current = self.account.overrides.get(&entry.medicine_id);
            let unchanged = current.map_or(
                entry.sale_discount.is_none() && entry.discount.is_none(),
                |d| d.sale_discount == entry.sale_discount && d.discount == entry.discount,
            );
            if unchanged {
                continue;
            }
            let data = self
                .account
                .overrides
                .entry(entry.medicine_id.clone())
                .or_default();
            data.sale_discount = entry.sale_discount;
            data.discount = entry.discount;
            data.last_updated = now;
            changed += 1;
        }
        info!(entries = entries.len(), changed, "Discount sheet applied");
        Ok(changed)
    }

    fn override_from(&self, input: &MedicineInput) -> UserMedicineData {
        UserMedicineData {
            price: input.price,
            discount: input.discount,
            sale_discount: input.sale_discount,
            batch_no: input.batch_no.trim().to_string(),
            last_updated: self.clock.now(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
