//! # Purchases
//!
//! Purchase composition against a supplier, finalization and posting.
//!
//! ## Posting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  finalize_purchase()                                                    │
//! │      │                                                                  │
//! │      ├── persist FinalizedPurchase (id = max + 1 on create)             │
//! │      │                                                                  │
//! │      └── for each line: account override                                │
//! │             price      ◄── rate                                         │
//! │             discount   ◄── discount                                     │
//! │             batchNo    ◄── batchNo                                      │
//! │             lastUpdated◄── now                                          │
//! │                                                                         │
//! │  Purchases are the authoritative source of current cost and batch.     │
//! │  When an older purchase is edited, a line only refreshes pricing if    │
//! │  no later purchase carries the same medicine, so correcting history    │
//! │  never rolls live prices back.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};
use ts_rs::TS;

use crate::account::Workspace;
use crate::error::{CoreError, CoreResult};
use crate::money::{
    checked_sum, opt_decimal, purchase_line_net, to_decimal, to_f64_exact, to_money_f64,
};
use crate::session::{AddLine, Discarded, LineUpdate, Session, SessionKind, SessionLine, View};
use crate::types::{FinalizedPurchase, Medicine, PurchaseRowData};
use crate::validation::{
    validate_medicine_name, validate_optional_percentage, validate_optional_rate,
    validate_quantity,
};

/// The in-progress purchase.
pub type PurchaseSession = Session<PurchaseRowData>;

impl Default for Session<PurchaseRowData> {
    fn default() -> Self {
        Session::new(SessionKind::Purchase)
    }
}

// =============================================================================
// Purchase Rows
// =============================================================================

impl SessionLine for PurchaseRowData {
    fn medicine_id(&self) -> &str {
        &self.medicine_id
    }

    fn is_valid(&self) -> bool {
        self.quantity > 0.0 && self.rate.is_some()
    }
}

impl PurchaseRowData {
    /// A fresh row prefilled from the account's current pricing.
    pub fn from_medicine(medicine: &Medicine) -> CoreResult<Self> {
        let mut row = PurchaseRowData {
            medicine_id: medicine.id.clone(),
            name: medicine.name.clone(),
            company: medicine.company.clone(),
            batch_no: medicine.batch_no.clone(),
            quantity: 1.0,
            rate: medicine.price,
            discount: medicine.discount,
            net_amount: 0.0,
        };
        row.recalculate()?;
        Ok(row)
    }

    /// Unrounded net: `quantity × rate × (1 − discount/100)`.
    pub fn net(&self) -> CoreResult<Decimal> {
        purchase_line_net(
            to_decimal(self.quantity)?,
            opt_decimal(self.rate)?,
            opt_decimal(self.discount)?,
        )
    }

    pub fn recalculate(&mut self) -> CoreResult<()> {
        self.net_amount = to_f64_exact(self.net()?);
        Ok(())
    }
}

// =============================================================================
// Session Operations
// =============================================================================

impl Session<PurchaseRowData> {
    fn require_active(&self) -> CoreResult<()> {
        if self.counterparty_id().is_none() {
            return Err(CoreError::NoActiveSession {
                session: SessionKind::Purchase,
            });
        }
        Ok(())
    }

    /// Adds a row. Re-adding a medicine resets that row's editable fields.
    pub fn add_medicine(&mut self, medicine: &Medicine) -> CoreResult<AddLine> {
        self.require_active()?;
        let fresh = PurchaseRowData::from_medicine(medicine)?;
        match self.line_mut(&medicine.id) {
            Some(row) => {
                *row = fresh;
                Ok(AddLine::Reset)
            }
            None => {
                self.push_line(fresh);
                Ok(AddLine::Added)
            }
        }
    }

    /// Sets a row's quantity; zero or below deletes the row.
    pub fn set_quantity(&mut self, medicine_id: &str, quantity: f64) -> CoreResult<LineUpdate> {
        validate_quantity(quantity)?;
        if !self.contains(medicine_id) {
            return Err(CoreError::NotInCart(medicine_id.to_string()));
        }
        if quantity <= 0.0 {
            self.remove_line(medicine_id);
            return Ok(LineUpdate::Removed);
        }
        self.update_row(medicine_id, |row| row.quantity = quantity)?;
        Ok(LineUpdate::Updated)
    }

    pub fn set_rate(&mut self, medicine_id: &str, rate: Option<f64>) -> CoreResult<()> {
        validate_optional_rate(rate)?;
        self.update_row(medicine_id, |row| row.rate = rate)
    }

    pub fn set_discount(&mut self, medicine_id: &str, discount: Option<f64>) -> CoreResult<()> {
        validate_optional_percentage("discount", discount)?;
        self.update_row(medicine_id, |row| row.discount = discount)
    }

    pub fn set_batch_no(&mut self, medicine_id: &str, batch_no: &str) -> CoreResult<()> {
        let batch_no = batch_no.trim().to_string();
        self.update_row(medicine_id, |row| row.batch_no = batch_no)
    }

    /// Points rows at new catalog ids. Rows that land on a medicine already
    /// present are dropped.
    pub fn remap_medicine_ids(&mut self, remap: &HashMap<String, String>) -> usize {
        self.remap_medicines(remap, |row| &mut row.medicine_id)
    }

    /// Full-precision total over rows with a positive quantity.
    pub fn total(&self) -> CoreResult<Decimal> {
        checked_sum(
            self.lines()
                .iter()
                .filter(|r| r.quantity > 0.0)
                .map(PurchaseRowData::net),
        )
    }

    /// Edits a copy of the row and writes it back once its net is derived.
    fn update_row<F>(&mut self, medicine_id: &str, edit: F) -> CoreResult<()>
    where
        F: FnOnce(&mut PurchaseRowData),
    {
        let mut edited = self
            .line(medicine_id)
            .ok_or_else(|| CoreError::NotInCart(medicine_id.to_string()))?
            .clone();
        edit(&mut edited);
        edited.recalculate()?;
        if let Some(row) = self.line_mut(medicine_id) {
            *row = edited;
        }
        Ok(())
    }
}

// =============================================================================
// Workspace Operations
// =============================================================================

/// Result of finalizing a purchase.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePosting {
    pub purchase: FinalizedPurchase,
    /// Medicines whose account pricing was overwritten from this purchase.
    pub refreshed: Vec<String>,
    /// Medicines left alone because a later purchase is more recent.
    pub skipped: Vec<String>,
}

impl Workspace {
    /// Next purchase id: highest existing + 1.
    pub fn next_purchase_id(&self) -> u64 {
        self.account
            .purchases
            .iter()
            .map(|p| p.purchase_id)
            .max()
            .map_or(1, |n| n + 1)
    }

    pub fn purchase(&self, purchase_id: u64) -> Option<&FinalizedPurchase> {
        self.account
            .purchases
            .iter()
            .find(|p| p.purchase_id == purchase_id)
    }

    /// Starts a purchase from a supplier, discarding any other in progress.
    pub fn start_purchase(&mut self, supplier_id: &str) -> CoreResult<Option<Discarded>> {
        if !self.account.suppliers.iter().any(|s| s.id == supplier_id) {
            return Err(CoreError::SupplierNotFound(supplier_id.to_string()));
        }
        let discarded = self.account.purchase.start(supplier_id);
        if let Some(d) = &discarded {
            info!(
                previous = ?d.counterparty_id,
                lines = d.line_count,
                "Discarded purchase in progress"
            );
        }
        Ok(discarded)
    }

    pub fn add_purchase_line(&mut self, medicine_id: &str) -> CoreResult<AddLine> {
        let medicine = self
            .medicine(medicine_id)
            .ok_or_else(|| CoreError::MedicineNotFound(medicine_id.to_string()))?;
        self.account.purchase.add_medicine(&medicine)
    }

    /// Adds a row by name, creating the catalog definition if it is new.
    pub fn add_purchase_line_by_name(
        &mut self,
        name: &str,
        company: &str,
        medicine_type: &str,
    ) -> CoreResult<AddLine> {
        let name = validate_medicine_name(name)?;
        self.account.purchase.require_active()?;

        let resolution = self.catalog.resolve_or_create(
            self.ids.as_ref(),
            &name,
            company,
            medicine_type,
            &BTreeSet::new(),
        );
        if resolution.created {
            info!(id = %resolution.id, %name, "Created catalog definition from purchase");
        }
        self.add_purchase_line(&resolution.id)
    }

    pub fn set_purchase_quantity(&mut self, medicine_id: &str, quantity: f64) -> CoreResult<LineUpdate> {
        self.account.purchase.set_quantity(medicine_id, quantity)
    }

    pub fn set_purchase_rate(&mut self, medicine_id: &str, rate: Option<f64>) -> CoreResult<()> {
        self.account.purchase.set_rate(medicine_id, rate)
    }

    pub fn set_purchase_discount(&mut self, medicine_id: &str, discount: Option<f64>) -> CoreResult<()> {
        self.account.purchase.set_discount(medicine_id, discount)
    }

    pub fn set_purchase_batch_no(&mut self, medicine_id: &str, batch_no: &str) -> CoreResult<()> {
        self.account.purchase.set_batch_no(medicine_id, batch_no)
    }

    /// Rounded total of the purchase in progress.
    pub fn purchase_total(&self) -> CoreResult<f64> {
        Ok(to_money_f64(self.account.purchase.total()?))
    }

    /// Validates and persists the purchase in progress, posts its prices to
    /// the account and resets the session.
    ///
    /// ## Errors
    /// - `NoActiveSession` if no supplier is selected
    /// - `SupplierNotFound` if the supplier was deleted meanwhile
    /// - `PurchaseNotFound` if the purchase being edited is gone
    /// - `MedicineNotFound` if a row names an unknown medicine
    /// - `NoValidItems` if no row has a quantity and a rate
    pub fn finalize_purchase(&mut self) -> CoreResult<PurchasePosting> {
        let session = &self.account.purchase;
        let supplier_id = session
            .counterparty_id()
            .ok_or(CoreError::NoActiveSession {
                session: SessionKind::Purchase,
            })?;
        let supplier = self
            .account
            .suppliers
            .iter()
            .find(|s| s.id == supplier_id)
            .ok_or_else(|| CoreError::SupplierNotFound(supplier_id.to_string()))?;

        let existing = match session.editing_id() {
            Some(id) => Some(
                self.account
                    .purchases
                    .iter()
                    .position(|p| p.purchase_id == id)
                    .ok_or(CoreError::PurchaseNotFound(id))?,
            ),
            None => None,
        };

        let rows: Vec<&PurchaseRowData> = session.valid_lines().collect();
        if rows.is_empty() {
            return Err(CoreError::NoValidItems);
        }
        if let Some(unknown) = rows.iter().find(|r| !self.catalog.contains_id(&r.medicine_id)) {
            return Err(CoreError::MedicineNotFound(unknown.medicine_id.clone()));
        }

        let now = self.clock.now();
        let (purchase_id, date) = match existing {
            Some(index) => {
                let original = &self.account.purchases[index];
                (original.purchase_id, original.date)
            }
            None => (self.next_purchase_id(), now),
        };

        let total = checked_sum(rows.iter().map(|r| r.net()))?;
        let items = rows
            .iter()
            .map(|r| {
                Ok(PurchaseRowData {
                    net_amount: to_money_f64(r.net()?),
                    ..(*r).clone()
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        let purchase = FinalizedPurchase {
            purchase_id,
            supplier_id: supplier.id.clone(),
            supplier_name: supplier.name.clone(),
            date,
            items,
            total_amount: to_money_f64(total),
        };

        let (refreshed, skipped) = self.post_prices(&purchase, existing.is_some(), now);

        match existing {
            Some(index) => self.account.purchases[index] = purchase.clone(),
            None => self.account.purchases.push(purchase.clone()),
        }
        self.account.purchase.reset();

        info!(
            purchase_id,
            supplier = %purchase.supplier_name,
            items = purchase.items.len(),
            total = purchase.total_amount,
            refreshed = refreshed.len(),
            skipped = skipped.len(),
            "Purchase finalized"
        );
        Ok(PurchasePosting {
            purchase,
            refreshed,
            skipped,
        })
    }

    /// Overwrites account pricing from each row of `purchase`.
    ///
    /// On an edit, a row is skipped when a later purchase also carries that
    /// medicine. Later means a later date, or the same date and a higher id.
    fn post_prices(
        &mut self,
        purchase: &FinalizedPurchase,
        is_edit: bool,
        now: DateTime<Utc>,
    ) -> (Vec<String>, Vec<String>) {
        let mut refreshed = Vec::new();
        let mut skipped = Vec::new();

        for row in &purchase.items {
            let superseded = is_edit
                && self.account.purchases.iter().any(|p| {
                    p.purchase_id != purchase.purchase_id
                        && (p.date, p.purchase_id) > (purchase.date, purchase.purchase_id)
                        && p.items.iter().any(|i| i.medicine_id == row.medicine_id)
                });
            if superseded {
                debug!(medicine = %row.medicine_id, "Later purchase exists, pricing kept");
                skipped.push(row.medicine_id.clone());
                continue;
            }

            let data = self
                .account
                .overrides
                .entry(row.medicine_id.clone())
                .or_default();
            data.price = row.rate;
            data.discount = row.discount;
            data.batch_no = row.batch_no.clone();
            data.last_updated = now;
            refreshed.push(row.medicine_id.clone());
        }
        (refreshed, skipped)
    }

    /// Loads a finalized purchase into the session for editing.
    pub fn edit_purchase(&mut self, purchase_id: u64) -> CoreResult<Option<Discarded>> {
        let purchase = self
            .purchase(purchase_id)
            .ok_or(CoreError::PurchaseNotFound(purchase_id))?;
        let (supplier_id, items) = (purchase.supplier_id.clone(), purchase.items.clone());
        debug!(purchase_id, "Editing purchase");
        Ok(self
            .account
            .purchase
            .start_editing(supplier_id, purchase_id, items))
    }

    /// Drops the purchase in progress and returns the view to show next.
    pub fn cancel_purchase(&mut self) -> View {
        self.account.purchase.cancel()
    }

    /// Deletes a finalized purchase.
    ///
    /// Pricing it posted stays in place; an edit session for it is reset.
    pub fn delete_purchase(&mut self, purchase_id: u64) -> CoreResult<FinalizedPurchase> {
        let index = self
            .account
            .purchases
            .iter()
            .position(|p| p.purchase_id == purchase_id)
            .ok_or(CoreError::PurchaseNotFound(purchase_id))?;
        if self.account.purchase.editing_id() == Some(purchase_id) {
            self.account.purchase.reset();
        }
        info!(purchase_id, "Purchase deleted");
        Ok(self.account.purchases.remove(index))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::tests::{fixed_now, priced_medicine, with_supplier, workspace};
    use crate::clock::FixedClock;
    use crate::types::UserMedicineData;
    use chrono::Duration;
    use std::sync::Arc;

    fn purchase_workspace() -> (Workspace, String) {
        let mut ws = workspace();
        let x = priced_medicine(&mut ws, "Azithral 500", 80.0, 5.0);
        with_supplier(&mut ws, "sup-1", "Mehta Distributors");
        (ws, x)
    }

    fn buy(ws: &mut Workspace, medicine_id: &str, rate: f64, discount: f64, batch: &str) -> PurchasePosting {
        ws.start_purchase("sup-1").unwrap();
        ws.add_purchase_line(medicine_id).unwrap();
        ws.set_purchase_rate(medicine_id, Some(rate)).unwrap();
        ws.set_purchase_discount(medicine_id, Some(discount)).unwrap();
        ws.set_purchase_batch_no(medicine_id, batch).unwrap();
        ws.finalize_purchase().unwrap()
    }

    #[test]
    fn test_posting_overwrites_account_pricing() {
        let (mut ws, x) = purchase_workspace();
        ws.account.overrides.insert(
            x.clone(),
            UserMedicineData {
                price: Some(999.0),
                discount: Some(40.0),
                sale_discount: Some(3.0),
                batch_no: "OLD".to_string(),
                last_updated: DateTime::<Utc>::default(),
            },
        );

        let posting = buy(&mut ws, &x, 50.0, 10.0, "B1");
        assert_eq!(posting.refreshed, vec![x.clone()]);

        let data = &ws.account.overrides[&x];
        assert_eq!(data.price, Some(50.0));
        assert_eq!(data.discount, Some(10.0));
        assert_eq!(data.batch_no, "B1");
        assert_eq!(data.last_updated, fixed_now());
        // Sale discount is not a purchase field
        assert_eq!(data.sale_discount, Some(3.0));
    }

    #[test]
    fn test_oversized_purchase_values_are_rejected() {
        let (mut ws, x) = purchase_workspace();
        ws.start_purchase("sup-1").unwrap();
        ws.add_purchase_line(&x).unwrap();
        let before = ws.account.purchase.line(&x).unwrap().clone();

        assert!(ws.set_purchase_quantity(&x, 1e15).is_err());
        assert!(ws.set_purchase_rate(&x, Some(1e30)).is_err());
        assert_eq!(ws.account.purchase.line(&x), Some(&before));
        assert_eq!(ws.purchase_total().unwrap(), 76.0);
    }

    #[test]
    fn test_purchase_ids_increment() {
        let (mut ws, x) = purchase_workspace();
        assert_eq!(buy(&mut ws, &x, 50.0, 0.0, "B1").purchase.purchase_id, 1);
        assert_eq!(buy(&mut ws, &x, 52.0, 0.0, "B2").purchase.purchase_id, 2);
        assert_eq!(ws.next_purchase_id(), 3);
    }

    #[test]
    fn test_purchase_net_has_no_tax() {
        let (mut ws, x) = purchase_workspace();
        ws.start_purchase("sup-1").unwrap();
        ws.add_purchase_line(&x).unwrap();
        ws.set_purchase_quantity(&x, 3.0).unwrap();
        ws.set_purchase_rate(&x, Some(50.0)).unwrap();
        ws.set_purchase_discount(&x, Some(10.0)).unwrap();

        assert_eq!(ws.account.purchase.line(&x).unwrap().net_amount, 135.0);
        assert_eq!(ws.purchase_total().unwrap(), 135.0);
    }

    #[test]
    fn test_readding_resets_row() {
        let (mut ws, x) = purchase_workspace();
        ws.start_purchase("sup-1").unwrap();
        ws.add_purchase_line(&x).unwrap();
        ws.set_purchase_quantity(&x, 12.0).unwrap();
        ws.set_purchase_rate(&x, Some(70.0)).unwrap();

        assert_eq!(ws.add_purchase_line(&x).unwrap(), AddLine::Reset);
        let row = ws.account.purchase.line(&x).unwrap();
        assert_eq!(row.quantity, 1.0);
        assert_eq!(row.rate, Some(80.0));
        assert_eq!(ws.account.purchase.lines().len(), 1);
    }

    #[test]
    fn test_zero_quantity_removes_row() {
        let (mut ws, x) = purchase_workspace();
        ws.start_purchase("sup-1").unwrap();
        ws.add_purchase_line(&x).unwrap();
        assert_eq!(ws.set_purchase_quantity(&x, 0.0).unwrap(), LineUpdate::Removed);
        assert!(matches!(ws.finalize_purchase(), Err(CoreError::NoValidItems)));
    }

    #[test]
    fn test_unknown_supplier_is_rejected() {
        let (mut ws, _) = purchase_workspace();
        assert!(matches!(
            ws.start_purchase("nope"),
            Err(CoreError::SupplierNotFound(_))
        ));
    }

    #[test]
    fn test_editing_latest_purchase_refreshes_pricing_and_keeps_date() {
        let (mut ws, x) = purchase_workspace();
        let first = buy(&mut ws, &x, 50.0, 10.0, "B1").purchase;

        ws.clock = Arc::new(FixedClock(fixed_now() + Duration::days(2)));
        ws.edit_purchase(first.purchase_id).unwrap();
        ws.set_purchase_rate(&x, Some(55.0)).unwrap();
        let posting = ws.finalize_purchase().unwrap();

        assert_eq!(posting.purchase.date, first.date);
        assert_eq!(posting.purchase.purchase_id, first.purchase_id);
        assert_eq!(posting.refreshed, vec![x.clone()]);
        assert_eq!(ws.account.overrides[&x].price, Some(55.0));
        assert_eq!(ws.account.purchases.len(), 1);
    }

    #[test]
    fn test_editing_older_purchase_keeps_newer_pricing() {
        let (mut ws, x) = purchase_workspace();
        let old = buy(&mut ws, &x, 50.0, 10.0, "B1").purchase;

        ws.clock = Arc::new(FixedClock(fixed_now() + Duration::days(5)));
        buy(&mut ws, &x, 60.0, 12.0, "B2");

        ws.edit_purchase(old.purchase_id).unwrap();
        ws.set_purchase_quantity(&x, 20.0).unwrap();
        let posting = ws.finalize_purchase().unwrap();

        assert!(posting.refreshed.is_empty());
        assert_eq!(posting.skipped, vec![x.clone()]);
        let data = &ws.account.overrides[&x];
        assert_eq!(data.price, Some(60.0));
        assert_eq!(data.batch_no, "B2");
        assert_eq!(ws.purchase(old.purchase_id).unwrap().items[0].quantity, 20.0);
    }

    #[test]
    fn test_navigating_away_cancels_purchase_edit() {
        let (mut ws, x) = purchase_workspace();
        let p = buy(&mut ws, &x, 50.0, 10.0, "B1").purchase;
        ws.edit_purchase(p.purchase_id).unwrap();

        let cancelled = ws.on_view_change(View::Inventory);
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].editing_id, p.purchase_id);
        assert!(!ws.account.purchase.is_active());
    }

    #[test]
    fn test_cancel_edit_returns_to_history() {
        let (mut ws, x) = purchase_workspace();
        let p = buy(&mut ws, &x, 50.0, 10.0, "B1").purchase;
        ws.edit_purchase(p.purchase_id).unwrap();
        assert_eq!(ws.cancel_purchase(), View::PurchaseHistory);
    }

    #[test]
    fn test_add_by_name_creates_definition() {
        let (mut ws, _) = purchase_workspace();
        ws.start_purchase("sup-1").unwrap();
        ws.add_purchase_line_by_name("Limcee", "Abbott", "Tablet").unwrap();
        let def = ws.catalog.find_by_name("LIMCEE").unwrap().clone();
        assert_eq!(def.company, "Abbott");

        // No price yet, so the row is not valid until a rate is entered
        assert!(matches!(ws.finalize_purchase(), Err(CoreError::NoValidItems)));
        ws.set_purchase_rate(&def.id, Some(20.0)).unwrap();
        ws.finalize_purchase().unwrap();
        assert_eq!(ws.account.overrides[&def.id].price, Some(20.0));
    }

    #[test]
    fn test_delete_purchase_keeps_posted_pricing() {
        let (mut ws, x) = purchase_workspace();
        let p = buy(&mut ws, &x, 50.0, 10.0, "B1").purchase;
        ws.delete_purchase(p.purchase_id).unwrap();
        assert!(ws.account.purchases.is_empty());
        assert_eq!(ws.account.overrides[&x].price, Some(50.0));
    }
}
