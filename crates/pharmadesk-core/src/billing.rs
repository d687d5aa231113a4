//! # Billing
//!
//! Bill composition against a medical store and bill finalization.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  start_bill(store) ──► add_bill_line(medicine) ──► set_bill_quantity    │
//! │         │                     │                      (≤ 0 removes)      │
//! │         │                     └─ already on bill: no-op + notice        │
//! │         ▼                                                               │
//! │  finalize_bill(no)                                                      │
//! │   ├── number positive, unique on create                                 │
//! │   ├── at least one line with quantity > 0 and a rate                    │
//! │   ├── store name/address snapshotted                                    │
//! │   └── amounts rounded to 2 places, session reset                        │
//! │                                                                         │
//! │  edit_bill(no) loads a finalized bill back into the session; finalize   │
//! │  then replaces it in place and keeps its original date.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::account::Workspace;
use crate::error::{CoreError, CoreResult};
use crate::money::{
    effective_discount, line_amounts, opt_decimal, tax_on, to_decimal, to_f64_exact,
    to_money_f64, CartTotals, LineAmounts, Totals,
};
use crate::session::{AddLine, Discarded, LineUpdate, Session, SessionKind, SessionLine, View};
use crate::types::{BillLayoutSettings, CartItem, FinalizedBill, Medicine, SalesSettings};
use crate::validation::{
    validate_bill_number, validate_medicine_name, validate_optional_percentage,
    validate_optional_rate, validate_percentage, validate_quantity,
};

/// The in-progress bill.
pub type BillingSession = Session<CartItem>;

impl Default for Session<CartItem> {
    fn default() -> Self {
        Session::new(SessionKind::Billing)
    }
}

// =============================================================================
// Cart Lines
// =============================================================================

impl SessionLine for CartItem {
    fn medicine_id(&self) -> &str {
        &self.medicine.id
    }

    /// Counts on finalize only with a positive quantity and a rate.
    fn is_valid(&self) -> bool {
        self.quantity > 0.0 && self.mrp.is_some()
    }
}

impl CartItem {
    /// A new line for `medicine`, quantity 1, with rate and discounts
    /// snapshotted from the account's current pricing.
    pub fn from_medicine(medicine: Medicine, sales: &SalesSettings) -> CoreResult<Self> {
        let mut item = CartItem {
            quantity: 1.0,
            discount_value: medicine.sale_discount,
            purchase_discount: medicine.discount,
            mrp: medicine.price,
            calculated_discount_amount: 0.0,
            net_amount: 0.0,
            sales_tax_amount: None,
            medicine,
        };
        item.recalculate(sales)?;
        Ok(item)
    }

    /// Unrounded amounts for this line.
    ///
    /// A missing rate counts as zero. Sales tax, when enabled, applies to the
    /// discounted amount.
    pub fn amounts(&self, sales: &SalesSettings) -> CoreResult<LineAmounts> {
        let base = line_amounts(
            to_decimal(self.quantity)?,
            opt_decimal(self.mrp)?,
            effective_discount(self.discount_value, self.medicine.sale_discount)?,
            Decimal::ZERO,
        )?;
        if !sales.sales_tax_enabled {
            return Ok(base);
        }
        let tax = tax_on(base.net, to_decimal(sales.sales_tax_percent)?)?;
        base.with_tax(tax)
    }

    /// Refreshes the derived amount fields.
    pub fn recalculate(&mut self, sales: &SalesSettings) -> CoreResult<()> {
        let amounts = self.amounts(sales)?;
        self.calculated_discount_amount = to_f64_exact(amounts.discount_amount);
        self.net_amount = to_f64_exact(amounts.net);
        self.sales_tax_amount = sales
            .sales_tax_enabled
            .then(|| to_f64_exact(amounts.tax_amount));
        Ok(())
    }

    /// The persisted form: derived amounts rounded to 2 places.
    fn rounded(&self, sales: &SalesSettings) -> CoreResult<CartItem> {
        let amounts = self.amounts(sales)?;
        Ok(CartItem {
            calculated_discount_amount: to_money_f64(amounts.discount_amount),
            net_amount: to_money_f64(amounts.net),
            sales_tax_amount: sales
                .sales_tax_enabled
                .then(|| to_money_f64(amounts.tax_amount)),
            ..self.clone()
        })
    }
}

// =============================================================================
// Session Operations
// =============================================================================

impl Session<CartItem> {
    fn require_active(&self) -> CoreResult<()> {
        if self.counterparty_id().is_none() {
            return Err(CoreError::NoActiveSession {
                session: SessionKind::Billing,
            });
        }
        Ok(())
    }

    /// Adds a medicine. A medicine already on the bill is left untouched.
    pub fn add_medicine(&mut self, medicine: Medicine, sales: &SalesSettings) -> CoreResult<AddLine> {
        self.require_active()?;
        if self.contains(&medicine.id) {
            return Ok(AddLine::AlreadyPresent);
        }
        self.push_line(CartItem::from_medicine(medicine, sales)?);
        Ok(AddLine::Added)
    }

    /// Sets a line's quantity; zero or below deletes the line.
    pub fn set_quantity(
        &mut self,
        medicine_id: &str,
        quantity: f64,
        sales: &SalesSettings,
    ) -> CoreResult<LineUpdate> {
        validate_quantity(quantity)?;
        if !self.contains(medicine_id) {
            return Err(CoreError::NotInCart(medicine_id.to_string()));
        }
        if quantity <= 0.0 {
            self.remove_line(medicine_id);
            return Ok(LineUpdate::Removed);
        }
        self.update_line(medicine_id, sales, |line| line.quantity = quantity)?;
        Ok(LineUpdate::Updated)
    }

    /// Overrides the sale discount % for one line.
    pub fn set_discount(
        &mut self,
        medicine_id: &str,
        discount: Option<f64>,
        sales: &SalesSettings,
    ) -> CoreResult<()> {
        validate_optional_percentage("discount", discount)?;
        self.update_line(medicine_id, sales, |line| line.discount_value = discount)
    }

    /// Sets the rate billed for one line.
    pub fn set_rate(
        &mut self,
        medicine_id: &str,
        rate: Option<f64>,
        sales: &SalesSettings,
    ) -> CoreResult<()> {
        validate_optional_rate(rate)?;
        self.update_line(medicine_id, sales, |line| line.mrp = rate)
    }

    /// Re-derives every line, after sales settings change.
    pub fn recalculate_all(&mut self, sales: &SalesSettings) -> CoreResult<()> {
        for line in self.lines_mut() {
            line.recalculate(sales)?;
        }
        Ok(())
    }

    /// Points lines at new catalog ids. Lines that land on a medicine already
    /// present are dropped.
    pub fn remap_medicine_ids(&mut self, remap: &HashMap<String, String>) -> usize {
        self.remap_medicines(remap, |line| &mut line.medicine.id)
    }

    /// Full-precision totals over lines with a positive quantity.
    pub fn totals(&self, sales: &SalesSettings) -> CoreResult<Totals> {
        Totals::try_sum(
            self.lines()
                .iter()
                .filter(|l| l.quantity > 0.0)
                .map(|l| l.amounts(sales)),
        )
    }

    /// Applies `edit` to a copy of the line; the session only changes if the
    /// edited line's amounts can be derived.
    fn update_line<F>(&mut self, medicine_id: &str, sales: &SalesSettings, edit: F) -> CoreResult<()>
    where
        F: FnOnce(&mut CartItem),
    {
        let mut edited = self
            .line(medicine_id)
            .ok_or_else(|| CoreError::NotInCart(medicine_id.to_string()))?
            .clone();
        edit(&mut edited);
        edited.recalculate(sales)?;
        if let Some(line) = self.line_mut(medicine_id) {
            *line = edited;
        }
        Ok(())
    }
}

// =============================================================================
// Workspace Operations
// =============================================================================

impl Workspace {
    /// Next free bill number: highest existing + 1.
    pub fn suggest_bill_number(&self) -> u64 {
        self.account
            .bills
            .iter()
            .map(|b| b.bill_no)
            .max()
            .map_or(1, |n| n + 1)
    }

    pub fn bill(&self, bill_no: u64) -> Option<&FinalizedBill> {
        self.account.bills.iter().find(|b| b.bill_no == bill_no)
    }

    /// Starts billing a store, discarding any other bill in progress.
    pub fn start_bill(&mut self, store_id: &str) -> CoreResult<Option<Discarded>> {
        if !self.account.stores.iter().any(|s| s.id == store_id) {
            return Err(CoreError::StoreNotFound(store_id.to_string()));
        }
        let discarded = self.account.billing.start(store_id);
        if let Some(d) = &discarded {
            info!(
                previous = ?d.counterparty_id,
                lines = d.line_count,
                "Discarded bill in progress"
            );
        }
        Ok(discarded)
    }

    /// Adds an inventory medicine to the current bill.
    pub fn add_bill_line(&mut self, medicine_id: &str) -> CoreResult<AddLine> {
        let medicine = self
            .medicine(medicine_id)
            .ok_or_else(|| CoreError::MedicineNotFound(medicine_id.to_string()))?;
        self.account.billing.add_medicine(medicine, &self.account.sales)
    }

    /// Adds a line by name, creating the catalog definition if it is new.
    pub fn add_bill_line_by_name(
        &mut self,
        name: &str,
        company: &str,
        medicine_type: &str,
    ) -> CoreResult<AddLine> {
        let name = validate_medicine_name(name)?;
        self.account.billing.require_active()?;

        let resolution = self.catalog.resolve_or_create(
            self.ids.as_ref(),
            &name,
            company,
            medicine_type,
            &BTreeSet::new(),
        );
        if resolution.created {
            info!(id = %resolution.id, %name, "Created catalog definition from bill");
        }
        self.add_bill_line(&resolution.id)
    }

    pub fn set_bill_quantity(&mut self, medicine_id: &str, quantity: f64) -> CoreResult<LineUpdate> {
        self.account
            .billing
            .set_quantity(medicine_id, quantity, &self.account.sales)
    }

    pub fn set_bill_discount(&mut self, medicine_id: &str, discount: Option<f64>) -> CoreResult<()> {
        self.account
            .billing
            .set_discount(medicine_id, discount, &self.account.sales)
    }

    pub fn set_bill_rate(&mut self, medicine_id: &str, rate: Option<f64>) -> CoreResult<()> {
        self.account
            .billing
            .set_rate(medicine_id, rate, &self.account.sales)
    }

    pub fn remove_bill_line(&mut self, medicine_id: &str) -> CoreResult<()> {
        if !self.account.billing.remove_line(medicine_id) {
            return Err(CoreError::NotInCart(medicine_id.to_string()));
        }
        Ok(())
    }

    /// Rounded totals of the bill in progress.
    pub fn bill_totals(&self) -> CoreResult<CartTotals> {
        Ok(self.account.billing.totals(&self.account.sales)?.into())
    }

    /// Replaces the sales tax settings and re-derives the open bill.
    pub fn update_sales_settings(&mut self, settings: SalesSettings) -> CoreResult<()> {
        validate_percentage("sales tax", settings.sales_tax_percent)?;
        let mut billing = self.account.billing.clone();
        billing.recalculate_all(&settings)?;
        self.account.sales = settings;
        self.account.billing = billing;
        Ok(())
    }

    /// Replaces the printed header and footer. Text fields are trimmed.
    pub fn update_bill_layout(&mut self, layout: BillLayoutSettings) -> &BillLayoutSettings {
        self.account.bill_layout = BillLayoutSettings {
            business_name: layout.business_name.trim().to_string(),
            business_address: layout.business_address.trim().to_string(),
            business_phone: layout.business_phone.trim().to_string(),
            license_no: layout.license_no.trim().to_string(),
            footer_note: layout.footer_note.trim().to_string(),
            ..layout
        };
        &self.account.bill_layout
    }

    /// Validates and persists the bill in progress, then resets the session.
    ///
    /// ## Errors
    /// - `Validation` if `bill_no` is not positive
    /// - `NoActiveSession` if no store is selected
    /// - `StoreNotFound` if the store was deleted meanwhile
    /// - `DuplicateBillNumber` if the number belongs to another bill
    /// - `NoValidItems` if no line has a quantity and a rate
    pub fn finalize_bill(&mut self, bill_no: i64) -> CoreResult<FinalizedBill> {
        let bill_no = validate_bill_number(bill_no)?;
        let session = &self.account.billing;
        let store_id = session
            .counterparty_id()
            .ok_or(CoreError::NoActiveSession {
                session: SessionKind::Billing,
            })?;
        let store = self
            .account
            .stores
            .iter()
            .find(|s| s.id == store_id)
            .ok_or_else(|| CoreError::StoreNotFound(store_id.to_string()))?;

        // Editing may keep its own number; any other collision is rejected
        let editing = session.editing_id();
        let existing = match editing {
            Some(original) => Some(
                self.account
                    .bills
                    .iter()
                    .position(|b| b.bill_no == original)
                    .ok_or(CoreError::BillNotFound(original))?,
            ),
            None => None,
        };
        if self
            .account
            .bills
            .iter()
            .any(|b| b.bill_no == bill_no && Some(b.bill_no) != editing)
        {
            return Err(CoreError::DuplicateBillNumber(bill_no));
        }

        let sales = &self.account.sales;
        let lines: Vec<&CartItem> = session.valid_lines().collect();
        if lines.is_empty() {
            return Err(CoreError::NoValidItems);
        }
        let totals = Totals::try_sum(lines.iter().map(|l| l.amounts(sales)))?;
        let items = lines
            .iter()
            .map(|l| l.rounded(sales))
            .collect::<CoreResult<Vec<_>>>()?;

        let date = match existing {
            Some(index) => self.account.bills[index].date,
            None => self.clock.now(),
        };
        let bill = FinalizedBill {
            bill_no,
            store_id: store.id.clone(),
            store_name: store.name.clone(),
            store_address: store.address.clone(),
            date,
            items,
            subtotal: to_money_f64(totals.gross),
            total_discount: to_money_f64(totals.discount),
            total_tax: to_money_f64(totals.tax),
            grand_total: to_money_f64(totals.grand_total),
        };

        match existing {
            Some(index) => self.account.bills[index] = bill.clone(),
            None => self.account.bills.push(bill.clone()),
        }
        self.account.billing.reset();

        info!(
            bill_no,
            store = %bill.store_name,
            items = bill.items.len(),
            grand_total = bill.grand_total,
            edited = editing.is_some(),
            "Bill finalized"
        );
        Ok(bill)
    }

    /// Loads a finalized bill into the session for editing.
    pub fn edit_bill(&mut self, bill_no: u64) -> CoreResult<Option<Discarded>> {
        let bill = self.bill(bill_no).ok_or(CoreError::BillNotFound(bill_no))?;
        let (store_id, items) = (bill.store_id.clone(), bill.items.clone());
        debug!(bill_no, "Editing bill");
        Ok(self.account.billing.start_editing(store_id, bill_no, items))
    }

    /// Drops the bill in progress and returns the view to show next.
    pub fn cancel_bill(&mut self) -> View {
        self.account.billing.cancel()
    }

    /// Deletes a finalized bill. An edit session for it is reset too.
    pub fn delete_bill(&mut self, bill_no: u64) -> CoreResult<FinalizedBill> {
        let index = self
            .account
            .bills
            .iter()
            .position(|b| b.bill_no == bill_no)
            .ok_or(CoreError::BillNotFound(bill_no))?;
        if self.account.billing.editing_id() == Some(bill_no) {
            self.account.billing.reset();
        }
        info!(bill_no, "Bill deleted");
        Ok(self.account.bills.remove(index))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::tests::{fixed_now, priced_medicine, with_store, workspace};
    use chrono::Duration;

    fn billing_workspace() -> (Workspace, String, String) {
        let mut ws = workspace();
        let a = priced_medicine(&mut ws, "Augmentin 625", 100.0, 12.0);
        let b = priced_medicine(&mut ws, "Pan 40", 50.0, 8.0);
        with_store(&mut ws, "s1", "City Pharma");
        with_store(&mut ws, "s2", "Lake Chemists");
        (ws, a, b)
    }

    #[test]
    fn test_ten_at_hundred_with_twenty_percent_nets_eight_hundred() {
        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();
        ws.set_bill_quantity(&a, 10.0).unwrap();
        ws.set_bill_discount(&a, Some(20.0)).unwrap();

        let line = ws.account.billing.line(&a).unwrap();
        assert_eq!(line.calculated_discount_amount, 200.0);
        assert_eq!(line.net_amount, 800.0);

        let totals = ws.bill_totals().unwrap();
        assert_eq!(totals.subtotal, 1000.0);
        assert_eq!(totals.grand_total, 800.0);
    }

    #[test]
    fn test_new_line_snapshots_pricing() {
        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();

        let line = ws.account.billing.line(&a).unwrap();
        assert_eq!(line.quantity, 1.0);
        assert_eq!(line.mrp, Some(100.0));
        assert_eq!(line.purchase_discount, Some(12.0));
    }

    #[test]
    fn test_adding_twice_is_a_no_op() {
        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        assert_eq!(ws.add_bill_line(&a).unwrap(), AddLine::Added);
        ws.set_bill_quantity(&a, 4.0).unwrap();
        assert_eq!(ws.add_bill_line(&a).unwrap(), AddLine::AlreadyPresent);
        assert_eq!(ws.account.billing.line(&a).unwrap().quantity, 4.0);
    }

    #[test]
    fn test_adding_without_store_is_rejected() {
        let (mut ws, a, _) = billing_workspace();
        let err = ws.add_bill_line(&a).unwrap_err();
        assert!(matches!(err, CoreError::NoActiveSession { .. }));
    }

    #[test]
    fn test_zero_or_negative_quantity_removes_line() {
        let (mut ws, a, b) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();
        ws.add_bill_line(&b).unwrap();

        assert_eq!(ws.set_bill_quantity(&a, 0.0).unwrap(), LineUpdate::Removed);
        assert_eq!(ws.set_bill_quantity(&b, -1.0).unwrap(), LineUpdate::Removed);
        assert!(ws.account.billing.lines().is_empty());
        assert_eq!(ws.bill_totals().unwrap().grand_total, 0.0);
    }

    #[test]
    fn test_out_of_range_amounts_leave_line_untouched() {
        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();
        ws.set_bill_quantity(&a, 3.0).unwrap();
        let before = ws.account.billing.line(&a).unwrap().clone();

        assert!(matches!(
            ws.set_bill_quantity(&a, 1e15),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            ws.set_bill_rate(&a, Some(1e30)),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(ws.account.billing.line(&a), Some(&before));
        assert_eq!(ws.bill_totals().unwrap().grand_total, 300.0);
    }

    #[test]
    fn test_largest_quantity_at_largest_rate_is_computed() {
        use crate::validation::{MAX_QUANTITY, MAX_RATE};

        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();
        ws.set_bill_rate(&a, Some(MAX_RATE)).unwrap();
        ws.set_bill_quantity(&a, MAX_QUANTITY).unwrap();
        ws.set_bill_discount(&a, Some(0.0)).unwrap();
        ws.update_sales_settings(SalesSettings {
            sales_tax_enabled: true,
            sales_tax_percent: 100.0,
        })
        .unwrap();

        let totals = ws.bill_totals().unwrap();
        assert_eq!(totals.subtotal, MAX_QUANTITY * MAX_RATE);
        assert_eq!(totals.grand_total, 2.0 * MAX_QUANTITY * MAX_RATE);
    }

    #[test]
    fn test_unrepresentable_line_values_surface_as_errors() {
        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();
        // Only reachable through a tampered persisted session
        ws.account.billing.line_mut(&a).unwrap().mrp = Some(1e30);

        assert!(matches!(
            ws.bill_totals(),
            Err(CoreError::AmountOutOfRange(_))
        ));
        assert!(matches!(
            ws.finalize_bill(1),
            Err(CoreError::AmountOutOfRange(_))
        ));
        assert!(ws.account.bills.is_empty());
    }

    #[test]
    fn test_switching_store_discards_cart() {
        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();

        let discarded = ws.start_bill("s2").unwrap().unwrap();
        assert_eq!(discarded.counterparty_id.as_deref(), Some("s1"));
        assert_eq!(ws.account.billing.counterparty_id(), Some("s2"));
        assert!(!ws.account.billing.contains(&a));
    }

    #[test]
    fn test_finalize_snapshots_store_and_resets_session() {
        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();
        ws.set_bill_quantity(&a, 3.0).unwrap();

        let bill = ws.finalize_bill(1).unwrap();
        assert_eq!(bill.store_name, "City Pharma");
        assert_eq!(bill.store_address, "City Pharma Road");
        assert_eq!(bill.date, fixed_now());
        assert_eq!(bill.grand_total, 300.0);
        assert!(!ws.account.billing.is_active());
        assert_eq!(ws.suggest_bill_number(), 2);
    }

    #[test]
    fn test_finalize_excludes_lines_without_rate() {
        let (mut ws, a, b) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();
        ws.add_bill_line(&b).unwrap();
        ws.set_bill_rate(&b, None).unwrap();

        let bill = ws.finalize_bill(1).unwrap();
        assert_eq!(bill.items.len(), 1);
        assert_eq!(bill.items[0].medicine.id, a);
    }

    #[test]
    fn test_finalize_without_valid_lines_is_rejected_and_keeps_session() {
        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();
        ws.set_bill_rate(&a, None).unwrap();

        assert!(matches!(ws.finalize_bill(1), Err(CoreError::NoValidItems)));
        assert!(ws.account.bills.is_empty());
        assert!(ws.account.billing.contains(&a));
    }

    #[test]
    fn test_bill_number_must_be_positive() {
        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();
        assert!(matches!(ws.finalize_bill(0), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_duplicate_number_rejected_on_create_allowed_on_edit() {
        let (mut ws, a, b) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();
        let original = ws.finalize_bill(5).unwrap();

        ws.start_bill("s2").unwrap();
        ws.add_bill_line(&b).unwrap();
        assert!(matches!(
            ws.finalize_bill(5),
            Err(CoreError::DuplicateBillNumber(5))
        ));

        // Edit #5 in place, on a later day
        ws.clock = std::sync::Arc::new(crate::clock::FixedClock(fixed_now() + Duration::days(3)));
        ws.edit_bill(5).unwrap();
        ws.set_bill_quantity(&a, 2.0).unwrap();
        let edited = ws.finalize_bill(5).unwrap();

        assert_eq!(ws.account.bills.len(), 1);
        assert_eq!(edited.date, original.date);
        assert_eq!(edited.grand_total, 200.0);
    }

    #[test]
    fn test_edit_cannot_take_another_bills_number() {
        let (mut ws, a, _) = billing_workspace();
        for n in [1, 2] {
            ws.start_bill("s1").unwrap();
            ws.add_bill_line(&a).unwrap();
            ws.finalize_bill(n).unwrap();
        }
        ws.edit_bill(2).unwrap();
        assert!(matches!(
            ws.finalize_bill(1),
            Err(CoreError::DuplicateBillNumber(1))
        ));
    }

    #[test]
    fn test_cancel_edit_returns_to_history() {
        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();
        ws.finalize_bill(1).unwrap();

        ws.edit_bill(1).unwrap();
        assert_eq!(ws.cancel_bill(), View::BillHistory);
        ws.start_bill("s1").unwrap();
        assert_eq!(ws.cancel_bill(), View::Billing);
    }

    #[test]
    fn test_sales_tax_applies_after_discount() {
        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();
        ws.set_bill_quantity(&a, 2.0).unwrap();
        ws.set_bill_discount(&a, Some(10.0)).unwrap();
        ws.update_sales_settings(SalesSettings {
            sales_tax_enabled: true,
            sales_tax_percent: 5.0,
        })
        .unwrap();

        let line = ws.account.billing.line(&a).unwrap();
        assert_eq!(line.sales_tax_amount, Some(9.0));
        assert_eq!(line.net_amount, 189.0);
        assert_eq!(ws.bill_totals().unwrap().total_tax, 9.0);
    }

    #[test]
    fn test_totals_round_once() {
        let (mut ws, _, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        let ids: Vec<String> = (0..3)
            .map(|i| priced_medicine(&mut ws, &format!("Syrup {i}"), 3.125, 0.0))
            .collect();
        for id in &ids {
            ws.add_bill_line(id).unwrap();
        }
        // 3 × 3.125 = 9.375 → 9.38, not 3 × 3.13
        assert_eq!(ws.bill_totals().unwrap().grand_total, 9.38);

        let bill = ws.finalize_bill(1).unwrap();
        assert_eq!(bill.grand_total, 9.38);
        assert_eq!(bill.items[0].net_amount, 3.13);
    }

    #[test]
    fn test_add_by_name_reuses_existing_definition() {
        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line_by_name("  augmentin 625 ", "", "").unwrap();
        assert!(ws.account.billing.contains(&a));

        ws.add_bill_line_by_name("Crocin", "GSK", "Tablet").unwrap();
        assert_eq!(ws.catalog.len(), 3);
        let crocin = ws.catalog.find_by_name("crocin").unwrap();
        assert!(ws.account.billing.contains(&crocin.id));
    }

    #[test]
    fn test_add_by_name_validates_before_creating() {
        let (mut ws, _, _) = billing_workspace();
        assert!(ws.add_bill_line_by_name("   ", "", "").is_err());

        // No active bill: nothing is added to the catalog
        assert!(ws.add_bill_line_by_name("Crocin", "", "").is_err());
        assert_eq!(ws.catalog.len(), 2);
    }

    #[test]
    fn test_delete_bill_resets_its_edit_session() {
        let (mut ws, a, _) = billing_workspace();
        ws.start_bill("s1").unwrap();
        ws.add_bill_line(&a).unwrap();
        ws.finalize_bill(7).unwrap();
        ws.edit_bill(7).unwrap();

        ws.delete_bill(7).unwrap();
        assert!(ws.account.bills.is_empty());
        assert!(!ws.account.billing.is_active());
        assert!(matches!(ws.delete_bill(7), Err(CoreError::BillNotFound(7))));
    }

    #[test]
    fn test_bill_layout_is_trimmed() {
        let mut ws = workspace();
        let layout = ws.update_bill_layout(BillLayoutSettings {
            business_name: "  City Pharma ".into(),
            show_batch_no: true,
            ..Default::default()
        });
        assert_eq!(layout.business_name, "City Pharma");
        assert!(layout.show_batch_no);
    }

    #[test]
    fn test_suggest_bill_number_starts_at_one() {
        let ws = workspace();
        assert_eq!(ws.suggest_bill_number(), 1);
    }
}
