//! # Profit Reports
//!
//! Derived figures over finalized bills and purchases. Nothing here is
//! persisted; reports are recomputed from history on request.
//!
//! ```text
//! per bill item:
//!   revenue = quantity × mrp × (1 − discount/100)          (tax excluded)
//!   cost    = quantity × mrp × (1 − purchaseDiscount/100)
//!   profit  = revenue − cost
//! ```
//!
//! Sums run in full precision; each figure is rounded once on output.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::{
    add_amounts, effective_discount, line_amounts, opt_decimal, to_decimal, to_money_f64,
};
use crate::types::{CartItem, FinalizedBill, FinalizedPurchase};

// =============================================================================
// Inputs and Outputs
// =============================================================================

/// Inclusive date filter; an open end matches everything on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillProfit {
    #[ts(type = "number")]
    pub bill_no: u64,
    pub store_id: String,
    pub store_name: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StoreProfit {
    pub store_id: String,
    pub store_name: String,
    #[ts(type = "number")]
    pub bill_count: usize,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProfitReport {
    pub range: DateRange,
    #[ts(type = "number")]
    pub bill_count: usize,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    /// Profit as a percentage of revenue; zero without revenue.
    pub margin_percent: f64,
    pub by_store: Vec<StoreProfit>,
    pub bills: Vec<BillProfit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPurchaseTotal {
    pub supplier_id: String,
    pub supplier_name: String,
    #[ts(type = "number")]
    pub purchase_count: usize,
    pub total_amount: f64,
}

// =============================================================================
// Calculations
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct Figures {
    revenue: Decimal,
    cost: Decimal,
}

impl Figures {
    fn add(&mut self, other: Figures) -> CoreResult<()> {
        self.revenue = add_amounts(self.revenue, other.revenue)?;
        self.cost = add_amounts(self.cost, other.cost)?;
        Ok(())
    }

    fn profit(&self) -> Decimal {
        self.revenue - self.cost
    }
}

fn item_figures(item: &CartItem) -> CoreResult<Figures> {
    let quantity = to_decimal(item.quantity)?;
    let rate = opt_decimal(item.mrp)?;
    let sale = line_amounts(
        quantity,
        rate,
        effective_discount(item.discount_value, item.medicine.sale_discount)?,
        Decimal::ZERO,
    )?;
    let cost = line_amounts(quantity, rate, opt_decimal(item.purchase_discount)?, Decimal::ZERO)?;
    Ok(Figures {
        revenue: sale.net,
        cost: cost.net,
    })
}

fn bill_figures(bill: &FinalizedBill) -> CoreResult<Figures> {
    let mut acc = Figures::default();
    for item in &bill.items {
        acc.add(item_figures(item)?)?;
    }
    Ok(acc)
}

/// Revenue, cost and profit of one bill.
pub fn bill_profit(bill: &FinalizedBill) -> CoreResult<BillProfit> {
    let figures = bill_figures(bill)?;
    Ok(BillProfit {
        bill_no: bill.bill_no,
        store_id: bill.store_id.clone(),
        store_name: bill.store_name.clone(),
        date: bill.date,
        revenue: to_money_f64(figures.revenue),
        cost: to_money_f64(figures.cost),
        profit: to_money_f64(figures.profit()),
    })
}

/// Profit over the bills in `range`, overall and per store.
///
/// Bills are listed newest first. Stores are ordered by profit, highest
/// first, and carry the name from their most recent bill.
pub fn profit_report(bills: &[FinalizedBill], range: DateRange) -> CoreResult<ProfitReport> {
    let mut selected: Vec<&FinalizedBill> = bills.iter().filter(|b| range.contains(b.date)).collect();
    selected.sort_by(|a, b| (b.date, b.bill_no).cmp(&(a.date, a.bill_no)));

    let mut total = Figures::default();
    let mut stores: BTreeMap<&str, (String, usize, Figures)> = BTreeMap::new();
    for bill in &selected {
        let figures = bill_figures(bill)?;
        total.add(figures)?;
        let entry = stores
            .entry(bill.store_id.as_str())
            .or_insert_with(|| (bill.store_name.clone(), 0, Figures::default()));
        entry.1 += 1;
        entry.2.add(figures)?;
    }

    let mut by_store: Vec<StoreProfit> = stores
        .into_iter()
        .map(|(id, (name, count, figures))| StoreProfit {
            store_id: id.to_string(),
            store_name: name,
            bill_count: count,
            revenue: to_money_f64(figures.revenue),
            cost: to_money_f64(figures.cost),
            profit: to_money_f64(figures.profit()),
        })
        .collect();
    by_store.sort_by(|a, b| b.profit.total_cmp(&a.profit));

    let margin = if total.revenue.is_zero() {
        Decimal::ZERO
    } else {
        total.profit() * Decimal::ONE_HUNDRED / total.revenue
    };

    Ok(ProfitReport {
        range,
        bill_count: selected.len(),
        revenue: to_money_f64(total.revenue),
        cost: to_money_f64(total.cost),
        profit: to_money_f64(total.profit()),
        margin_percent: to_money_f64(margin),
        by_store,
        bills: selected
            .into_iter()
            .map(bill_profit)
            .collect::<CoreResult<Vec<_>>>()?,
    })
}

/// Purchase totals grouped by supplier, largest first.
pub fn purchase_totals_by_supplier(
    purchases: &[FinalizedPurchase],
    range: DateRange,
) -> CoreResult<Vec<SupplierPurchaseTotal>> {
    let mut newest_first: Vec<&FinalizedPurchase> =
        purchases.iter().filter(|p| range.contains(p.date)).collect();
    newest_first.sort_by(|a, b| (b.date, b.purchase_id).cmp(&(a.date, a.purchase_id)));

    let mut groups: BTreeMap<&str, (String, usize, Decimal)> = BTreeMap::new();
    for purchase in newest_first {
        let entry = groups
            .entry(purchase.supplier_id.as_str())
            .or_insert_with(|| (purchase.supplier_name.clone(), 0, Decimal::ZERO));
        entry.1 += 1;
        entry.2 = add_amounts(entry.2, to_decimal(purchase.total_amount)?)?;
    }

    let mut totals: Vec<SupplierPurchaseTotal> = groups
        .into_iter()
        .map(|(id, (name, count, amount))| SupplierPurchaseTotal {
            supplier_id: id.to_string(),
            supplier_name: name,
            purchase_count: count,
            total_amount: to_money_f64(amount),
        })
        .collect();
    totals.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));
    Ok(totals)
}

// =============================================================================
// Unit Tests
// =============================================================================
