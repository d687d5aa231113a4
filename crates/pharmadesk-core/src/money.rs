//! # Money Module
//!
//! Line-item and cart arithmetic for bills and purchases.
//!
//! ## Precision Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WHERE ROUNDING HAPPENS                                                 │
//! │                                                                         │
//! │  f64 input ──► to_decimal ──► line math ──► Σ lines ──► round_money    │
//! │  (JSON)         (exact)        (no rounding)  (no rounding)  (2 places) │
//! │                                                                         │
//! │  Rounding each line first and then summing drifts by a cent every few  │
//! │  dozen lines. Totals are therefore always re-derived from unrounded    │
//! │  line amounts and rounded once, at display or persistence.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Formulas
//! ```text
//! gross          = quantity × rate
//! discountAmount = gross × discount% / 100
//! net            = gross − discountAmount + tax        (bills)
//! net            = gross − discountAmount              (purchases)
//! ```
//!
//! ## Usage
//! ```rust
//! use pharmadesk_core::money::{line_amounts, to_decimal, format_money};
//!
//! # fn main() -> pharmadesk_core::CoreResult<()> {
//! let line = line_amounts(to_decimal(10.0)?, to_decimal(100.0)?, to_decimal(20.0)?, to_decimal(0.0)?)?;
//! assert_eq!(format_money(line.net), "800.00");
//! # Ok(())
//! # }
//! ```
//!
//! Arithmetic is checked: an amount `Decimal` cannot hold is an
//! `AmountOutOfRange` error, never a panic or a silent zero.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Decimal places kept at display and persistence boundaries.
pub const MONEY_DECIMALS: u32 = 2;

// =============================================================================
// Conversion Helpers
// =============================================================================

/// Converts a JSON number to `Decimal` for calculation.
///
/// NaN, infinities and magnitudes beyond `Decimal::MAX` are rejected.
#[inline]
pub fn to_decimal(value: f64) -> CoreResult<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| CoreError::AmountOutOfRange(value.to_string()))
}

/// Converts an optional amount, treating `None` as zero.
#[inline]
pub fn opt_decimal(value: Option<f64>) -> CoreResult<Decimal> {
    value.map_or(Ok(Decimal::ZERO), to_decimal)
}

fn overflow(lhs: Decimal, op: &str, rhs: Decimal) -> CoreError {
    CoreError::AmountOutOfRange(format!("{lhs} {op} {rhs}"))
}

fn mul(lhs: Decimal, rhs: Decimal) -> CoreResult<Decimal> {
    lhs.checked_mul(rhs).ok_or_else(|| overflow(lhs, "×", rhs))
}

/// Checked `lhs + rhs`.
pub fn add_amounts(lhs: Decimal, rhs: Decimal) -> CoreResult<Decimal> {
    lhs.checked_add(rhs).ok_or_else(|| overflow(lhs, "+", rhs))
}

/// Sums amounts, stopping at the first error or overflow.
pub fn checked_sum<I>(values: I) -> CoreResult<Decimal>
where
    I: IntoIterator<Item = CoreResult<Decimal>>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| add_amounts(acc, value?))
}

/// `value × percent / 100`
fn percent_of(value: Decimal, percent: Decimal) -> CoreResult<Decimal> {
    Ok(mul(value, percent)? / Decimal::ONE_HUNDRED)
}

/// Rounds to two places, half away from zero (`toFixed(2)` semantics).
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds and converts back to `f64` for persistence.
#[inline]
pub fn to_money_f64(value: Decimal) -> f64 {
    round_money(value).to_f64().unwrap_or_default()
}

/// Converts to `f64` without rounding, for in-session line fields.
#[inline]
pub fn to_f64_exact(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// Formats an amount with exactly two decimals.
pub fn format_money(value: Decimal) -> String {
    format!("{:.2}", round_money(value))
}

// =============================================================================
// Line Calculation
// =============================================================================

/// Amounts derived for one line, unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineAmounts {
    pub gross: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub net: Decimal,
}

impl LineAmounts {
    /// Adds a tax term on top of the discounted net.
    pub fn with_tax(self, tax_amount: Decimal) -> CoreResult<LineAmounts> {
        Ok(LineAmounts {
            tax_amount: add_amounts(self.tax_amount, tax_amount)?,
            net: add_amounts(self.net, tax_amount)?,
            ..self
        })
    }
}

/// Computes gross, discount and net for a bill line.
///
/// ## Example
/// ```rust
/// use pharmadesk_core::money::{line_amounts, to_decimal};
/// use rust_decimal::Decimal;
///
/// # fn main() -> pharmadesk_core::CoreResult<()> {
/// let line = line_amounts(to_decimal(10.0)?, to_decimal(100.0)?, to_decimal(20.0)?, Decimal::ZERO)?;
/// assert_eq!(line.gross, Decimal::from(1000));
/// assert_eq!(line.discount_amount, Decimal::from(200));
/// assert_eq!(line.net, Decimal::from(800));
/// # Ok(())
/// # }
/// ```
///
/// ## Errors
/// - `AmountOutOfRange` if any intermediate amount overflows `Decimal`
pub fn line_amounts(
    quantity: Decimal,
    rate: Decimal,
    discount_percent: Decimal,
    tax_amount: Decimal,
) -> CoreResult<LineAmounts> {
    let gross = mul(quantity, rate)?;
    let discount_amount = percent_of(gross, discount_percent)?;
    let net = gross
        .checked_sub(discount_amount)
        .ok_or_else(|| overflow(gross, "−", discount_amount))?;
    Ok(LineAmounts {
        gross,
        discount_amount,
        tax_amount,
        net: add_amounts(net, tax_amount)?,
    })
}

/// Net amount of a purchase line. Purchases carry no tax term.
pub fn purchase_line_net(
    quantity: Decimal,
    rate: Decimal,
    discount_percent: Decimal,
) -> CoreResult<Decimal> {
    Ok(line_amounts(quantity, rate, discount_percent, Decimal::ZERO)?.net)
}

/// Resolves the discount for a bill line.
///
/// The line's own value wins, then the medicine's default sale discount,
/// then zero.
#[inline]
pub fn effective_discount(
    line_discount: Option<f64>,
    default_sale_discount: Option<f64>,
) -> CoreResult<Decimal> {
    opt_decimal(line_discount.or(default_sale_discount))
}

/// Sales tax on an already-discounted amount.
#[inline]
pub fn tax_on(taxable: Decimal, tax_percent: Decimal) -> CoreResult<Decimal> {
    percent_of(taxable, tax_percent)
}

// =============================================================================
// Cart Aggregation
// =============================================================================

/// Unrounded aggregate over a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    pub line_count: usize,
    pub gross: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
}

impl Totals {
    /// Sums line amounts in full precision.
    pub fn sum<I>(lines: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = LineAmounts>,
    {
        lines.into_iter().try_fold(Totals::default(), |acc, line| {
            Ok(Totals {
                line_count: acc.line_count + 1,
                gross: add_amounts(acc.gross, line.gross)?,
                discount: add_amounts(acc.discount, line.discount_amount)?,
                tax: add_amounts(acc.tax, line.tax_amount)?,
                grand_total: add_amounts(acc.grand_total, line.net)?,
            })
        })
    }

    /// Sums lines whose amounts are still being derived.
    pub fn try_sum<I>(lines: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = CoreResult<LineAmounts>>,
    {
        let lines = lines.into_iter().collect::<CoreResult<Vec<_>>>()?;
        Totals::sum(lines)
    }
}

/// Rounded totals for API responses and display.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    #[ts(type = "number")]
    pub line_count: usize,
    pub subtotal: f64,
    pub total_discount: f64,
    pub total_tax: f64,
    pub grand_total: f64,
}

impl From<Totals> for CartTotals {
    fn from(totals: Totals) -> Self {
        CartTotals {
            line_count: totals.line_count,
            subtotal: to_money_f64(totals.gross),
            total_discount: to_money_f64(totals.discount),
            total_tax: to_money_f64(totals.tax),
            grand_total: to_money_f64(totals.grand_total),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: f64) -> Decimal {
        to_decimal(v).unwrap()
    }

    #[test]
    fn test_line_amounts_basic() {
        let line = line_amounts(d(10.0), d(100.0), d(20.0), Decimal::ZERO).unwrap();
        assert_eq!(line.gross, Decimal::from(1000));
        assert_eq!(line.discount_amount, Decimal::from(200));
        assert_eq!(line.net, Decimal::from(800));
    }

    #[test]
    fn test_zero_quantity_nets_zero() {
        let line = line_amounts(Decimal::ZERO, d(100.0), d(20.0), Decimal::ZERO).unwrap();
        assert_eq!(line.net, Decimal::ZERO);
    }

    #[test]
    fn test_tax_is_added_after_discount() {
        let line = line_amounts(d(2.0), d(50.0), d(10.0), d(4.5)).unwrap();
        assert_eq!(line.net, d(94.5));
    }

    #[test]
    fn test_purchase_line_net_has_no_tax() {
        let net = purchase_line_net(d(3.0), d(50.0), d(10.0)).unwrap();
        assert_eq!(net, Decimal::from(135));
    }

    #[test]
    fn test_effective_discount_fallbacks() {
        assert_eq!(effective_discount(Some(7.0), Some(3.0)).unwrap(), d(7.0));
        assert_eq!(effective_discount(None, Some(3.0)).unwrap(), d(3.0));
        assert_eq!(effective_discount(None, None).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(format_money(Decimal::new(1005, 3)), "1.01");
        assert_eq!(format_money(Decimal::new(-1005, 3)), "-1.01");
        assert_eq!(format_money(Decimal::from(5)), "5.00");
    }

    /// Summing unrounded lines and rounding once differs from rounding
    /// every line first.
    #[test]
    fn test_totals_round_once() {
        // 1 × 0.335 with no discount, thirty times
        let line =
            line_amounts(Decimal::ONE, Decimal::new(335, 3), Decimal::ZERO, Decimal::ZERO).unwrap();
        let totals = Totals::sum(std::iter::repeat(line).take(30)).unwrap();
        assert_eq!(format_money(totals.grand_total), "10.05");

        let rounded_each: Decimal = std::iter::repeat(round_money(line.net)).take(30).sum();
        assert_eq!(format_money(rounded_each), "10.20");
    }

    #[test]
    fn test_cart_totals_from_totals() {
        let lines = vec![
            line_amounts(d(10.0), d(100.0), d(20.0), Decimal::ZERO),
            line_amounts(d(1.0), d(9.99), Decimal::ZERO, Decimal::ZERO),
        ];
        let totals: CartTotals = Totals::try_sum(lines).unwrap().into();
        assert_eq!(totals.line_count, 2);
        assert_eq!(totals.subtotal, 1009.99);
        assert_eq!(totals.total_discount, 200.0);
        assert_eq!(totals.grand_total, 809.99);
    }

    #[test]
    fn test_unrepresentable_input_is_rejected() {
        for value in [f64::NAN, f64::INFINITY, 1e30] {
            assert!(matches!(to_decimal(value), Err(CoreError::AmountOutOfRange(_))));
        }
        assert!(opt_decimal(Some(1e30)).is_err());
        assert_eq!(opt_decimal(None).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_line_overflow_is_an_error() {
        let err = line_amounts(d(1e15), d(1e15), Decimal::ZERO, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, CoreError::AmountOutOfRange(_)));
        assert!(tax_on(Decimal::MAX, d(50.0)).is_err());
    }
}
