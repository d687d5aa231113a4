//! # Validation Module
//!
//! Input validation run before any state is touched.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend (TypeScript)                                        │
//! │  └── Immediate feedback on empty fields                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Command layer (Rust)                                         │
//! │  └── THIS MODULE: names, numbers, percentages                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Domain operations                                            │
//! │  └── Uniqueness (bill numbers, medicine names), valid-line checks     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pharmadesk_core::validation::{validate_medicine_name, validate_bill_number};
//!
//! assert!(validate_medicine_name("Paracetamol 500").is_ok());
//! assert!(validate_bill_number(0).is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted name for medicines and counterparties.
pub const MAX_NAME_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

fn validate_name(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(value.to_string())
}

/// Validates a medicine name and returns it trimmed.
///
/// The identity resolver must only ever see names that passed this check.
///
/// ## Example
/// ```rust
/// use pharmadesk_core::validation::validate_medicine_name;
///
/// assert_eq!(validate_medicine_name("  Cetirizine ").unwrap(), "Cetirizine");
/// assert!(validate_medicine_name("   ").is_err());
/// ```
pub fn validate_medicine_name(name: &str) -> ValidationResult<String> {
    validate_name("medicine name", name)
}

/// Validates a medical store or supplier name and returns it trimmed.
pub fn validate_counterparty_name(name: &str) -> ValidationResult<String> {
    validate_name("name", name)
}

// =============================================================================
// Numeric Validators
// =============================================================================

fn require_finite(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    Ok(())
}

/// Validates a user-supplied bill number.
///
/// ## Rules
/// - Must be positive (> 0)
///
/// Uniqueness is checked by the billing operations, since editing a bill in
/// place may keep its own number.
pub fn validate_bill_number(bill_no: i64) -> ValidationResult<u64> {
    if bill_no <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "bill number".to_string(),
        });
    }
    Ok(bill_no as u64)
}

/// Largest quantity a single line may carry.
pub const MAX_QUANTITY: f64 = 1_000_000.0;

/// Largest rate or price per unit.
///
/// `MAX_QUANTITY × MAX_RATE` plus tax stays far inside `Decimal`'s range,
/// so line arithmetic on validated values cannot overflow.
pub const MAX_RATE: f64 = 100_000_000.0;

/// Validates a line quantity.
///
/// Zero and negatives are accepted: they are the removal path for lines.
/// Positive quantities are capped at [`MAX_QUANTITY`].
pub fn validate_quantity(quantity: f64) -> ValidationResult<()> {
    require_finite("quantity", quantity)?;
    if quantity > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0.0,
            max: MAX_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a rate or price.
///
/// ## Rules
/// - Must be finite
/// - `0 ≤ rate ≤ MAX_RATE`
pub fn validate_rate(rate: f64) -> ValidationResult<()> {
    require_finite("rate", rate)?;
    if !(0.0..=MAX_RATE).contains(&rate) {
        return Err(ValidationError::OutOfRange {
            field: "rate".to_string(),
            min: 0.0,
            max: MAX_RATE,
        });
    }
    Ok(())
}

/// Validates a discount or tax percentage (0 to 100 inclusive).
pub fn validate_percentage(field: &str, percent: f64) -> ValidationResult<()> {
    require_finite(field, percent)?;
    if !(0.0..=100.0).contains(&percent) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0.0,
            max: 100.0,
        });
    }
    Ok(())
}

/// Validates an optional percentage.
pub fn validate_optional_percentage(field: &str, percent: Option<f64>) -> ValidationResult<()> {
    match percent {
        Some(p) => validate_percentage(field, p),
        None => Ok(()),
    }
}

/// Validates an optional rate.
pub fn validate_optional_rate(rate: Option<f64>) -> ValidationResult<()> {
    match rate {
        Some(r) => validate_rate(r),
        None => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
