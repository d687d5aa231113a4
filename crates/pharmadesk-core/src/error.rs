//! # Error Types
//!
//! Domain-specific error types for pharmadesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pharmadesk-core errors (this file)                                    │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  pharmadesk-db errors (separate crate)                                 │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Backoffice errors (in app)                                            │
//! │  └── ApiError         - What the frontend sees (serialized)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Notification           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation validates before it mutates, so any error returned here
//! means no state was changed.

use thiserror::Error;

use crate::session::SessionKind;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No catalog definition with this id.
    #[error("Medicine not found: {0}")]
    MedicineNotFound(String),

    /// Medical store (billing counterparty) does not exist for the account.
    #[error("Medical store not found: {0}")]
    StoreNotFound(String),

    /// Supplier (purchase counterparty) does not exist for the account.
    #[error("Supplier not found: {0}")]
    SupplierNotFound(String),

    #[error("Bill #{0} not found")]
    BillNotFound(u64),

    #[error("Purchase #{0} not found")]
    PurchaseNotFound(u64),

    /// An add or edit would give two catalog definitions the same
    /// normalized name.
    ///
    /// ## When This Occurs
    /// ```text
    /// Inventory: "Paracetamol 500" exists
    ///      │
    ///      ▼
    /// User adds "  paracetamol 500 "
    ///      │
    ///      ▼
    /// DuplicateMedicineName { name: "paracetamol 500" }
    /// ```
    #[error("A medicine named '{name}' already exists")]
    DuplicateMedicineName { name: String },

    /// A new bill was finalized with a number that is already taken.
    #[error("Bill number {0} is already in use")]
    DuplicateBillNumber(u64),

    /// Finalize was called but no line has both a positive quantity and a rate.
    #[error("Cannot finalize: no valid line items")]
    NoValidItems,

    /// An operation needs a counterparty to be selected first.
    #[error("No active {session} session")]
    NoActiveSession { session: SessionKind },

    #[error("Medicine {0} is not in the cart")]
    NotInCart(String),

    /// An amount cannot be represented, or line arithmetic on it would
    /// overflow.
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),

    /// Imported backup document failed schema or consistency checks.
    #[error("Import rejected: {reason}")]
    ImportRejected { reason: String },

    /// A value could not be serialized for persistence.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn import_rejected(reason: impl Into<String>) -> Self {
        CoreError::ImportRejected {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: f64, max: f64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., NaN, infinite number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate bill number in an import).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::DuplicateBillNumber(5);
        assert_eq!(err.to_string(), "Bill number 5 is already in use");

        let err = CoreError::NoActiveSession {
            session: SessionKind::Purchase,
        };
        assert_eq!(err.to_string(), "No active purchase session");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "medicine name".to_string(),
        };
        assert_eq!(err.to_string(), "medicine name is required");

        let err = ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0.0,
            max: 100.0,
        };
        assert_eq!(err.to_string(), "discount must be between 0 and 100");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "bill number".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
