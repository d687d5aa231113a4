//! # API Error Type
//!
//! Unified error type for back-office commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Pharmadesk                             │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Rule violated? ──── CoreError::DuplicateBillNumber ─┐          │  │
//! │  │         │            (message shown verbatim)        │          │  │
//! │  │         ▼                                            ▼          │  │
//! │  │  Storage failed? ─── DbError::TransactionFailed ── ApiError ───►│  │
//! │  │                      (logged, generic message)                   │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                    Error notification { code, message }                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use pharmadesk_core::CoreError;
use pharmadesk_db::DbError;
use serde::Serialize;

/// API error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "CONFLICT",
///   "message": "Bill number 5 is already in use"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Medicine, store, supplier, bill or purchase does not exist
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Duplicate medicine name or bill number
    Conflict,

    /// No counterparty selected, or the line is not in the cart
    SessionError,

    /// Business rule prevented the operation
    BusinessLogic,

    /// Backup document failed schema or consistency checks
    ImportRejected,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
///
/// Storage details never reach the user; they are logged instead.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Changes could not be saved")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database is busy, try again")
            }
            DbError::Core(e) => ApiError::from(e),
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::MedicineNotFound(_)
            | CoreError::StoreNotFound(_)
            | CoreError::SupplierNotFound(_)
            | CoreError::BillNotFound(_)
            | CoreError::PurchaseNotFound(_) => ErrorCode::NotFound,
            CoreError::DuplicateMedicineName { .. } | CoreError::DuplicateBillNumber(_) => {
                ErrorCode::Conflict
            }
            CoreError::NoActiveSession { .. } | CoreError::NotInCart(_) => ErrorCode::SessionError,
            CoreError::NoValidItems => ErrorCode::BusinessLogic,
            CoreError::AmountOutOfRange(_) => ErrorCode::ValidationError,
            CoreError::ImportRejected { .. } => ErrorCode::ImportRejected,
            CoreError::Validation(e) => return ApiError::validation(e.to_string()),
            CoreError::Serialization(e) => {
                tracing::error!("Serialization failed: {}", e);
                return ApiError::internal("Data could not be serialized");
            }
        };
        ApiError::new(code, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
