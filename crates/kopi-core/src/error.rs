//! # Error Types
//!
//! Domain-specific error types for kopi-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kopi-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kopi-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  kopi-server errors (in app)                                           │
//! │  └── ApiError         - What HTTP clients see (status + JSON body)     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, code, ID, ...)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::types::TransactionStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete an order line.
    ///
    /// ## When This Occurs
    /// The conditional stock decrement inside the commit transaction
    /// affected zero rows: a concurrent checkout (or a stale client
    /// cart) got there first. The whole order rolls back.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// UPDATE products SET stock = stock - 5 WHERE ... AND stock >= 5
    ///      │ 0 rows
    ///      ▼
    /// InsufficientStock { sku: "SKU001123", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 left" - nothing was persisted
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Transaction is not in a state that allows the requested transition.
    ///
    /// ## When This Occurs
    /// - Re-refunding an already refunded transaction
    /// - Voiding a refunded transaction (or vice versa)
    /// - Asking for `completed` as a transition target
    ///
    /// Transitions are only valid from `Completed`, so stock can never
    /// be restored twice.
    #[error("Transaction {transaction_id} is {current_status:?}, cannot transition to {requested_status:?}")]
    InvalidStatusTransition {
        transaction_id: String,
        current_status: TransactionStatus,
        requested_status: TransactionStatus,
    },

    /// A voucher's last claim was consumed by a concurrent checkout
    /// between the in-commit lookup and the guarded increment.
    #[error("Voucher {code} has no claims remaining")]
    VoucherExhausted { code: String },

    /// Tendered amount does not cover the computed total.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
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
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate SKU or voucher code).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for Results with ValidationError.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================
