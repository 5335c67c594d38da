//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kopi POS                               │
//! │                                                                         │
//! │  Handler returns Result<Json<T>, ApiError>                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Database Error?  ── DbError ──────────┐                               │
//! │         │                              │                               │
//! │         ▼                              ▼                               │
//! │  Business Error?  ── CoreError ────► ApiError { code, message }        │
//! │                                        │                               │
//! │                                        ▼                               │
//! │                        IntoResponse: HTTP status + JSON body           │
//! │                                                                         │
//! │  Client receives:                                                       │
//! │    422 { "code": "INSUFFICIENT_STOCK",                                  │
//! │          "message": "Insufficient stock for SKU001123: ..." }           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures (500) carry a generic message; the real cause goes
//! to the logs, never to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use kopi_core::CoreError;
use kopi_db::DbError;

/// API error returned from HTTP handlers.
///
/// ## Serialization
/// This is what the frontend receives when a request fails:
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Product not found: 7c2f..."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
///
/// ## Usage in Frontend
/// ```typescript
/// try {
///   await api.checkout(cart);
/// } catch (e) {
///   switch (e.code) {
///     case 'INSUFFICIENT_STOCK':
///       refreshCatalog();
///       break;
///     case 'VALIDATION_ERROR':
///       showForm(e.message);
///       break;
///     default:
///       showError('An error occurred');
///   }
/// }
/// ```
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Tendered amount below the total (400)
    PaymentError,

    /// Duplicate business key, or row still referenced (409)
    Conflict,

    /// Business rule rejected the operation (422)
    BusinessLogic,

    /// Insufficient stock for an order line (422)
    InsufficientStock,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    /// HTTP status for this code.
    fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError | ErrorCode::PaymentError => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::BusinessLogic | ErrorCode::InsufficientStock => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts business errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::ProductNotFound(_) | CoreError::TransactionNotFound(_) => {
                ApiError::new(ErrorCode::NotFound, err.to_string())
            }
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::InvalidStatusTransition { .. } | CoreError::VoucherExhausted { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, err.to_string())
            }
            CoreError::InvalidPaymentAmount { .. } => {
                ApiError::new(ErrorCode::PaymentError, err.to_string())
            }
            CoreError::Validation(_) => ApiError::new(ErrorCode::ValidationError, err.to_string()),
        }
    }
}

/// Converts database errors to API errors.
///
/// Infrastructure failures are logged in full and surfaced as a
/// generic message - no partial-commit state is ever user-visible, so
/// there is nothing actionable to tell the client.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                ApiError::new(ErrorCode::Conflict, err.to_string())
            }
            DbError::Core(core) => core.into(),
            other => {
                error!(error = %other, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts bare validation errors to API errors.
impl From<kopi_core::ValidationError> for ApiError {
    fn from(err: kopi_core::ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::ValidationError.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::InsufficientStock.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::DatabaseError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_core_error_conversion() {
        let api: ApiError = CoreError::ProductNotFound("p-1".to_string()).into();
        assert!(matches!(api.code, ErrorCode::NotFound));

        let api: ApiError = CoreError::InsufficientStock {
            sku: "SKU001123".into(),
            available: 0,
            requested: 1,
        }
        .into();
        assert!(matches!(api.code, ErrorCode::InsufficientStock));
    }

    #[test]
    fn test_db_error_is_generic_for_internal_failures() {
        let api: ApiError = DbError::QueryFailed("secret table details".to_string()).into();
        assert!(matches!(api.code, ErrorCode::DatabaseError));
        assert_eq!(api.message, "Database operation failed");
    }
}
