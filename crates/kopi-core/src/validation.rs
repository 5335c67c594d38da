//! # Validation Module
//!
//! Input validation utilities for Kopi POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend (React)                                             │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (Rust)                                          │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints (sku, code, transaction_id)                    │
//! │  └── CHECK constraints (stock >= 0, quantity > 0, discount 0-100)     │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kopi_core::validation::{validate_sku, validate_discount_percent};
//!
//! validate_sku("SKU001123").unwrap();
//! validate_discount_percent(10).unwrap();
//! ```

use crate::error::{ValidationError, ValidationResult};

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use kopi_core::validation::validate_sku;
///
/// assert!(validate_sku("SKU001123").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a voucher code.
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// Codes are matched case-sensitively as stored; validation does NOT
/// uppercase them.
///
/// ## Example
/// ```rust
/// use kopi_core::validation::validate_voucher_code;
///
/// assert!(validate_voucher_code("WELCOME10").is_ok());
/// assert!(validate_voucher_code("  ").is_err());
/// ```
pub fn validate_voucher_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a discount percentage.
///
/// ## Rules
/// Whole number between 0 and 100 inclusive.
///
/// ## Example
/// ```rust
/// use kopi_core::validation::validate_discount_percent;
///
/// assert!(validate_discount_percent(10).is_ok());
/// assert!(validate_discount_percent(101).is_err());
/// assert!(validate_discount_percent(-1).is_err());
/// ```
pub fn validate_discount_percent(percent: i64) -> ValidationResult<()> {
    if !(0..=100).contains(&percent) {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates a price in minor units.
///
/// Prices are non-negative; zero is allowed (giveaway items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a stock level for product create/update.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustBePositive {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

/// Validates a voucher claim cap.
///
/// None means unlimited; a cap, when present, must be at least 1.
pub fn validate_max_claims(max_claims: Option<i64>) -> ValidationResult<()> {
    if let Some(max) = max_claims {
        if max < 1 {
            return Err(ValidationError::MustBePositive {
                field: "max_claims".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("SKU001123").is_ok());
        assert!(validate_sku("COKE-330").is_ok());
        assert!(validate_sku("a_b_c").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"X".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Americano").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"N".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_voucher_code() {
        assert!(validate_voucher_code("WELCOME10").is_ok());
        assert!(validate_voucher_code("FLASH30").is_ok());

        assert!(validate_voucher_code("").is_err());
        assert!(validate_voucher_code("TEN %OFF").is_err());
    }

    #[test]
    fn test_validate_discount_percent() {
        assert!(validate_discount_percent(0).is_ok());
        assert!(validate_discount_percent(100).is_ok());

        assert!(validate_discount_percent(-1).is_err());
        assert!(validate_discount_percent(101).is_err());
    }

    #[test]
    fn test_validate_price_and_stock() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(35_000).is_ok());
        assert!(validate_price_cents(-1).is_err());

        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());
    }

    #[test]
    fn test_validate_max_claims() {
        assert!(validate_max_claims(None).is_ok());
        assert!(validate_max_claims(Some(1)).is_ok());
        assert!(validate_max_claims(Some(200)).is_ok());

        assert!(validate_max_claims(Some(0)).is_err());
        assert!(validate_max_claims(Some(-5)).is_err());
    }
}
