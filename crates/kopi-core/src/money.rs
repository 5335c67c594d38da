//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In many retail systems:                                                │
//! │    10.00 / 3 = 3.33 (×3 = 9.99)  → Lost 0.01!                          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Minor Units                                      │
//! │    All prices, subtotals, discounts and totals are i64 minor units.    │
//! │    Division loss is explicit and handled where it happens.             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kopi_core::money::Money;
//!
//! // Create from minor units (the only way in)
//! let price = Money::from_cents(35_000);
//!
//! // Arithmetic operations
//! let line_total = price * 2i64;
//! assert_eq!(line_total.cents(), 70_000);
//!
//! // Voucher discount: 10% of 70,000 = 7,000
//! assert_eq!(line_total.discount(10).cents(), 7_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds and adjustments
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## User Workflow Context
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                    Where Money is Used                                  │
/// │                                                                         │
/// │  Product.price_cents ──► OrderLine.price_cents ──► line subtotal        │
/// │                                                                         │
/// │  subtotal ──► voucher discount ──► total ──► total_paid check           │
/// │                                                                         │
/// │  EVERY monetary value in the system flows through this type            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use kopi_core::money::Money;
    ///
    /// let price = Money::from_cents(35_000);
    /// assert_eq!(price.cents(), 35_000);
    /// ```
    ///
    /// ## Why Minor Units?
    /// Using the smallest unit eliminates all floating-point concerns.
    /// The database, calculations, and API all use minor units.
    /// Only the UI converts to a display currency.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use kopi_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(35_000);
    /// let line_total = unit_price.multiply_quantity(2);
    /// assert_eq!(line_total.cents(), 70_000);
    /// ```
    ///
    /// ## User Workflow
    /// ```text
    /// Product: Americano 35,000
    /// Quantity: 2
    ///      │
    ///      ▼
    /// multiply_quantity(2) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line Total: 70,000
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Computes a whole-percent discount amount, rounding half up.
    ///
    /// ## Arguments
    /// * `percent` - Discount percentage as a whole number (10 = 10%)
    ///
    /// ## Rounding
    /// Integer math with half-up rounding: `(amount × percent + 50) / 100`.
    /// Uses i128 internally so large subtotals cannot overflow.
    ///
    /// ## Example
    /// ```rust
    /// use kopi_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(70_000);
    /// assert_eq!(subtotal.discount(10).cents(), 7_000);
    ///
    /// // 15% of 333 = 49.95 → rounds to 50
    /// assert_eq!(Money::from_cents(333).discount(15).cents(), 50);
    /// ```
    ///
    /// ## User Workflow
    /// ```text
    /// Subtotal: 70,000
    ///      │
    ///      ▼
    /// discount(10) ← THIS FUNCTION (voucher WELCOME10)
    ///      │
    ///      ▼
    /// Discount: 7,000 → Total: 63,000
    /// ```
    pub fn discount(&self, percent: i64) -> Money {
        let amount = (self.0 as i128 * percent as i128 + 50) / 100;
        Money::from_cents(amount as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for debugging and logs. Use frontend formatting for actual UI
/// display to handle localization properly.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

/// Multiplication by i64.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
