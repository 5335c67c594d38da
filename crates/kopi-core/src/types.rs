//! # Domain Types
//!
//! Core domain types used throughout Kopi POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Voucher      │   │  Transaction    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  code (business)│   │  transaction_id │       │
//! │  │  price_cents    │   │  discount %     │   │  total_cents    │       │
//! │  │  stock          │   │  claimed/max    │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                       │ owns           │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌────────▼────────┐       │
//! │  │  VoucherStatus  │   │TransactionStatus│   │ TransactionItem │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Active         │   │  Completed      │   │  price_at_time  │       │
//! │  │  Expired        │   │  Refunded       │   │  quantity       │       │
//! │  │  Inactive       │   │  Voided         │   │  subtotal       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, code, transaction_id) - human-readable, unique

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_LINE_QUANTITY, MAX_ORDER_LINES};

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    /// Price in minor currency units.
    pub price_cents: i64,

    /// Reference to a product image (URL or upload path).
    pub image: Option<String>,

    /// Display category (Beverages, Food, Desserts, ...).
    pub category: String,

    /// Supplier name.
    pub supplier: String,

    /// Best-seller badge. Derived - recomputed from completed
    /// transactions, never set directly by CRUD.
    pub popular: bool,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Current stock level. Never negative.
    pub stock: i64,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units could be sold from current stock.
    ///
    /// Advisory only. The authoritative check is the conditional
    /// decrement inside the order commit transaction.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Voucher Status
// =============================================================================

/// The lifecycle status of a voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum VoucherStatus {
    /// Redeemable (subject to expiry date and claim cap).
    Active,
    /// Terminal: claim cap or expiry date reached. Set automatically.
    Expired,
    /// Switched off by an operator. Can be re-activated.
    Inactive,
}

impl Default for VoucherStatus {
    fn default() -> Self {
        VoucherStatus::Active
    }
}

// =============================================================================
// Voucher
// =============================================================================

/// A coded discount entitlement with a redemption cap and expiry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Voucher {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Redemption code, unique, matched case-sensitively as stored.
    pub code: String,

    /// Human-readable description ("New customer discount").
    pub description: String,

    /// Discount percentage as a whole number, 0-100.
    pub discount: i64,

    /// How many times this voucher has been redeemed.
    /// Incremented exactly once per successful order commit.
    pub claimed_count: i64,

    /// Redemption cap. None means unlimited.
    pub max_claims: Option<i64>,

    /// Last day the voucher is meaningful. None means no expiry.
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,

    /// Lifecycle status.
    pub status: VoucherStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Voucher {
    /// Whether the expiry date has been reached as of `today`.
    ///
    /// A voucher expiring 2026-04-01 stops working ON 2026-04-01,
    /// matching how the admin UI presents expiry.
    #[inline]
    pub fn is_past_expiry(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|d| today >= d)
    }

    /// Whether the claim cap has been reached.
    #[inline]
    pub fn claims_exhausted(&self) -> bool {
        self.max_claims
            .is_some_and(|max| self.claimed_count >= max)
    }

    /// Whether the voucher can be redeemed right now.
    ///
    /// ## Rules
    /// - status must be `Active` (not operator-disabled, not expired)
    /// - expiry date must not have been reached
    /// - claim cap must not have been reached
    ///
    /// Used both by the advisory validation endpoint and by the order
    /// commit re-check inside the database transaction.
    pub fn is_redeemable(&self, today: NaiveDate) -> bool {
        self.status == VoucherStatus::Active
            && !self.is_past_expiry(today)
            && !self.claims_exhausted()
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// The status of a committed transaction.
///
/// ## State Machine
/// ```text
/// Completed ──► Refunded   (stock restored)
///     │
///     └───────► Voided     (stock restored)
///
/// Refunded and Voided are terminal. There is no path back, and no
/// path between them - re-applying a terminal status is rejected so a
/// transaction can never double-restore stock.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Paid and committed. The only state transitions start from.
    Completed,
    /// Money returned to the customer, stock restored.
    Refunded,
    /// Cancelled after commit (operator error etc.), stock restored.
    Voided,
}

impl TransactionStatus {
    /// Whether this status is a valid transition target.
    ///
    /// `Completed` is the creation status, never a target.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Refunded | TransactionStatus::Voided)
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Completed
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// One completed sale event with its monetary summary.
///
/// Invariant: `total_cents = subtotal_cents - discount_cents`, and
/// `total_paid_cents >= total_cents` at creation. Rows are immutable
/// after commit except for status transitions out of `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    /// External receipt token, unique ("TRX-260806143002-0421").
    pub transaction_id: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    /// Voucher that was consumed, if any.
    pub voucher_id: Option<String>,
    /// Denormalized voucher code, kept for receipts even if the
    /// voucher row is later deleted.
    pub voucher_code: Option<String>,
    pub total_cents: i64,
    /// Amount tendered by the customer.
    pub total_paid_cents: i64,
    pub status: TransactionStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Change owed to the customer.
    #[inline]
    pub fn change(&self) -> Money {
        Money::from_cents(self.total_paid_cents - self.total_cents)
    }
}

// =============================================================================
// Transaction Item
// =============================================================================

/// A line item of a transaction.
/// Uses the snapshot pattern to freeze the price at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    /// Owning transaction. Cascade-deleted with it.
    pub transaction_id: String,
    /// Product reference at time of sale.
    pub product_id: String,
    /// Quantity sold. Always > 0.
    pub quantity: i64,
    /// Unit price at time of sale (frozen even if the product's
    /// price later changes).
    pub price_at_time_cents: i64,
    /// price_at_time × quantity.
    pub subtotal_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl TransactionItem {
    /// Returns the frozen unit price as Money.
    #[inline]
    pub fn price_at_time(&self) -> Money {
        Money::from_cents(self.price_at_time_cents)
    }

    /// Returns the line subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Order Pricing
// =============================================================================

/// One line of an order request, as submitted by the cashier client.
///
/// The unit price is taken from the client cart; the commit workflow
/// snapshots it into `TransactionItem.price_at_time_cents`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    /// Product being purchased.
    pub product_id: String,
    /// Unit price in minor units.
    pub price_cents: i64,
    /// Units purchased. Must be > 0.
    pub quantity: i64,
}

impl OrderLine {
    /// price × quantity for this line.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.price_cents).multiply_quantity(self.quantity)
    }
}

/// The monetary summary of an order: the one arithmetic fact the whole
/// checkout workflow revolves around.
///
/// Invariant: `total_cents = subtotal_cents - discount_cents`, held by
/// construction - `compute` is the only way to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct OrderPricing {
    /// Σ(price × quantity) over all lines.
    pub subtotal_cents: i64,
    /// Voucher discount amount (0 when no voucher applied).
    pub discount_cents: i64,
    /// subtotal - discount.
    pub total_cents: i64,
}

impl OrderPricing {
    /// Computes order totals from cart lines and an optional voucher
    /// discount percentage.
    ///
    /// Pure function: the caller resolves the voucher row (and decides
    /// whether it is redeemable) before calling this.
    ///
    /// ## Example
    /// ```rust
    /// use kopi_core::types::{OrderLine, OrderPricing};
    ///
    /// let lines = vec![OrderLine {
    ///     product_id: "p-1".into(),
    ///     price_cents: 35_000,
    ///     quantity: 2,
    /// }];
    /// let pricing = OrderPricing::compute(&lines, Some(10));
    /// assert_eq!(
    ///     (pricing.subtotal_cents, pricing.discount_cents, pricing.total_cents),
    ///     (70_000, 7_000, 63_000)
    /// );
    /// ```
    pub fn compute(lines: &[OrderLine], discount_percent: Option<i64>) -> Self {
        let subtotal = lines
            .iter()
            .fold(Money::zero(), |sum, line| sum + line.subtotal());

        let discount = match discount_percent {
            Some(percent) => subtotal.discount(percent),
            None => Money::zero(),
        };

        OrderPricing {
            subtotal_cents: subtotal.cents(),
            discount_cents: discount.cents(),
            total_cents: (subtotal - discount).cents(),
        }
    }
}

/// Validates an order's cart lines before any write happens.
///
/// ## Rules
/// - at least one line, at most [`MAX_ORDER_LINES`]
/// - every quantity in 1..=[`MAX_LINE_QUANTITY`]
/// - every unit price >= 0
pub fn validate_order_lines(lines: &[OrderLine]) -> Result<(), ValidationError> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    for line in lines {
        if line.quantity <= 0 || line.quantity > MAX_LINE_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: MAX_LINE_QUANTITY,
            });
        }
        if line.price_cents < 0 {
            return Err(ValidationError::MustBePositive {
                field: "price".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
