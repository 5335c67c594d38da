//! # kopi-core: Pure Business Logic for Kopi POS
//!
//! This crate is the **heart** of Kopi POS. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kopi POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (React SPA)                         │   │
//! │  │    Catalog UI ──► Cart UI ──► Checkout UI ──► Receipt UI        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over REST                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kopi-server (axum)                           │   │
//! │  │    /api/products, /api/vouchers, /api/transactions              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kopi-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ OrderPric │  │   rules   │  │   │
//! │  │   │  Voucher  │  │ Discount  │  │   -ing    │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kopi-db (Database Layer)                     │   │
//! │  │          SQLite queries, migrations, atomic order commit        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Voucher, Transaction, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are minor units (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use kopi_core::types::{OrderLine, OrderPricing};
//!
//! let lines = vec![OrderLine {
//!     product_id: "p-1".to_string(),
//!     price_cents: 35_000,
//!     quantity: 2,
//! }];
//!
//! // 10% voucher on 70,000 = 7,000 off
//! let pricing = OrderPricing::compute(&lines, Some(10));
//! assert_eq!(pricing.subtotal_cents, 70_000);
//! assert_eq!(pricing.discount_cents, 7_000);
//! assert_eq!(pricing.total_cents, 63_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use kopi_core::Money` instead of
// `use kopi_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single order
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single item in an order
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_LINE_QUANTITY: i64 = 999;

/// How many best sellers carry the `popular` badge at any time.
pub const POPULAR_PRODUCT_COUNT: u32 = 3;
