//! # Order Repository
//!
//! The order commit workflow and transaction reporting.
//!
//! This is the one subsystem in Kopi POS with real invariants: stock
//! non-negativity, voucher claim caps, and monetary consistency, all of
//! which must hold under concurrent checkouts.
//!
//! ## The Commit Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Atomic Order Commit                                  │
//! │                                                                         │
//! │  validate cart ──► reject before any write                             │
//! │       │                                                                 │
//! │       ▼                         ┌────────────────────────────────────┐ │
//! │  BEGIN TRANSACTION              │  Everything in this box either     │ │
//! │       │                         │  fully happens or fully rolls back │ │
//! │       ▼                         └────────────────────────────────────┘ │
//! │  look up voucher (if code given), decide redeemability                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute subtotal / discount / total  ← server-side, always            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT transaction row (status = completed)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  per cart line:                                                        │
//! │    conditional stock decrement                                         │
//! │      UPDATE products SET stock = stock - qty                           │
//! │      WHERE id = ? AND stock >= qty                                     │
//! │      └── 0 rows → missing product or empty shelf → abort               │
//! │    INSERT item row (price snapshot)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  guarded voucher claim:                                                │
//! │    UPDATE vouchers SET claimed_count = claimed_count + 1               │
//! │    WHERE ... AND (max_claims IS NULL OR claimed_count < max_claims)    │
//! │    └── 0 rows → concurrent checkout won the race → abort               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ──► recompute popular badges (outside, non-fatal)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  return receipt (transaction + items + product details)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why the checks live in WHERE clauses
//! A read-then-write of `claimed_count` or `stock` loses updates when
//! two checkouts interleave. Pushing the condition into the UPDATE
//! makes the row itself the serialization point: whichever transaction
//! commits second sees 0 rows affected and aborts cleanly.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::ProductRepository;
use kopi_core::{
    validate_order_lines, CoreError, OrderLine, OrderPricing, Transaction, TransactionStatus,
    Voucher,
};

// =============================================================================
// Request / Response Types
// =============================================================================

/// A checkout request, as assembled by the cashier client.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Cart lines. Must be non-empty, quantities > 0.
    pub lines: Vec<OrderLine>,
    /// Optional voucher code. A missing, inactive, expired or
    /// exhausted voucher is dropped silently (no discount); clients
    /// wanting a hard failure pre-validate via the voucher endpoint.
    pub voucher_code: Option<String>,
    /// Amount tendered. Must cover the computed total.
    pub total_paid_cents: i64,
}

/// One receipt line: a transaction item joined with the product fields
/// the receipt screen displays.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TransactionItemDetail {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub price_at_time_cents: i64,
    pub subtotal_cents: i64,
    pub created_at: DateTime<Utc>,
    /// Current product name (display only; the price is the snapshot).
    pub name: String,
    pub image: Option<String>,
    pub category: String,
    pub description: Option<String>,
}

/// A transaction with its line items and voucher context - what the
/// receipt and reporting screens consume.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: Transaction,
    /// Discount percentage of the consumed voucher, if it still exists.
    pub voucher_discount: Option<i64>,
    pub items: Vec<TransactionItemDetail>,
}

/// Aggregates over completed transactions.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TransactionStats {
    pub total_transactions: i64,
    pub total_revenue_cents: i64,
    pub total_discounts_cents: i64,
    pub average_transaction_value_cents: f64,
    pub vouchers_used: i64,
}

/// A best-selling product line for the stats endpoint.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub name: String,
    pub category: String,
    pub total_quantity: i64,
    pub total_revenue_cents: i64,
}

/// The stats endpoint payload: aggregates plus the top-5 sellers.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub stats: TransactionStats,
    pub top_products: Vec<TopProduct>,
}

// =============================================================================
// Order Repository
// =============================================================================

/// Repository for the order commit workflow, status transitions and
/// transaction reporting.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Commits an order: one persisted transaction with its items,
    /// voucher and stock side effects applied consistently - or no
    /// persisted state change at all.
    ///
    /// Every failure path returns before `tx.commit()`, which rolls
    /// the transaction back on drop.
    ///
    /// ## Errors
    /// - `CoreError::Validation` - empty cart, bad quantity/price,
    ///   before any write
    /// - `CoreError::InvalidPaymentAmount` - tendered amount below the
    ///   recomputed total
    /// - `CoreError::VoucherExhausted` - a concurrent checkout took
    ///   the voucher's last claim mid-commit
    /// - `CoreError::InsufficientStock` / `ProductNotFound` - a line
    ///   cannot be fulfilled
    pub async fn commit(&self, request: OrderRequest) -> DbResult<TransactionDetail> {
        validate_order_lines(&request.lines).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        // Resolve the voucher inside the transaction so the commit
        // decides redeemability against the row it will mutate.
        // Client-supplied discount amounts are never consulted.
        let today = Utc::now().date_naive();
        let voucher = match request.voucher_code.as_deref() {
            Some(code) => {
                let voucher = sqlx::query_as::<_, Voucher>(
                    r#"
                    SELECT id, code, description, discount, claimed_count,
                           max_claims, expiry_date, status, created_at, updated_at
                    FROM vouchers
                    WHERE code = ?1
                    "#,
                )
                .bind(code)
                .fetch_optional(&mut *tx)
                .await?;

                match voucher {
                    Some(v) if v.is_redeemable(today) => Some(v),
                    _ => {
                        debug!(code = %code, "Voucher not redeemable, committing without discount");
                        None
                    }
                }
            }
            None => None,
        };

        let pricing =
            OrderPricing::compute(&request.lines, voucher.as_ref().map(|v| v.discount));

        if request.total_paid_cents < pricing.total_cents {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!(
                    "tendered {} is less than total {}",
                    request.total_paid_cents, pricing.total_cents
                ),
            }
            .into());
        }

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let token = generate_transaction_token(now);

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, transaction_id, subtotal_cents, discount_cents,
                voucher_id, voucher_code, total_cents, total_paid_cents,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'completed', ?9, ?10)
            "#,
        )
        .bind(&id)
        .bind(&token)
        .bind(pricing.subtotal_cents)
        .bind(pricing.discount_cents)
        .bind(voucher.as_ref().map(|v| v.id.as_str()))
        .bind(voucher.as_ref().map(|v| v.code.as_str()))
        .bind(pricing.total_cents)
        .bind(request.total_paid_cents)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Authoritative stock check, decrement and price snapshot, one
        // line at a time. The client cart's optimistic bookkeeping is
        // advisory; this is where stock actually moves. The decrement
        // doubles as the existence check: zero rows affected means the
        // product is missing or the shelf is short, and either aborts
        // the whole order.
        for line in &request.lines {
            let decremented = sqlx::query(
                r#"
                UPDATE products
                SET stock = stock - ?2, updated_at = ?3
                WHERE id = ?1 AND stock >= ?2
                "#,
            )
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if decremented.rows_affected() == 0 {
                let found = sqlx::query_as::<_, (String, i64)>(
                    "SELECT sku, stock FROM products WHERE id = ?1",
                )
                .bind(&line.product_id)
                .fetch_optional(&mut *tx)
                .await?;

                return Err(match found {
                    None => CoreError::ProductNotFound(line.product_id.clone()).into(),
                    Some((sku, stock)) => CoreError::InsufficientStock {
                        sku,
                        available: stock,
                        requested: line.quantity,
                    }
                    .into(),
                });
            }

            sqlx::query(
                r#"
                INSERT INTO transaction_items (
                    id, transaction_id, product_id, quantity,
                    price_at_time_cents, subtotal_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(line.price_cents)
            .bind(line.subtotal().cents())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        // Guarded claim: the WHERE clause re-checks the cap so two
        // concurrent checkouts cannot both take the last claim.
        if let Some(v) = &voucher {
            let claimed = sqlx::query(
                r#"
                UPDATE vouchers
                SET claimed_count = claimed_count + 1, updated_at = ?2
                WHERE id = ?1
                  AND status = 'active'
                  AND (max_claims IS NULL OR claimed_count < max_claims)
                "#,
            )
            .bind(&v.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if claimed.rows_affected() == 0 {
                return Err(CoreError::VoucherExhausted {
                    code: v.code.clone(),
                }
                .into());
            }

            // Cap reached by this claim? Flip to expired in the same
            // transaction so no later checkout sees an active voucher
            // with nothing left.
            if let Some(max) = v.max_claims {
                let claimed_count: i64 =
                    sqlx::query_scalar("SELECT claimed_count FROM vouchers WHERE id = ?1")
                        .bind(&v.id)
                        .fetch_one(&mut *tx)
                        .await?;

                if claimed_count >= max {
                    sqlx::query(
                        "UPDATE vouchers SET status = 'expired', updated_at = ?2 WHERE id = ?1",
                    )
                    .bind(&v.id)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;

                    info!(code = %v.code, "Voucher reached claim cap, expired");
                }
            }
        }

        tx.commit().await?;

        info!(
            transaction = %token,
            total = pricing.total_cents,
            items = request.lines.len(),
            voucher = voucher.as_ref().map(|v| v.code.as_str()).unwrap_or("-"),
            "Order committed"
        );

        // Popularity is derived data; a failure here must not undo a
        // committed sale.
        if let Err(e) = ProductRepository::new(self.pool.clone())
            .recompute_popular()
            .await
        {
            warn!(error = %e, "Popular product recomputation failed");
        }

        self.get(&id).await
    }

    /// Moves a transaction from `completed` to `refunded` or `voided`,
    /// restoring every item's quantity to its product's stock.
    ///
    /// The status guard is in the UPDATE's WHERE clause: a transaction
    /// already in a terminal state matches zero rows, so stock can
    /// never be restored twice.
    ///
    /// Voucher `claimed_count` is deliberately NOT reversed on refund;
    /// a redemption stays spent.
    pub async fn transition_status(
        &self,
        id: &str,
        target: TransactionStatus,
    ) -> DbResult<Transaction> {
        if !target.is_terminal() {
            let current = self
                .get_transaction(id)
                .await?
                .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;

            return Err(CoreError::InvalidStatusTransition {
                transaction_id: id.to_string(),
                current_status: current.status,
                requested_status: target,
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let updated = sqlx::query(
            r#"
            UPDATE transactions
            SET status = ?2, updated_at = ?3
            WHERE id = ?1 AND status = 'completed'
            "#,
        )
        .bind(id)
        .bind(target)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let current = sqlx::query_as::<_, Transaction>(
                r#"
                SELECT id, transaction_id, subtotal_cents, discount_cents,
                       voucher_id, voucher_code, total_cents, total_paid_cents,
                       status, created_at, updated_at
                FROM transactions
                WHERE id = ?1
                "#,
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

            return Err(match current {
                None => CoreError::TransactionNotFound(id.to_string()).into(),
                Some(t) => CoreError::InvalidStatusTransition {
                    transaction_id: id.to_string(),
                    current_status: t.status,
                    requested_status: target,
                }
                .into(),
            });
        }

        // Full stock restoration, one UPDATE per line.
        let items = sqlx::query_as::<_, (String, i64)>(
            "SELECT product_id, quantity FROM transaction_items WHERE transaction_id = ?1",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        for (product_id, quantity) in &items {
            sqlx::query(
                "UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1",
            )
            .bind(product_id)
            .bind(quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(id = %id, status = ?target, restored_lines = items.len(), "Transaction transitioned");

        // A refund changes the completed set the badges derive from.
        if let Err(e) = ProductRepository::new(self.pool.clone())
            .recompute_popular()
            .await
        {
            warn!(error = %e, "Popular product recomputation failed");
        }

        self.get_transaction(id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))
    }

    /// Gets a bare transaction row by ID.
    pub async fn get_transaction(&self, id: &str) -> DbResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, transaction_id, subtotal_cents, discount_cents,
                   voucher_id, voucher_code, total_cents, total_paid_cents,
                   status, created_at, updated_at
            FROM transactions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// Gets a transaction with its items and voucher context.
    pub async fn get(&self, id: &str) -> DbResult<TransactionDetail> {
        let transaction = self
            .get_transaction(id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))?;

        self.into_detail(transaction).await
    }

    /// Lists transactions newest-first, optionally bounded by an
    /// inclusive day range, each with items and voucher context.
    pub async fn list(
        &self,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> DbResult<Vec<TransactionDetail>> {
        let transactions = match range {
            Some((start, end)) => {
                let from = start.and_time(NaiveTime::MIN).and_utc();
                let to = end
                    .and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
                    .and_utc();

                sqlx::query_as::<_, Transaction>(
                    r#"
                    SELECT id, transaction_id, subtotal_cents, discount_cents,
                           voucher_id, voucher_code, total_cents, total_paid_cents,
                           status, created_at, updated_at
                    FROM transactions
                    WHERE created_at BETWEEN ?1 AND ?2
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(from)
                .bind(to)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Transaction>(
                    r#"
                    SELECT id, transaction_id, subtotal_cents, discount_cents,
                           voucher_id, voucher_code, total_cents, total_paid_cents,
                           status, created_at, updated_at
                    FROM transactions
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut details = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            details.push(self.into_detail(transaction).await?);
        }

        Ok(details)
    }

    /// Aggregate stats over completed transactions plus top-5 sellers.
    pub async fn stats(&self) -> DbResult<StatsReport> {
        let stats = sqlx::query_as::<_, TransactionStats>(
            r#"
            SELECT
                COUNT(*) AS total_transactions,
                COALESCE(SUM(total_cents), 0) AS total_revenue_cents,
                COALESCE(SUM(discount_cents), 0) AS total_discounts_cents,
                COALESCE(AVG(total_cents), 0.0) AS average_transaction_value_cents,
                COUNT(DISTINCT voucher_code) AS vouchers_used
            FROM transactions
            WHERE status = 'completed'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let top_products = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT
                p.name AS name,
                p.category AS category,
                SUM(ti.quantity) AS total_quantity,
                SUM(ti.subtotal_cents) AS total_revenue_cents
            FROM transaction_items ti
            JOIN products p ON ti.product_id = p.id
            JOIN transactions t ON ti.transaction_id = t.id
            WHERE t.status = 'completed'
            GROUP BY p.id, p.name, p.category
            ORDER BY total_quantity DESC
            LIMIT 5
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(StatsReport {
            stats,
            top_products,
        })
    }

    /// Attaches items and voucher context to a transaction row.
    async fn into_detail(&self, transaction: Transaction) -> DbResult<TransactionDetail> {
        let items = sqlx::query_as::<_, TransactionItemDetail>(
            r#"
            SELECT
                ti.id, ti.transaction_id, ti.product_id, ti.quantity,
                ti.price_at_time_cents, ti.subtotal_cents, ti.created_at,
                p.name AS name, p.image AS image,
                p.category AS category, p.description AS description
            FROM transaction_items ti
            JOIN products p ON p.id = ti.product_id
            WHERE ti.transaction_id = ?1
            ORDER BY ti.created_at, ti.id
            "#,
        )
        .bind(&transaction.id)
        .fetch_all(&self.pool)
        .await?;

        let voucher_discount = match transaction.voucher_code.as_deref() {
            Some(code) => {
                sqlx::query_scalar::<_, i64>("SELECT discount FROM vouchers WHERE code = ?1")
                    .bind(code)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        Ok(TransactionDetail {
            transaction,
            voucher_discount,
            items,
        })
    }
}

// =============================================================================
// Token Generation
// =============================================================================

/// Generates an external receipt token: `TRX-YYMMDDHHMMSS-NNNN`.
///
/// Timestamp-derived with a sub-second suffix; the UNIQUE constraint on
/// `transactions.transaction_id` is the real uniqueness guarantee.
fn generate_transaction_token(now: DateTime<Utc>) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);

    format!("TRX-{}-{:04}", now.format("%y%m%d%H%M%S"), nanos % 10_000)
}
