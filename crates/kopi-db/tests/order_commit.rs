//! Integration tests for the atomic order commit workflow.
//!
//! Runs against an isolated in-memory SQLite database per test, the
//! full migration set applied. These cover the system's real
//! invariants: monetary consistency, voucher claim caps, stock
//! non-negativity, and all-or-nothing rollback.

use kopi_core::{CoreError, OrderLine, TransactionStatus, VoucherStatus};
use kopi_db::{Database, DbConfig, DbError, OrderRequest, ProductInput, VoucherInput};

// =============================================================================
// Helpers
// =============================================================================

async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

async fn seed_product(db: &Database, sku: &str, price_cents: i64, stock: i64) -> String {
    db.products()
        .insert(ProductInput {
            name: format!("Product {sku}"),
            sku: sku.to_string(),
            price_cents,
            image: None,
            category: "Beverages".to_string(),
            supplier: "ABC Foods".to_string(),
            description: None,
            stock,
        })
        .await
        .expect("insert product")
        .id
}

async fn seed_voucher(
    db: &Database,
    code: &str,
    discount: i64,
    claimed: i64,
    max_claims: Option<i64>,
) -> String {
    let voucher = db
        .vouchers()
        .insert(VoucherInput {
            code: code.to_string(),
            description: format!("{code} voucher"),
            discount,
            max_claims,
            expiry_date: None,
            status: VoucherStatus::Active,
        })
        .await
        .expect("insert voucher");

    if claimed > 0 {
        sqlx::query("UPDATE vouchers SET claimed_count = ?2 WHERE id = ?1")
            .bind(&voucher.id)
            .bind(claimed)
            .execute(db.pool())
            .await
            .expect("backfill claimed_count");
    }

    voucher.id
}

fn line(product_id: &str, price_cents: i64, quantity: i64) -> OrderLine {
    OrderLine {
        product_id: product_id.to_string(),
        price_cents,
        quantity,
    }
}

async fn transaction_count(db: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
        .fetch_one(db.pool())
        .await
        .expect("count transactions")
}

async fn product_stock(db: &Database, id: &str) -> i64 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
        .bind(id)
        .fetch_one(db.pool())
        .await
        .expect("product stock")
}

// =============================================================================
// Commit: happy paths
// =============================================================================

/// The canonical receipt: cart [{price 35000, qty 2}] with WELCOME10
/// (10%, 5/200 claimed) → 70000 / 7000 / 63000, claim count 6.
#[tokio::test]
async fn commit_with_voucher_applies_discount_and_claims_once() {
    let db = test_db().await;
    let product_id = seed_product(&db, "SKU001123", 35_000, 50).await;
    seed_voucher(&db, "WELCOME10", 10, 5, Some(200)).await;

    let receipt = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 35_000, 2)],
            voucher_code: Some("WELCOME10".to_string()),
            total_paid_cents: 63_000,
        })
        .await
        .expect("commit");

    let tx = &receipt.transaction;
    assert_eq!(tx.subtotal_cents, 70_000);
    assert_eq!(tx.discount_cents, 7_000);
    assert_eq!(tx.total_cents, 63_000);
    assert_eq!(tx.total_paid_cents, 63_000);
    assert_eq!(tx.status, TransactionStatus::Completed);
    assert_eq!(tx.voucher_code.as_deref(), Some("WELCOME10"));
    assert_eq!(tx.total_cents, tx.subtotal_cents - tx.discount_cents);

    // One line item with frozen price
    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].price_at_time_cents, 35_000);
    assert_eq!(receipt.items[0].subtotal_cents, 70_000);
    assert_eq!(receipt.items[0].quantity, 2);

    // Stock moved by exactly the line quantity
    assert_eq!(product_stock(&db, &product_id).await, 48);

    // Claim incremented exactly once
    let voucher = db
        .vouchers()
        .get_by_code("WELCOME10")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(voucher.claimed_count, 6);
    assert_eq!(voucher.status, VoucherStatus::Active);
}

#[tokio::test]
async fn commit_without_voucher() {
    let db = test_db().await;
    let americano = seed_product(&db, "SKU001123", 35_000, 50).await;
    let salad = seed_product(&db, "SKU001128", 48_000, 15).await;

    let receipt = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&americano, 35_000, 1), line(&salad, 48_000, 2)],
            voucher_code: None,
            total_paid_cents: 150_000,
        })
        .await
        .expect("commit");

    let tx = &receipt.transaction;
    assert_eq!(tx.subtotal_cents, 131_000);
    assert_eq!(tx.discount_cents, 0);
    assert_eq!(tx.total_cents, 131_000);
    assert!(tx.voucher_code.is_none());
    assert_eq!(receipt.items.len(), 2);

    assert_eq!(product_stock(&db, &americano).await, 49);
    assert_eq!(product_stock(&db, &salad).await, 13);
}

/// The price snapshot decouples receipts from live catalog mutation.
#[tokio::test]
async fn price_at_time_survives_product_price_change() {
    let db = test_db().await;
    let product_id = seed_product(&db, "SKU001123", 35_000, 50).await;

    let receipt = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 35_000, 1)],
            voucher_code: None,
            total_paid_cents: 35_000,
        })
        .await
        .expect("commit");

    sqlx::query("UPDATE products SET price_cents = 99000 WHERE id = ?1")
        .bind(&product_id)
        .execute(db.pool())
        .await
        .unwrap();

    let again = db.orders().get(&receipt.transaction.id).await.unwrap();
    assert_eq!(again.items[0].price_at_time_cents, 35_000);
}

// =============================================================================
// Commit: voucher edge cases
// =============================================================================

/// An unknown code is dropped silently - no discount, no error.
#[tokio::test]
async fn unknown_voucher_is_dropped_silently() {
    let db = test_db().await;
    let product_id = seed_product(&db, "SKU001123", 35_000, 50).await;

    let receipt = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 35_000, 2)],
            voucher_code: Some("NOSUCHCODE".to_string()),
            total_paid_cents: 70_000,
        })
        .await
        .expect("commit");

    assert_eq!(receipt.transaction.discount_cents, 0);
    assert_eq!(receipt.transaction.total_cents, 70_000);
    assert!(receipt.transaction.voucher_code.is_none());
}

/// Spec scenario: voucher at max_claims 50/50 → no discount, total =
/// subtotal, claim count untouched.
#[tokio::test]
async fn at_cap_voucher_gives_no_discount() {
    let db = test_db().await;
    let product_id = seed_product(&db, "SKU001123", 35_000, 50).await;
    seed_voucher(&db, "FLASH30", 30, 50, Some(50)).await;

    let receipt = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 35_000, 1)],
            voucher_code: Some("FLASH30".to_string()),
            total_paid_cents: 35_000,
        })
        .await
        .expect("commit");

    assert_eq!(receipt.transaction.discount_cents, 0);
    assert_eq!(receipt.transaction.total_cents, 35_000);

    let voucher = db.vouchers().get_by_code("FLASH30").await.unwrap().unwrap();
    assert_eq!(voucher.claimed_count, 50);
}

/// Consuming the last claim flips the voucher to expired in the same
/// commit, so no later checkout sees an active-but-empty voucher.
#[tokio::test]
async fn last_claim_flips_voucher_to_expired() {
    let db = test_db().await;
    let product_id = seed_product(&db, "SKU001123", 35_000, 50).await;
    seed_voucher(&db, "SUMMER25", 25, 99, Some(100)).await;

    let receipt = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 35_000, 2)],
            voucher_code: Some("SUMMER25".to_string()),
            total_paid_cents: 52_500,
        })
        .await
        .expect("commit");

    assert_eq!(receipt.transaction.discount_cents, 17_500);
    assert_eq!(receipt.transaction.total_cents, 52_500);

    let voucher = db.vouchers().get_by_code("SUMMER25").await.unwrap().unwrap();
    assert_eq!(voucher.claimed_count, 100);
    assert_eq!(voucher.status, VoucherStatus::Expired);

    // The next checkout gets no discount from it
    let next = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 35_000, 1)],
            voucher_code: Some("SUMMER25".to_string()),
            total_paid_cents: 35_000,
        })
        .await
        .expect("commit");
    assert_eq!(next.transaction.discount_cents, 0);
}

// =============================================================================
// Commit: rejection paths (nothing persisted)
// =============================================================================

#[tokio::test]
async fn empty_cart_rejected_before_any_write() {
    let db = test_db().await;

    let err = db
        .orders()
        .commit(OrderRequest {
            lines: vec![],
            voucher_code: None,
            total_paid_cents: 0,
        })
        .await
        .expect_err("empty cart must fail");

    assert!(matches!(
        err,
        DbError::Core(CoreError::Validation(_))
    ));
    assert_eq!(transaction_count(&db).await, 0);
}

#[tokio::test]
async fn underpayment_rejected_and_rolled_back() {
    let db = test_db().await;
    let product_id = seed_product(&db, "SKU001123", 35_000, 50).await;

    let err = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 35_000, 2)],
            voucher_code: None,
            total_paid_cents: 60_000,
        })
        .await
        .expect_err("underpayment must fail");

    assert!(matches!(
        err,
        DbError::Core(CoreError::InvalidPaymentAmount { .. })
    ));
    assert_eq!(transaction_count(&db).await, 0);
    assert_eq!(product_stock(&db, &product_id).await, 50);
}

/// Spec scenario: stock 5, qty 5 commits and zeroes the stock; the
/// next qty 1 commit fails with no transaction row created.
#[tokio::test]
async fn exact_stock_commits_then_next_commit_fails() {
    let db = test_db().await;
    let product_id = seed_product(&db, "SKU001126", 42_000, 5).await;

    db.orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 42_000, 5)],
            voucher_code: None,
            total_paid_cents: 210_000,
        })
        .await
        .expect("exact stock commit");

    assert_eq!(product_stock(&db, &product_id).await, 0);
    assert_eq!(transaction_count(&db).await, 1);

    let err = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 42_000, 1)],
            voucher_code: None,
            total_paid_cents: 42_000,
        })
        .await
        .expect_err("empty shelf must fail");

    match err {
        DbError::Core(CoreError::InsufficientStock {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 0);
            assert_eq!(requested, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(transaction_count(&db).await, 1);
    assert_eq!(product_stock(&db, &product_id).await, 0);
}

/// A short line anywhere in the cart aborts the whole order: earlier
/// lines' decrements, the transaction row, the item rows and the
/// voucher claim all roll back.
#[tokio::test]
async fn insufficient_stock_rolls_back_whole_order() {
    let db = test_db().await;
    let plenty = seed_product(&db, "SKU001123", 35_000, 50).await;
    let scarce = seed_product(&db, "SKU001127", 55_000, 2).await;
    seed_voucher(&db, "WELCOME10", 10, 5, Some(200)).await;

    let err = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&plenty, 35_000, 3), line(&scarce, 55_000, 3)],
            voucher_code: Some("WELCOME10".to_string()),
            total_paid_cents: 1_000_000,
        })
        .await
        .expect_err("short line must abort the order");

    assert!(matches!(
        err,
        DbError::Core(CoreError::InsufficientStock { .. })
    ));

    // Nothing moved
    assert_eq!(transaction_count(&db).await, 0);
    assert_eq!(product_stock(&db, &plenty).await, 50);
    assert_eq!(product_stock(&db, &scarce).await, 2);

    let voucher = db
        .vouchers()
        .get_by_code("WELCOME10")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(voucher.claimed_count, 5);
}

#[tokio::test]
async fn unknown_product_rejected() {
    let db = test_db().await;

    let err = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line("no-such-product", 1_000, 1)],
            voucher_code: None,
            total_paid_cents: 1_000,
        })
        .await
        .expect_err("unknown product must fail");

    assert!(matches!(
        err,
        DbError::Core(CoreError::ProductNotFound(_))
    ));
    assert_eq!(transaction_count(&db).await, 0);
}

// =============================================================================
// Status transitions
// =============================================================================

#[tokio::test]
async fn refund_restores_stock_exactly_once() {
    let db = test_db().await;
    let product_id = seed_product(&db, "SKU001123", 35_000, 50).await;

    let receipt = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 35_000, 4)],
            voucher_code: None,
            total_paid_cents: 140_000,
        })
        .await
        .expect("commit");

    assert_eq!(product_stock(&db, &product_id).await, 46);

    let refunded = db
        .orders()
        .transition_status(&receipt.transaction.id, TransactionStatus::Refunded)
        .await
        .expect("refund");

    assert_eq!(refunded.status, TransactionStatus::Refunded);
    assert_eq!(product_stock(&db, &product_id).await, 50);

    // Re-refunding must be rejected - and must NOT restore again
    let err = db
        .orders()
        .transition_status(&receipt.transaction.id, TransactionStatus::Refunded)
        .await
        .expect_err("double refund must fail");

    assert!(matches!(
        err,
        DbError::Core(CoreError::InvalidStatusTransition { .. })
    ));
    assert_eq!(product_stock(&db, &product_id).await, 50);

    // Nor can a refunded transaction be voided
    let err = db
        .orders()
        .transition_status(&receipt.transaction.id, TransactionStatus::Voided)
        .await
        .expect_err("refunded → voided must fail");
    assert!(matches!(
        err,
        DbError::Core(CoreError::InvalidStatusTransition { .. })
    ));
}

/// Refund does not give claims back: a redemption stays spent.
#[tokio::test]
async fn refund_does_not_reverse_voucher_claim() {
    let db = test_db().await;
    let product_id = seed_product(&db, "SKU001123", 35_000, 50).await;
    seed_voucher(&db, "WELCOME10", 10, 5, Some(200)).await;

    let receipt = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 35_000, 2)],
            voucher_code: Some("WELCOME10".to_string()),
            total_paid_cents: 63_000,
        })
        .await
        .expect("commit");

    db.orders()
        .transition_status(&receipt.transaction.id, TransactionStatus::Voided)
        .await
        .expect("void");

    let voucher = db
        .vouchers()
        .get_by_code("WELCOME10")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(voucher.claimed_count, 6);
}

#[tokio::test]
async fn completed_is_not_a_transition_target() {
    let db = test_db().await;
    let product_id = seed_product(&db, "SKU001123", 35_000, 50).await;

    let receipt = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 35_000, 1)],
            voucher_code: None,
            total_paid_cents: 35_000,
        })
        .await
        .expect("commit");

    let err = db
        .orders()
        .transition_status(&receipt.transaction.id, TransactionStatus::Completed)
        .await
        .expect_err("completed target must fail");

    assert!(matches!(
        err,
        DbError::Core(CoreError::InvalidStatusTransition { .. })
    ));
}

#[tokio::test]
async fn transition_of_missing_transaction_is_not_found() {
    let db = test_db().await;

    let err = db
        .orders()
        .transition_status("no-such-id", TransactionStatus::Refunded)
        .await
        .expect_err("missing transaction must fail");

    assert!(matches!(
        err,
        DbError::Core(CoreError::TransactionNotFound(_))
    ));
}

// =============================================================================
// Reporting & derived data
// =============================================================================

#[tokio::test]
async fn popular_badges_follow_completed_sales() {
    let db = test_db().await;
    let americano = seed_product(&db, "SKU001123", 35_000, 100).await;
    let cake = seed_product(&db, "SKU001126", 42_000, 100).await;

    db.orders()
        .commit(OrderRequest {
            lines: vec![line(&americano, 35_000, 10)],
            voucher_code: None,
            total_paid_cents: 350_000,
        })
        .await
        .expect("commit");

    let receipt = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&cake, 42_000, 2)],
            voucher_code: None,
            total_paid_cents: 84_000,
        })
        .await
        .expect("commit");

    // Both in the top 3 of a two-product shop
    let americano_row = db.products().get_by_id(&americano).await.unwrap().unwrap();
    let cake_row = db.products().get_by_id(&cake).await.unwrap().unwrap();
    assert!(americano_row.popular);
    assert!(cake_row.popular);

    // Refunding the cake sale removes it from the completed set
    db.orders()
        .transition_status(&receipt.transaction.id, TransactionStatus::Voided)
        .await
        .expect("void");

    let cake_row = db.products().get_by_id(&cake).await.unwrap().unwrap();
    assert!(!cake_row.popular);
}

#[tokio::test]
async fn stats_cover_completed_transactions_only() {
    let db = test_db().await;
    let product_id = seed_product(&db, "SKU001123", 35_000, 100).await;
    seed_voucher(&db, "WELCOME10", 10, 0, None).await;

    db.orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 35_000, 2)],
            voucher_code: Some("WELCOME10".to_string()),
            total_paid_cents: 63_000,
        })
        .await
        .expect("commit");

    let voided = db
        .orders()
        .commit(OrderRequest {
            lines: vec![line(&product_id, 35_000, 1)],
            voucher_code: None,
            total_paid_cents: 35_000,
        })
        .await
        .expect("commit");
    db.orders()
        .transition_status(&voided.transaction.id, TransactionStatus::Voided)
        .await
        .expect("void");

    let report = db.orders().stats().await.expect("stats");
    assert_eq!(report.stats.total_transactions, 1);
    assert_eq!(report.stats.total_revenue_cents, 63_000);
    assert_eq!(report.stats.total_discounts_cents, 7_000);
    assert_eq!(report.stats.vouchers_used, 1);
    assert_eq!(report.top_products.len(), 1);
    assert_eq!(report.top_products[0].total_quantity, 2);
}

#[tokio::test]
async fn list_returns_newest_first_with_items() {
    let db = test_db().await;
    let product_id = seed_product(&db, "SKU001123", 35_000, 100).await;

    for qty in [1_i64, 2, 3] {
        db.orders()
            .commit(OrderRequest {
                lines: vec![line(&product_id, 35_000, qty)],
                voucher_code: None,
                total_paid_cents: 35_000 * qty,
            })
            .await
            .expect("commit");
    }

    let all = db.orders().list(None).await.expect("list");
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|d| d.items.len() == 1));
    assert!(all
        .windows(2)
        .all(|w| w[0].transaction.created_at >= w[1].transaction.created_at));
}
