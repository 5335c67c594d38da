//! Router-level tests: drive the full axum application against an
//! in-memory database through tower's `oneshot`, asserting the wire
//! contract (status codes and JSON shapes) the SPA depends on.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use kopi_db::{Database, DbConfig};
use kopi_server::{build_app, AppState};

// =============================================================================
// Helpers
// =============================================================================

async fn test_app() -> Router {
    let db = Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database");
    build_app(AppState::new(db))
}

/// Sends one request and returns (status, parsed JSON body).
/// Empty bodies (204) come back as `Value::Null`.
async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();

    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };

    (status, value)
}

fn product_payload(sku: &str, price_cents: i64, stock: i64) -> Value {
    json!({
        "name": format!("Product {sku}"),
        "sku": sku,
        "price_cents": price_cents,
        "category": "Beverages",
        "supplier": "ABC Foods",
        "description": "Test product",
        "stock": stock,
    })
}

async fn create_product(app: &Router, sku: &str, price_cents: i64, stock: i64) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/products",
        Some(product_payload(sku, price_cents, stock)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().expect("product id").to_string()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_reports_database_status() {
    let app = test_app().await;

    let (status, body) = send(&app, "GET", "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "ok");
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn product_crud_and_stock_adjustment() {
    let app = test_app().await;
    let id = create_product(&app, "SKU001123", 35_000, 50).await;

    // Read back
    let (status, body) = send(&app, "GET", &format!("/api/products/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sku"], "SKU001123");
    assert_eq!(body["price_cents"], 35_000);
    assert_eq!(body["popular"], false);

    // Full update
    let mut updated = product_payload("SKU001123", 37_000, 50);
    updated["name"] = json!("Americano Large");
    let (status, body) = send(&app, "PUT", &format!("/api/products/{id}"), Some(updated)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Americano Large");
    assert_eq!(body["price_cents"], 37_000);

    // Positive adjustment
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/products/{id}/stock"),
        Some(json!({"adjustment": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock"], 60);

    // Adjustment that would go negative is rejected, stock untouched
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/products/{id}/stock"),
        Some(json!({"adjustment": -1000})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let (_, body) = send(&app, "GET", &format!("/api/products/{id}"), None).await;
    assert_eq!(body["stock"], 60);

    // Delete, then 404
    let (status, _) = send(&app, "DELETE", &format!("/api/products/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/products/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_sku_is_a_conflict() {
    let app = test_app().await;
    create_product(&app, "SKU001123", 35_000, 50).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/products",
        Some(product_payload("SKU001123", 40_000, 10)),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn invalid_product_payload_is_rejected() {
    let app = test_app().await;

    let mut bad = product_payload("", 35_000, 50);
    bad["sku"] = json!("");
    let (status, body) = send(&app, "POST", "/api/products", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let mut negative = product_payload("SKU9", -5, 50);
    negative["price_cents"] = json!(-5);
    let (status, _) = send(&app, "POST", "/api/products", Some(negative)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Vouchers
// =============================================================================

#[tokio::test]
async fn voucher_validation_outcomes() {
    let app = test_app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/vouchers",
        Some(json!({
            "code": "WELCOME10",
            "description": "New customer discount",
            "discount": 10,
            "max_claims": 200,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Redeemable
    let (status, body) = send(
        &app,
        "POST",
        "/api/vouchers/validate",
        Some(json!({"code": "WELCOME10"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["discount_percentage"], 10);

    // Unknown code
    let (status, body) = send(
        &app,
        "POST",
        "/api/vouchers/validate",
        Some(json!({"code": "NOSUCHCODE"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["valid"], false);
    assert_eq!(body["message"], "Voucher not found or expired");

    // Expired by date: yesterday's voucher flips and reports expired
    let (status, _) = send(
        &app,
        "POST",
        "/api/vouchers",
        Some(json!({
            "code": "OLD5",
            "description": "Bygone promo",
            "discount": 5,
            "expiry_date": "2020-01-01",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/vouchers/validate",
        Some(json!({"code": "OLD5"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Voucher has expired");

    let (_, body) = send(&app, "GET", "/api/vouchers/OLD5", None).await;
    assert_eq!(body["status"], "expired");
}

#[tokio::test]
async fn voucher_discount_out_of_range_rejected() {
    let app = test_app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/vouchers",
        Some(json!({
            "code": "TOOBIG",
            "description": "101% off",
            "discount": 101,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn checkout_commits_and_returns_receipt() {
    let app = test_app().await;
    let product_id = create_product(&app, "SKU001123", 35_000, 50).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/vouchers",
        Some(json!({
            "code": "WELCOME10",
            "description": "New customer discount",
            "discount": 10,
            "max_claims": 200,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(json!({
            "items": [{"id": product_id, "price": 35_000, "quantity": 2}],
            "voucherCode": "WELCOME10",
            "totalPaid": 63_000,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["subtotal_cents"], 70_000);
    assert_eq!(body["discount_cents"], 7_000);
    assert_eq!(body["total_cents"], 63_000);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["voucher_code"], "WELCOME10");
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["price_at_time_cents"], 35_000);
    assert!(body["transaction_id"].as_str().unwrap().starts_with("TRX-"));

    // Stock moved
    let (_, product) = send(&app, "GET", &format!("/api/products/{product_id}"), None).await;
    assert_eq!(product["stock"], 48);
}

/// The legacy SPA posts to /transactions/order with client-computed
/// totals; the server ignores them and recomputes.
#[tokio::test]
async fn legacy_order_endpoint_ignores_client_totals() {
    let app = test_app().await;
    let product_id = create_product(&app, "SKU001124", 38_000, 25).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/transactions/order",
        Some(json!({
            "items": [{"id": product_id, "price": 38_000, "quantity": 1}],
            "totalAmount": 1,
            "discountAmount": 37_999,
            "voucherCode": null,
            "totalPaid": 38_000,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    // The tampered discount never made it through
    assert_eq!(body["discount_cents"], 0);
    assert_eq!(body["total_cents"], 38_000);
}

#[tokio::test]
async fn checkout_with_insufficient_stock_persists_nothing() {
    let app = test_app().await;
    let product_id = create_product(&app, "SKU001126", 42_000, 5).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(json!({
            "items": [{"id": product_id, "price": 42_000, "quantity": 6}],
            "totalPaid": 252_000,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let (_, transactions) = send(&app, "GET", "/api/transactions", None).await;
    assert_eq!(transactions.as_array().unwrap().len(), 0);

    let (_, product) = send(&app, "GET", &format!("/api/products/{product_id}"), None).await;
    assert_eq!(product["stock"], 5);
}

#[tokio::test]
async fn empty_cart_is_a_validation_error() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(json!({"items": [], "totalPaid": 0})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn underpayment_is_a_payment_error() {
    let app = test_app().await;
    let product_id = create_product(&app, "SKU001125", 45_000, 20).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(json!({
            "items": [{"id": product_id, "price": 45_000, "quantity": 1}],
            "totalPaid": 40_000,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PAYMENT_ERROR");
}

// =============================================================================
// Status transitions & reporting
// =============================================================================

#[tokio::test]
async fn refund_flow_and_double_transition_guard() {
    let app = test_app().await;
    let product_id = create_product(&app, "SKU001123", 35_000, 50).await;

    let (_, receipt) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(json!({
            "items": [{"id": product_id, "price": 35_000, "quantity": 4}],
            "totalPaid": 140_000,
        })),
    )
    .await;
    let tx_id = receipt["id"].as_str().unwrap().to_string();

    let (_, product) = send(&app, "GET", &format!("/api/products/{product_id}"), None).await;
    assert_eq!(product["stock"], 46);

    // Refund restores stock
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/transactions/{tx_id}/status"),
        Some(json!({"status": "refunded"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "refunded");

    let (_, product) = send(&app, "GET", &format!("/api/products/{product_id}"), None).await;
    assert_eq!(product["stock"], 50);

    // Second transition is rejected
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/transactions/{tx_id}/status"),
        Some(json!({"status": "voided"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "BUSINESS_LOGIC");

    let (_, product) = send(&app, "GET", &format!("/api/products/{product_id}"), None).await;
    assert_eq!(product["stock"], 50);
}

#[tokio::test]
async fn transaction_listing_and_stats() {
    let app = test_app().await;
    let product_id = create_product(&app, "SKU001123", 35_000, 100).await;

    for qty in [1, 2] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/transactions",
            Some(json!({
                "items": [{"id": product_id, "price": 35_000, "quantity": qty}],
                "totalPaid": 35_000 * qty,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, "GET", "/api/transactions", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert!(list.iter().all(|t| t["items"].as_array().unwrap().len() == 1));

    // A far-future range matches nothing
    let (status, body) = send(
        &app,
        "GET",
        "/api/transactions?start_date=2099-01-01&end_date=2099-01-31",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);

    let (status, body) = send(&app, "GET", "/api/transactions/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total_transactions"], 2);
    assert_eq!(body["stats"]["total_revenue_cents"], 105_000);
    assert_eq!(body["top_products"][0]["total_quantity"], 3);

    let (status, _) = send(&app, "GET", "/api/transactions/no-such-id", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
