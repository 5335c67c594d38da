//! # Seed Data Generator
//!
//! Populates the database with the development catalog and voucher set.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p kopi-db --bin seed
//!
//! # Specify database path
//! cargo run -p kopi-db --bin seed -- --db ./data/kopi.db
//! ```
//!
//! Seeding is destructive: existing products and vouchers are removed
//! first so the dataset is deterministic.

use std::env;

use kopi_core::VoucherStatus;
use kopi_db::{Database, DbConfig, ProductInput, VoucherInput};

/// Café catalog: (name, sku, price_cents, category, supplier, popular
/// at seed time is irrelevant - badges are recomputed from sales),
/// description, stock.
const PRODUCTS: &[(&str, &str, i64, &str, &str, &str, i64)] = &[
    (
        "Americano",
        "SKU001123",
        35_000,
        "Beverages",
        "ABC Foods",
        "Rich espresso with hot water",
        50,
    ),
    (
        "Green Tea Latte",
        "SKU001124",
        38_000,
        "Beverages",
        "XYZ Beverages",
        "Matcha with steamed milk",
        25,
    ),
    (
        "Club Sandwich",
        "SKU001125",
        45_000,
        "Food",
        "Fresh Farms",
        "Triple-decker classic",
        20,
    ),
    (
        "Chocolate Cake",
        "SKU001126",
        42_000,
        "Desserts",
        "ABC Foods",
        "Rich dark chocolate",
        12,
    ),
    (
        "Macarons Set",
        "SKU001127",
        55_000,
        "Desserts",
        "ABC Foods",
        "Assorted flavors",
        8,
    ),
    (
        "Caesar Salad",
        "SKU001128",
        48_000,
        "Food",
        "Fresh Farms",
        "Fresh romaine lettuce",
        15,
    ),
];

/// Voucher set: (code, description, discount %, claimed, max_claims,
/// expiry YYYY-MM-DD, status).
const VOUCHERS: &[(&str, &str, i64, i64, Option<i64>, &str, VoucherStatus)] = &[
    (
        "WELCOME10",
        "New customer discount",
        10,
        145,
        Some(200),
        "2027-04-01",
        VoucherStatus::Active,
    ),
    (
        "SUMMER25",
        "Summer sale discount",
        25,
        89,
        Some(100),
        "2027-03-15",
        VoucherStatus::Active,
    ),
    (
        "SPECIAL15",
        "Special event discount",
        15,
        200,
        Some(200),
        "2026-02-01",
        VoucherStatus::Expired,
    ),
    (
        "FLASH30",
        "Flash sale discount",
        30,
        48,
        Some(50),
        "2027-03-30",
        VoucherStatus::Active,
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db_path = parse_db_path().unwrap_or_else(|| "./data/kopi.db".to_string());

    println!("Seeding database at {db_path}");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    // Clear existing entries so reseeding is deterministic. Items and
    // transactions go first to satisfy foreign keys.
    sqlx::query("DELETE FROM transaction_items")
        .execute(db.pool())
        .await?;
    sqlx::query("DELETE FROM transactions")
        .execute(db.pool())
        .await?;
    sqlx::query("DELETE FROM products").execute(db.pool()).await?;
    sqlx::query("DELETE FROM vouchers").execute(db.pool()).await?;

    let products = db.products();
    for (name, sku, price_cents, category, supplier, description, stock) in PRODUCTS {
        products
            .insert(ProductInput {
                name: name.to_string(),
                sku: sku.to_string(),
                price_cents: *price_cents,
                image: Some(format!(
                    "https://placehold.co/200x200/333/FFF?text={}",
                    name.replace(' ', "+")
                )),
                category: category.to_string(),
                supplier: supplier.to_string(),
                description: Some(description.to_string()),
                stock: *stock,
            })
            .await?;
    }
    println!("Seeded {} products", PRODUCTS.len());

    let vouchers = db.vouchers();
    for (code, description, discount, claimed, max_claims, expiry, status) in VOUCHERS {
        let voucher = vouchers
            .insert(VoucherInput {
                code: code.to_string(),
                description: description.to_string(),
                discount: *discount,
                max_claims: *max_claims,
                expiry_date: Some(expiry.parse()?),
                status: *status,
            })
            .await?;

        // Inserts start at zero claims; backfill the seed counts.
        sqlx::query("UPDATE vouchers SET claimed_count = ?2 WHERE id = ?1")
            .bind(&voucher.id)
            .bind(claimed)
            .execute(db.pool())
            .await?;
    }
    println!("Seeded {} vouchers", VOUCHERS.len());

    db.close().await;
    Ok(())
}

/// Parses `--db <path>` from the command line.
fn parse_db_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|a| a == "--db")
        .and_then(|i| args.get(i + 1))
        .cloned()
}
