//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Operations
//! - CRUD for the inventory screens
//! - Atomic stock adjustment (used by the stock endpoint)
//! - Popularity recomputation (explicit, idempotent)
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read-then-write (loses updates under concurrency)           │
//! │     let p = get(id); update(id, p.stock - 3);                          │
//! │                                                                         │
//! │  ✅ CORRECT: conditional delta update, guarded in SQL                  │
//! │     UPDATE products SET stock = stock + ?delta                         │
//! │     WHERE id = ? AND stock + ?delta >= 0                               │
//! │                                                                         │
//! │  Why?                                                                   │
//! │  Register A: sells 3 ──┐                                               │
//! │  Register B: sells 2 ──┴─► both deltas apply, row serializes them,     │
//! │                            and neither can drive stock negative        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kopi_core::{CoreError, Product, POPULAR_PRODUCT_COUNT};

/// New or replacement product data, as accepted by the inventory API.
///
/// `popular` is absent on purpose: it is derived from sales and only
/// ever written by [`ProductRepository::recompute_popular`].
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub sku: String,
    pub price_cents: i64,
    pub image: Option<String>,
    pub category: String,
    pub supplier: String,
    pub description: Option<String>,
    pub stock: i64,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists all products, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, sku, price_cents, image, category, supplier,
                   popular, description, stock, created_at, updated_at
            FROM products
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, sku, price_cents, image, category, supplier,
                   popular, description, stock, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, sku, price_cents, image, category, supplier,
                   popular, description, stock, created_at, updated_at
            FROM products
            WHERE sku = ?1
            "#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The inserted product with generated fields
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, input: ProductInput) -> DbResult<Product> {
        debug!(sku = %input.sku, "Inserting product");

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            sku: input.sku,
            price_cents: input.price_cents,
            image: input.image,
            category: input.category,
            supplier: input.supplier,
            popular: false,
            description: input.description,
            stock: input.stock,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, sku, price_cents, image, category, supplier,
                popular, description, stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.price_cents)
        .bind(&product.image)
        .bind(&product.category)
        .bind(&product.supplier)
        .bind(product.popular)
        .bind(&product.description)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Updates an existing product.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, id: &str, input: ProductInput) -> DbResult<()> {
        debug!(id = %id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                sku = ?3,
                price_cents = ?4,
                image = ?5,
                category = ?6,
                supplier = ?7,
                description = ?8,
                stock = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.sku)
        .bind(input.price_cents)
        .bind(&input.image)
        .bind(&input.category)
        .bind(&input.supplier)
        .bind(&input.description)
        .bind(input.stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Deletes a product.
    ///
    /// Hard delete. Historical transaction items keep their price
    /// snapshots but still reference the product row, so deleting a
    /// product that has ever been sold fails with a foreign key
    /// violation rather than orphaning receipts.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Applies a signed stock adjustment, rejecting a negative result.
    ///
    /// The guard lives in the WHERE clause so two concurrent
    /// adjustments cannot race past it.
    ///
    /// ## Arguments
    /// * `id` - Product ID
    /// * `adjustment` - Signed delta (negative to remove stock)
    ///
    /// ## Returns
    /// The product after the adjustment.
    pub async fn adjust_stock(&self, id: &str, adjustment: i64) -> DbResult<Product> {
        debug!(id = %id, adjustment = %adjustment, "Adjusting stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1 AND stock + ?2 >= 0
            "#,
        )
        .bind(id)
        .bind(adjustment)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish "no such product" from "would go negative"
            let product = self
                .get_by_id(id)
                .await?
                .ok_or_else(|| DbError::not_found("Product", id))?;

            return Err(DbError::Core(CoreError::InsufficientStock {
                sku: product.sku,
                available: product.stock,
                requested: -adjustment,
            }));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Recomputes the `popular` badge: top best sellers by quantity
    /// across completed transactions.
    ///
    /// Idempotent - clears every badge, then re-awards the top
    /// [`POPULAR_PRODUCT_COUNT`]. Invoked after order commits and
    /// status transitions; safe to run any time.
    pub async fn recompute_popular(&self) -> DbResult<()> {
        debug!("Recomputing popular products");

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE products SET popular = 0 WHERE popular = 1")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE products SET popular = 1
            WHERE id IN (
                SELECT ti.product_id
                FROM transaction_items ti
                JOIN transactions t ON t.id = ti.transaction_id
                WHERE t.status = 'completed'
                GROUP BY ti.product_id
                ORDER BY SUM(ti.quantity) DESC
                LIMIT ?1
            )
            "#,
        )
        .bind(POPULAR_PRODUCT_COUNT)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
