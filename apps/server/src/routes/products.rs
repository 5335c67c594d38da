//! Product catalog routes.
//!
//! Inventory CRUD plus the signed stock adjustment used by the
//! inventory screen. The checkout flow never goes through these
//! endpoints - its stock movement happens inside the order commit.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use kopi_core::validation::{
    validate_price_cents, validate_product_name, validate_sku, validate_stock,
};
use kopi_core::Product;
use kopi_db::ProductInput;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/{id}/stock", patch(adjust_stock))
}

/// Product create/update payload.
#[derive(Debug, Deserialize)]
pub struct ProductPayload {
    pub name: String,
    pub sku: String,
    pub price_cents: i64,
    #[serde(default)]
    pub image: Option<String>,
    pub category: String,
    pub supplier: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stock: i64,
}

impl ProductPayload {
    /// Field validation before touching the database.
    fn validate(&self) -> Result<(), ApiError> {
        validate_product_name(&self.name)?;
        validate_sku(&self.sku)?;
        validate_price_cents(self.price_cents)?;
        validate_stock(self.stock)?;
        Ok(())
    }

    fn into_input(self) -> ProductInput {
        ProductInput {
            name: self.name,
            sku: self.sku,
            price_cents: self.price_cents,
            image: self.image,
            category: self.category,
            supplier: self.supplier,
            description: self.description,
            stock: self.stock,
        }
    }
}

/// Signed stock delta; negative removes stock.
#[derive(Debug, Deserialize)]
pub struct StockAdjustment {
    pub adjustment: i64,
}

pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.db.products().list().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    payload.validate()?;

    let product = state.db.products().insert(payload.into_input()).await?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Product>, ApiError> {
    payload.validate()?;

    state.db.products().update(&id, payload.into_input()).await?;

    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db.products().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /products/{id}/stock` - applies a signed delta, rejecting a
/// result below zero. Used by the inventory screen's +/- controls.
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StockAdjustment>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .db
        .products()
        .adjust_stock(&id, body.adjustment)
        .await?;

    Ok(Json(product))
}
