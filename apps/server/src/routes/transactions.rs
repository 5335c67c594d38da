//! Transaction routes: checkout, status transitions, reporting.
//!
//! ## Checkout paths
//! ```text
//! POST /api/transactions        ← canonical commit endpoint
//! POST /api/transactions/order  ← legacy alias kept for the older SPA
//!                                 build; identical semantics
//! ```
//! Both feed the same [`OrderRequest`]. The legacy body's
//! `totalAmount`/`discountAmount` fields are accepted and ignored:
//! totals are always recomputed server-side from the cart and the
//! voucher row inside the commit transaction, so a tampered or stale
//! client can never buy at the wrong price.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;

use kopi_core::{OrderLine, Transaction, TransactionStatus};
use kopi_db::{OrderRequest, StatsReport, TransactionDetail};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(checkout))
        .route("/transactions/order", post(checkout))
        .route("/transactions/stats", get(stats))
        .route("/transactions/{id}", get(get_transaction))
        .route("/transactions/{id}/status", patch(update_status))
}

/// Checkout request body.
///
/// camelCase per the SPA's wire format, with snake_case aliases so the
/// older cashier build keeps working.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    #[serde(default, alias = "voucher_code")]
    pub voucher_code: Option<String>,
    #[serde(alias = "total_paid")]
    pub total_paid: i64,
}

/// One cart line as the client sends it: `{id, price, quantity}`.
#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    pub id: String,
    pub price: i64,
    pub quantity: i64,
}

impl From<CheckoutRequest> for OrderRequest {
    fn from(body: CheckoutRequest) -> Self {
        OrderRequest {
            lines: body
                .items
                .into_iter()
                .map(|item| OrderLine {
                    product_id: item.id,
                    price_cents: item.price,
                    quantity: item.quantity,
                })
                .collect(),
            voucher_code: body.voucher_code,
            total_paid_cents: body.total_paid,
        }
    }
}

/// Optional inclusive day range for the reporting list.
///
/// A lone `start_date` means "that single day".
#[derive(Debug, Deserialize)]
pub struct RangeParams {
    #[serde(default, alias = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, alias = "endDate")]
    pub end_date: Option<NaiveDate>,
}

impl RangeParams {
    fn into_range(self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((start, end)),
            (Some(start), None) => Some((start, start)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: TransactionStatus,
}

/// `POST /transactions` (and the legacy `/transactions/order`) - the
/// atomic order commit. 201 with the receipt, or nothing persisted.
pub async fn checkout(
    State(state): State<AppState>,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<TransactionDetail>), ApiError> {
    let receipt = state.db.orders().commit(body.into()).await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<TransactionDetail>>, ApiError> {
    Ok(Json(state.db.orders().list(params.into_range()).await?))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionDetail>, ApiError> {
    Ok(Json(state.db.orders().get(&id).await?))
}

/// `PATCH /transactions/{id}/status` - completed → refunded | voided,
/// restoring item quantities to product stock exactly once.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Transaction>, ApiError> {
    let transaction = state
        .db
        .orders()
        .transition_status(&id, body.status)
        .await?;

    Ok(Json(transaction))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsReport>, ApiError> {
    Ok(Json(state.db.orders().stats().await?))
}
