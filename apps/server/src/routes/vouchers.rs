//! Voucher administration and validation routes.
//!
//! Vouchers are addressed by code (the admin screens never see UUIDs).
//! `POST /vouchers/validate` is the advisory pre-checkout check; the
//! order commit re-validates inside its own transaction.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use kopi_core::validation::{
    validate_discount_percent, validate_max_claims, validate_voucher_code,
};
use kopi_core::{Voucher, VoucherStatus};
use kopi_db::{VoucherInput, VoucherValidation};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vouchers", get(list_vouchers).post(create_voucher))
        .route(
            "/vouchers/{code}",
            get(get_voucher).put(update_voucher).delete(delete_voucher),
        )
        .route("/vouchers/validate", post(validate_voucher))
}

/// Voucher create/update payload.
#[derive(Debug, Deserialize)]
pub struct VoucherPayload {
    pub code: String,
    pub description: String,
    pub discount: i64,
    #[serde(default)]
    pub max_claims: Option<i64>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<VoucherStatus>,
}

impl VoucherPayload {
    fn validate(&self) -> Result<(), ApiError> {
        validate_voucher_code(&self.code)?;
        validate_discount_percent(self.discount)?;
        validate_max_claims(self.max_claims)?;
        Ok(())
    }

    fn into_input(self) -> VoucherInput {
        VoucherInput {
            code: self.code,
            description: self.description,
            discount: self.discount,
            max_claims: self.max_claims,
            expiry_date: self.expiry_date,
            status: self.status.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub code: String,
}

/// `{valid: true, discount_percentage}` or `{valid: false, message}`.
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub async fn list_vouchers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Voucher>>, ApiError> {
    Ok(Json(state.db.vouchers().list().await?))
}

pub async fn get_voucher(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Voucher>, ApiError> {
    let voucher = state
        .db
        .vouchers()
        .get_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::not_found("Voucher", &code))?;

    Ok(Json(voucher))
}

pub async fn create_voucher(
    State(state): State<AppState>,
    Json(payload): Json<VoucherPayload>,
) -> Result<(StatusCode, Json<Voucher>), ApiError> {
    payload.validate()?;

    let voucher = state.db.vouchers().insert(payload.into_input()).await?;

    Ok((StatusCode::CREATED, Json(voucher)))
}

pub async fn update_voucher(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(payload): Json<VoucherPayload>,
) -> Result<Json<Voucher>, ApiError> {
    payload.validate()?;

    let voucher = state
        .db
        .vouchers()
        .update(&code, payload.into_input())
        .await?;

    Ok(Json(voucher))
}

pub async fn delete_voucher(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db.vouchers().delete(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Advisory redeemability check for the cashier screen.
///
/// Returns a non-2xx status for every invalid outcome so the SPA's
/// error path handles all of them uniformly; the body carries the
/// user-facing reason.
pub async fn validate_voucher(
    State(state): State<AppState>,
    Json(body): Json<ValidateRequest>,
) -> Result<(StatusCode, Json<ValidateResponse>), ApiError> {
    let outcome = state.db.vouchers().validate(&body.code).await?;

    let (status, response) = match outcome {
        VoucherValidation::Valid {
            discount_percentage,
        } => (
            StatusCode::OK,
            ValidateResponse {
                valid: true,
                discount_percentage: Some(discount_percentage),
                message: None,
            },
        ),
        VoucherValidation::NotFound => (
            StatusCode::NOT_FOUND,
            ValidateResponse {
                valid: false,
                discount_percentage: None,
                message: Some("Voucher not found or expired"),
            },
        ),
        VoucherValidation::Expired => (
            StatusCode::BAD_REQUEST,
            ValidateResponse {
                valid: false,
                discount_percentage: None,
                message: Some("Voucher has expired"),
            },
        ),
        VoucherValidation::ClaimsExhausted => (
            StatusCode::BAD_REQUEST,
            ValidateResponse {
                valid: false,
                discount_percentage: None,
                message: Some("Voucher has reached maximum claims"),
            },
        ),
    };

    Ok((status, Json(response)))
}
