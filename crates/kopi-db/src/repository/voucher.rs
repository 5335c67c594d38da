//! # Voucher Repository
//!
//! Database operations for discount vouchers.
//!
//! ## Voucher Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Voucher Lifecycle                                 │
//! │                                                                         │
//! │  1. CREATE (admin)                                                     │
//! │     └── insert() → Voucher { status: Active, claimed_count: 0 }        │
//! │                                                                         │
//! │  2. VALIDATE (cashier, advisory)                                       │
//! │     └── validate() → Valid { discount } | NotFound | Expired | ...     │
//! │                                                                         │
//! │  3. CLAIM (inside the order commit transaction)                        │
//! │     └── guarded claimed_count increment, auto-flip to Expired          │
//! │         when the cap is reached                                        │
//! │                                                                         │
//! │  4. EXPIRE                                                             │
//! │     ├── automatically: cap reached, or expiry date passed              │
//! │     └── manually: admin sets status to Inactive                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The claim step deliberately lives in [`crate::repository::order`] so
//! it shares the commit's transaction; this repository owns everything
//! reachable from the admin screens and the advisory validate endpoint.

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kopi_core::{Voucher, VoucherStatus};

/// New or replacement voucher data, as accepted by the admin API.
#[derive(Debug, Clone)]
pub struct VoucherInput {
    pub code: String,
    pub description: String,
    pub discount: i64,
    pub max_claims: Option<i64>,
    pub expiry_date: Option<NaiveDate>,
    pub status: VoucherStatus,
}

/// Outcome of the advisory validation check.
///
/// Advisory only: the order commit re-checks redeemability inside its
/// own transaction, so a voucher can still lapse between a `Valid`
/// answer and the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoucherValidation {
    /// Redeemable right now; discount percentage attached.
    Valid { discount_percentage: i64 },
    /// No such code, or the voucher is not active.
    NotFound,
    /// The expiry date has passed (status was flipped to Expired).
    Expired,
    /// Every claim has been used.
    ClaimsExhausted,
}

/// Repository for voucher database operations.
#[derive(Debug, Clone)]
pub struct VoucherRepository {
    pool: SqlitePool,
}

impl VoucherRepository {
    /// Creates a new VoucherRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VoucherRepository { pool }
    }

    /// Lists all vouchers, newest first.
    pub async fn list(&self) -> DbResult<Vec<Voucher>> {
        let vouchers = sqlx::query_as::<_, Voucher>(
            r#"
            SELECT id, code, description, discount, claimed_count,
                   max_claims, expiry_date, status, created_at, updated_at
            FROM vouchers
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(vouchers)
    }

    /// Gets a voucher by its code (case-sensitive, as stored).
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Voucher>> {
        let voucher = sqlx::query_as::<_, Voucher>(
            r#"
            SELECT id, code, description, discount, claimed_count,
                   max_claims, expiry_date, status, created_at, updated_at
            FROM vouchers
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(voucher)
    }

    /// Inserts a new voucher.
    ///
    /// ## Returns
    /// * `Ok(Voucher)` - The inserted voucher
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    pub async fn insert(&self, input: VoucherInput) -> DbResult<Voucher> {
        debug!(code = %input.code, "Inserting voucher");

        let now = Utc::now();
        let voucher = Voucher {
            id: Uuid::new_v4().to_string(),
            code: input.code,
            description: input.description,
            discount: input.discount,
            claimed_count: 0,
            max_claims: input.max_claims,
            expiry_date: input.expiry_date,
            status: input.status,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO vouchers (
                id, code, description, discount, claimed_count,
                max_claims, expiry_date, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&voucher.id)
        .bind(&voucher.code)
        .bind(&voucher.description)
        .bind(voucher.discount)
        .bind(voucher.claimed_count)
        .bind(voucher.max_claims)
        .bind(voucher.expiry_date)
        .bind(voucher.status)
        .bind(voucher.created_at)
        .bind(voucher.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(voucher)
    }

    /// Updates a voucher, addressed by code.
    ///
    /// `claimed_count` is untouched: redemption history survives edits.
    pub async fn update(&self, code: &str, input: VoucherInput) -> DbResult<Voucher> {
        debug!(code = %code, "Updating voucher");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE vouchers SET
                code = ?2,
                description = ?3,
                discount = ?4,
                max_claims = ?5,
                expiry_date = ?6,
                status = ?7,
                updated_at = ?8
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .bind(&input.code)
        .bind(&input.description)
        .bind(input.discount)
        .bind(input.max_claims)
        .bind(input.expiry_date)
        .bind(input.status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Voucher", code));
        }

        self.get_by_code(&input.code)
            .await?
            .ok_or_else(|| DbError::not_found("Voucher", code))
    }

    /// Deletes a voucher, addressed by code.
    ///
    /// Committed transactions keep their denormalized `voucher_code`,
    /// so receipts stay intact.
    pub async fn delete(&self, code: &str) -> DbResult<()> {
        debug!(code = %code, "Deleting voucher");

        let result = sqlx::query("DELETE FROM vouchers WHERE code = ?1")
            .bind(code)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Voucher", code));
        }

        Ok(())
    }

    /// Advisory redeemability check for the cashier UI.
    ///
    /// ## Algorithm
    /// 1. Fetch by code; absent or status != active → `NotFound`
    /// 2. Expiry date passed → flip status to `Expired`, report `Expired`
    /// 3. Claim cap reached → `ClaimsExhausted`
    /// 4. Otherwise `Valid` with the discount percentage
    ///
    /// Step 2 is the one place the expiry flip happens lazily; the
    /// commit workflow never applies a voucher past its expiry either
    /// way.
    pub async fn validate(&self, code: &str) -> DbResult<VoucherValidation> {
        let Some(voucher) = self.get_by_code(code).await? else {
            return Ok(VoucherValidation::NotFound);
        };

        if voucher.status != VoucherStatus::Active {
            return Ok(VoucherValidation::NotFound);
        }

        let today = Utc::now().date_naive();

        if voucher.is_past_expiry(today) {
            debug!(code = %code, "Voucher past expiry, flipping status");
            self.mark_expired(&voucher.id).await?;
            return Ok(VoucherValidation::Expired);
        }

        if voucher.claims_exhausted() {
            return Ok(VoucherValidation::ClaimsExhausted);
        }

        Ok(VoucherValidation::Valid {
            discount_percentage: voucher.discount,
        })
    }

    /// Flips a voucher to `Expired`.
    async fn mark_expired(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query("UPDATE vouchers SET status = 'expired', updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
