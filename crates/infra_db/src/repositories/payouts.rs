//! Payout attempts repository
//!
//! An attempt is appended as `initiated` before the gateway is called and
//! completed once it answers. Each step also writes the claim's mirrored
//! payout sub-state, in one transaction guarded by the sub-state it expects.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::repositories::claims::{ClaimRow, ClaimsRepository, Conditional, CLAIM_COLUMNS};

const PAYOUT_COLUMNS: &str = r#"
    payout_id, claim_id, attempt, amount, currency,
    beneficiary_name, account_number, ifsc_code,
    status, transfer_id, reference, error_kind, error_message,
    created_at, updated_at
"#;

/// A row of the `payout_records` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PayoutRow {
    pub payout_id: Uuid,
    pub claim_id: Uuid,
    pub attempt: i32,
    pub amount: Decimal,
    pub currency: String,
    pub beneficiary_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub status: String,
    pub transfer_id: Option<String>,
    pub reference: Option<String>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PayoutRepository {
    pool: PgPool,
}

impl PayoutRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends `record` and points the claim at it.
    ///
    /// The claim must be approved and its payout sub-state must equal
    /// `expected_state` (`None` for the first attempt).
    pub async fn append_attempt(
        &self,
        record: &PayoutRow,
        claim_state: &str,
        expected_state: Option<&str>,
    ) -> Result<Conditional, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE claims SET
                payout_id = $2,
                payout_status = $3,
                payout_amount = $4,
                updated_at = now()
            WHERE claim_id = $1
              AND status = 'approved'
              AND payout_status IS NOT DISTINCT FROM $5
            RETURNING {CLAIM_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(record.claim_id)
            .bind(record.payout_id)
            .bind(claim_state)
            .bind(record.amount)
            .bind(expected_state)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(claim) = updated else {
            tx.rollback().await?;
            let current = ClaimsRepository::new(self.pool.clone())
                .current_state(record.claim_id)
                .await?;
            return Ok(Conditional::Missed(current));
        };

        sqlx::query(
            r#"
            INSERT INTO payout_records (
                payout_id, claim_id, attempt, amount, currency,
                beneficiary_name, account_number, ifsc_code,
                status, transfer_id, reference, error_kind, error_message,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(record.payout_id)
        .bind(record.claim_id)
        .bind(record.attempt)
        .bind(record.amount)
        .bind(&record.currency)
        .bind(&record.beneficiary_name)
        .bind(&record.account_number)
        .bind(&record.ifsc_code)
        .bind(&record.status)
        .bind(&record.transfer_id)
        .bind(&record.reference)
        .bind(&record.error_kind)
        .bind(&record.error_message)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Conditional::Updated(claim))
    }

    /// Writes the outcome of an in-flight attempt and mirrors its state on
    /// the claim, in one transaction.
    ///
    /// The claim must be approved, point at this attempt and still be
    /// `initiated`. A `None` reference keeps the stored one.
    pub async fn complete_attempt(
        &self,
        record: &PayoutRow,
        claim_state: &str,
    ) -> Result<Conditional, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE claims SET payout_status = $3, updated_at = now()
            WHERE claim_id = $1
              AND status = 'approved'
              AND payout_id = $2
              AND payout_status = 'initiated'
            RETURNING {CLAIM_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(record.claim_id)
            .bind(record.payout_id)
            .bind(claim_state)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(claim) = updated else {
            tx.rollback().await?;
            let current = ClaimsRepository::new(self.pool.clone())
                .current_state(record.claim_id)
                .await?;
            return Ok(Conditional::Missed(current));
        };

        let result = sqlx::query(
            r#"
            UPDATE payout_records SET
                status = $2,
                transfer_id = $3,
                reference = COALESCE($4, reference),
                error_kind = $5,
                error_message = $6,
                updated_at = now()
            WHERE payout_id = $1
            "#,
        )
        .bind(record.payout_id)
        .bind(&record.status)
        .bind(&record.transfer_id)
        .bind(&record.reference)
        .bind(&record.error_kind)
        .bind(&record.error_message)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DatabaseError::not_found("PayoutRecord", record.payout_id));
        }

        tx.commit().await?;
        Ok(Conditional::Updated(claim))
    }

    /// All attempts on a claim, oldest first
    pub async fn history(&self, claim_id: Uuid) -> Result<Vec<PayoutRow>, DatabaseError> {
        let sql = format!("SELECT {PAYOUT_COLUMNS} FROM payout_records WHERE claim_id = $1 ORDER BY attempt");
        Ok(sqlx::query_as::<_, PayoutRow>(&sql)
            .bind(claim_id)
            .fetch_all(&self.pool)
            .await?)
    }
}
