//! Policies repository
//!
//! The workflow only reads policies. `insert` exists for seeding and tests;
//! policy administration lives elsewhere.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// A row of the `policies` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PolicyRow {
    pub policy_id: Uuid,
    pub policy_number: String,
    pub holder_id: Uuid,
    pub provider_id: Uuid,
    pub policy_type: String,
    pub coverage_amount: Decimal,
    pub premium_amount: Decimal,
    pub currency: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PolicyRepository {
    pool: PgPool,
}

impl PolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, policy_id: Uuid) -> Result<PolicyRow, DatabaseError> {
        sqlx::query_as::<_, PolicyRow>(
            r#"
            SELECT policy_id, policy_number, holder_id, provider_id, policy_type,
                   coverage_amount, premium_amount, currency, valid_from, valid_to,
                   status, created_at
            FROM policies
            WHERE policy_id = $1
            "#,
        )
        .bind(policy_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Policy", policy_id))
    }

    pub async fn insert(&self, row: &PolicyRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO policies (
                policy_id, policy_number, holder_id, provider_id, policy_type,
                coverage_amount, premium_amount, currency, valid_from, valid_to,
                status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(row.policy_id)
        .bind(&row.policy_number)
        .bind(row.holder_id)
        .bind(row.provider_id)
        .bind(&row.policy_type)
        .bind(row.coverage_amount)
        .bind(row.premium_amount)
        .bind(&row.currency)
        .bind(row.valid_from)
        .bind(row.valid_to)
        .bind(&row.status)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::DuplicateEntry(_) => {
                DatabaseError::DuplicateEntry(format!("policy number '{}' already exists", row.policy_number))
            }
            other => other,
        })?;
        Ok(())
    }
}
