//! Claims repository
//!
//! Raw SQL for claims and their documents. Every status change is an
//! `UPDATE ... WHERE status = $expected`; zero rows updated means someone
//! else moved the claim first, and the caller gets back what is there now.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Statuses that count as an open claim on a policy
pub const ACTIVE_STATUSES: [&str; 4] = [
    "submitted",
    "analysis_pending",
    "records_fetch_failed",
    "pending_provider_review",
];

pub(crate) const CLAIM_COLUMNS: &str = r#"
    claim_id, claim_number, policy_id, claimant_id, provider_id,
    amount, currency, incident_date, description, record_id,
    hospital_name, treatment_details,
    beneficiary_name, account_number, ifsc_code,
    status,
    risk_verdict_json, fraud_score, risk_level, ai_confidence,
    approved_by, rejected_by, provider_comments, decided_at,
    payout_id, payout_status, payout_amount,
    created_at, updated_at
"#;

/// A row of the `claims` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimRow {
    pub claim_id: Uuid,
    pub claim_number: String,
    pub policy_id: Uuid,
    pub claimant_id: Uuid,
    pub provider_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub incident_date: NaiveDate,
    pub description: String,
    pub record_id: String,
    pub hospital_name: Option<String>,
    pub treatment_details: Option<String>,
    pub beneficiary_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub status: String,
    pub risk_verdict_json: Option<serde_json::Value>,
    pub fraud_score: Option<i16>,
    pub risk_level: Option<String>,
    pub ai_confidence: Option<i16>,
    pub approved_by: Option<Uuid>,
    pub rejected_by: Option<Uuid>,
    pub provider_comments: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub payout_id: Option<Uuid>,
    pub payout_status: Option<String>,
    pub payout_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row of the `claim_documents` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    pub document_id: Uuid,
    pub claim_id: Uuid,
    pub position: i32,
    pub document_type: String,
    pub file_name: String,
    pub storage_path: String,
    pub size_bytes: i64,
    pub mime_type: String,
}

/// Verdict columns written together with a routing transition
#[derive(Debug, Clone)]
pub struct VerdictColumns {
    pub json: serde_json::Value,
    pub fraud_score: i16,
    pub risk_level: String,
    pub confidence: i16,
}

/// Decision columns written together with a provider transition
#[derive(Debug, Clone)]
pub struct DecisionColumns {
    pub approved_by: Option<Uuid>,
    pub rejected_by: Option<Uuid>,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Conditional status update
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub claim_id: Uuid,
    pub from: String,
    pub to: String,
    pub verdict: Option<VerdictColumns>,
    pub decision: Option<DecisionColumns>,
    pub stale_before: Option<DateTime<Utc>>,
}

/// What a failed conditional update found instead
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CurrentState {
    pub status: String,
    pub payout_status: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Conditional {
    Updated(ClaimRow),
    Missed(CurrentState),
}

#[derive(Debug, Clone)]
pub enum Insert {
    Inserted(ClaimRow),
    OpenClaimExists(Uuid),
}

/// Repository for the claims tables
#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: PgPool,
}

impl ClaimsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn get_by_id(&self, claim_id: Uuid) -> Result<ClaimRow, DatabaseError> {
        let sql = format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE claim_id = $1");
        sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(claim_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", claim_id))
    }

    /// Open claim on a policy, if any
    pub async fn find_open_for_policy(&self, policy_id: Uuid) -> Result<Option<Uuid>, DatabaseError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT claim_id FROM claims WHERE policy_id = $1 AND status = ANY($2) LIMIT 1",
        )
        .bind(policy_id)
        .bind(&ACTIVE_STATUSES[..])
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn find_by_claimant(&self, claimant_id: Uuid) -> Result<Vec<ClaimRow>, DatabaseError> {
        let sql = format!(
            "SELECT {CLAIM_COLUMNS} FROM claims WHERE claimant_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(claimant_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn find_by_provider(&self, provider_id: Uuid) -> Result<Vec<ClaimRow>, DatabaseError> {
        let sql = format!(
            "SELECT {CLAIM_COLUMNS} FROM claims WHERE provider_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(provider_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Documents for a set of claims, in upload order
    pub async fn documents_for(&self, claim_ids: &[Uuid]) -> Result<Vec<DocumentRow>, DatabaseError> {
        if claim_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT document_id, claim_id, position, document_type, file_name,
                   storage_path, size_bytes, mime_type
            FROM claim_documents
            WHERE claim_id = ANY($1)
            ORDER BY claim_id, position
            "#,
        )
        .bind(claim_ids)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Inserts a claim and its documents unless the policy has an open claim.
    ///
    /// The policy row is locked for the duration so concurrent submissions
    /// on one policy serialise; the partial unique index backs this up.
    pub async fn insert_unless_open(
        &self,
        claim: &ClaimRow,
        documents: &[DocumentRow],
    ) -> Result<Insert, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT policy_id FROM policies WHERE policy_id = $1 FOR UPDATE")
            .bind(claim.policy_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Policy", claim.policy_id))?;

        let open = sqlx::query_scalar::<_, Uuid>(
            "SELECT claim_id FROM claims WHERE policy_id = $1 AND status = ANY($2) LIMIT 1",
        )
        .bind(claim.policy_id)
        .bind(&ACTIVE_STATUSES[..])
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(existing) = open {
            tx.rollback().await?;
            return Ok(Insert::OpenClaimExists(existing));
        }

        let inserted = match insert_claim(&mut tx, claim).await {
            Ok(row) => row,
            Err(DatabaseError::DuplicateEntry(_)) => {
                tx.rollback().await?;
                return match self.find_open_for_policy(claim.policy_id).await? {
                    Some(existing) => Ok(Insert::OpenClaimExists(existing)),
                    None => Err(DatabaseError::DuplicateEntry(claim.claim_number.clone())),
                };
            }
            Err(e) => return Err(e),
        };

        for doc in documents {
            sqlx::query(
                r#"
                INSERT INTO claim_documents (
                    document_id, claim_id, position, document_type, file_name,
                    storage_path, size_bytes, mime_type
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(doc.document_id)
            .bind(doc.claim_id)
            .bind(doc.position)
            .bind(&doc.document_type)
            .bind(&doc.file_name)
            .bind(&doc.storage_path)
            .bind(doc.size_bytes)
            .bind(&doc.mime_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Insert::Inserted(inserted))
    }

    /// Applies a status change if the claim still has `update.from`
    pub async fn update_status_if(&self, update: &StatusUpdate) -> Result<Conditional, DatabaseError> {
        let verdict = update.verdict.as_ref();
        let decision = update.decision.as_ref();

        let sql = format!(
            r#"
            UPDATE claims SET
                status = $3,
                risk_verdict_json = COALESCE(risk_verdict_json, $4),
                fraud_score = CASE WHEN risk_verdict_json IS NULL THEN $5 ELSE fraud_score END,
                risk_level = CASE WHEN risk_verdict_json IS NULL THEN $6 ELSE risk_level END,
                ai_confidence = CASE WHEN risk_verdict_json IS NULL THEN $7 ELSE ai_confidence END,
                approved_by = COALESCE($8, approved_by),
                rejected_by = COALESCE($9, rejected_by),
                provider_comments = COALESCE($10, provider_comments),
                decided_at = COALESCE($11, decided_at),
                updated_at = now()
            WHERE claim_id = $1
              AND status = $2
              AND ($12::timestamptz IS NULL OR updated_at < $12)
            RETURNING {CLAIM_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(update.claim_id)
            .bind(&update.from)
            .bind(&update.to)
            .bind(verdict.map(|v| v.json.clone()))
            .bind(verdict.map(|v| v.fraud_score))
            .bind(verdict.map(|v| v.risk_level.clone()))
            .bind(verdict.map(|v| v.confidence))
            .bind(decision.and_then(|d| d.approved_by))
            .bind(decision.and_then(|d| d.rejected_by))
            .bind(decision.and_then(|d| d.comments.clone()))
            .bind(decision.map(|d| d.decided_at))
            .bind(update.stale_before)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(row) => Ok(Conditional::Updated(row)),
            None => Ok(Conditional::Missed(self.current_state(update.claim_id).await?)),
        }
    }

    pub async fn current_state(&self, claim_id: Uuid) -> Result<CurrentState, DatabaseError> {
        sqlx::query_as::<_, CurrentState>("SELECT status, payout_status FROM claims WHERE claim_id = $1")
            .bind(claim_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", claim_id))
    }
}

async fn insert_claim(
    tx: &mut Transaction<'_, Postgres>,
    claim: &ClaimRow,
) -> Result<ClaimRow, DatabaseError> {
    let sql = format!(
        r#"
        INSERT INTO claims (
            claim_id, claim_number, policy_id, claimant_id, provider_id,
            amount, currency, incident_date, description, record_id,
            hospital_name, treatment_details,
            beneficiary_name, account_number, ifsc_code,
            status, created_at, updated_at
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18
        )
        RETURNING {CLAIM_COLUMNS}
        "#
    );

    Ok(sqlx::query_as::<_, ClaimRow>(&sql)
        .bind(claim.claim_id)
        .bind(&claim.claim_number)
        .bind(claim.policy_id)
        .bind(claim.claimant_id)
        .bind(claim.provider_id)
        .bind(claim.amount)
        .bind(&claim.currency)
        .bind(claim.incident_date)
        .bind(&claim.description)
        .bind(&claim.record_id)
        .bind(&claim.hospital_name)
        .bind(&claim.treatment_details)
        .bind(&claim.beneficiary_name)
        .bind(&claim.account_number)
        .bind(&claim.ifsc_code)
        .bind(&claim.status)
        .bind(claim.created_at)
        .bind(claim.updated_at)
        .fetch_one(&mut **tx)
        .await?)
}
