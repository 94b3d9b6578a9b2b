//! PostgreSQL claim store
//!
//! Implements [`ClaimStore`] on top of [`ClaimsRepository`] and
//! [`PayoutRepository`], translating rows to domain types. Conditional
//! writes map straight onto [`TransitionOutcome`]: a missed update reports
//! the status found in the row.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, ClaimId, Currency, DomainPort, HealthCheckResult, HealthCheckable, Money,
    PartyId, PayoutId, PolicyId, PortError,
};
use domain_claims::{
    BankAccount, Claim, ClaimDocument, ClaimPayout, ClaimStatus, ClaimStore, CreateOutcome,
    DecisionAction, PayoutRecord, PayoutState, PayoutStatus, ProviderDecision, RecordId,
    RiskVerdict, StatusChange, TransitionOutcome,
};

use crate::error::DatabaseError;
use crate::pool::DatabasePool;
use crate::repositories::claims::{
    ClaimRow, ClaimsRepository, Conditional, CurrentState, DecisionColumns, DocumentRow, Insert,
    StatusUpdate, VerdictColumns,
};
use crate::repositories::payouts::{PayoutRepository, PayoutRow};

/// PostgreSQL-backed implementation of [`ClaimStore`]
#[derive(Debug, Clone)]
pub struct PostgresClaimStore {
    claims: ClaimsRepository,
    payouts: PayoutRepository,
    pool: DatabasePool,
}

impl PostgresClaimStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            claims: ClaimsRepository::new(pool.clone()),
            payouts: PayoutRepository::new(pool.clone()),
            pool,
        }
    }

    /// Attaches documents to rows and converts them, keeping row order
    async fn hydrate(&self, rows: Vec<ClaimRow>) -> Result<Vec<Claim>, PortError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.claim_id).collect();
        let mut documents: HashMap<Uuid, Vec<ClaimDocument>> = HashMap::new();
        for doc in self.claims.documents_for(&ids).await? {
            documents
                .entry(doc.claim_id)
                .or_default()
                .push(document_from_row(doc)?);
        }

        rows.into_iter()
            .map(|row| {
                let docs = documents.remove(&row.claim_id).unwrap_or_default();
                claim_from_row(row, docs).map_err(PortError::from)
            })
            .collect()
    }

    async fn hydrate_one(&self, row: ClaimRow) -> Result<Claim, PortError> {
        self.hydrate(vec![row])
            .await?
            .pop()
            .ok_or_else(|| PortError::internal("claim row vanished while loading documents"))
    }

    async fn outcome(&self, result: Conditional) -> Result<TransitionOutcome, PortError> {
        match result {
            Conditional::Updated(row) => Ok(TransitionOutcome::Applied(self.hydrate_one(row).await?)),
            Conditional::Missed(current) => conflict_from(current),
        }
    }
}

impl DomainPort for PostgresClaimStore {}

#[async_trait]
impl HealthCheckable for PostgresClaimStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::new("postgres", AdapterHealth::Healthy, latency_ms),
            Err(e) => HealthCheckResult::new("postgres", AdapterHealth::Unhealthy, latency_ms)
                .with_message(format!("Database error: {e}")),
        }
    }
}

#[async_trait]
impl ClaimStore for PostgresClaimStore {
    #[instrument(skip(self, claim), fields(claim_id = %claim.id, policy_id = %claim.policy_id))]
    async fn create_claim(&self, claim: &Claim) -> Result<CreateOutcome, PortError> {
        let row = claim_to_row(claim);
        let documents: Vec<DocumentRow> = claim
            .documents
            .iter()
            .enumerate()
            .map(|(i, d)| document_to_row(claim.id, i, d))
            .collect();

        match self.claims.insert_unless_open(&row, &documents).await? {
            Insert::Inserted(row) => {
                debug!("Claim inserted");
                Ok(CreateOutcome::Created(claim_from_row(row, claim.documents.clone())?))
            }
            Insert::OpenClaimExists(existing) => {
                debug!(existing = %existing, "Policy already has an open claim");
                Ok(CreateOutcome::ActiveClaimExists(ClaimId::from(existing)))
            }
        }
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        let row = self.claims.get_by_id(id.into()).await.map_err(|e| {
            if e.is_not_found() {
                PortError::not_found("Claim", id)
            } else {
                e.into()
            }
        })?;
        self.hydrate_one(row).await
    }

    async fn active_claim_for_policy(&self, policy_id: PolicyId) -> Result<Option<ClaimId>, PortError> {
        Ok(self
            .claims
            .find_open_for_policy(policy_id.into())
            .await?
            .map(ClaimId::from))
    }

    async fn claims_for_claimant(&self, claimant_id: PartyId) -> Result<Vec<Claim>, PortError> {
        let rows = self.claims.find_by_claimant(claimant_id.into()).await?;
        self.hydrate(rows).await
    }

    async fn claims_for_provider(&self, provider_id: PartyId) -> Result<Vec<Claim>, PortError> {
        let rows = self.claims.find_by_provider(provider_id.into()).await?;
        self.hydrate(rows).await
    }

    #[instrument(skip(self, change), fields(claim_id = %change.claim_id, from = %change.from, to = %change.to))]
    async fn transition(&self, change: &StatusChange) -> Result<TransitionOutcome, PortError> {
        let update = status_update(change)?;
        let result = self.claims.update_status_if(&update).await?;
        if let Conditional::Missed(current) = &result {
            debug!(actual = %current.status, "Conditional status update missed");
        }
        self.outcome(result).await
    }

    #[instrument(skip(self, record), fields(claim_id = %record.claim_id, payout_id = %record.id, attempt = record.attempt))]
    async fn record_payout_attempt(
        &self,
        record: &PayoutRecord,
        expected: Option<PayoutState>,
    ) -> Result<TransitionOutcome, PortError> {
        let row = payout_to_row(record);
        let result = self
            .payouts
            .append_attempt(
                &row,
                record.status.payout_state().as_str(),
                expected.as_ref().map(PayoutState::as_str),
            )
            .await?;
        self.outcome(result).await
    }

    #[instrument(skip(self, record), fields(claim_id = %record.claim_id, payout_id = %record.id, status = %record.status))]
    async fn complete_payout_attempt(&self, record: &PayoutRecord) -> Result<TransitionOutcome, PortError> {
        let row = payout_to_row(record);
        let result = self
            .payouts
            .complete_attempt(&row, record.status.payout_state().as_str())
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    PortError::not_found("PayoutRecord", record.id)
                } else {
                    e.into()
                }
            })?;
        self.outcome(result).await
    }

    async fn payout_history(&self, claim_id: ClaimId) -> Result<Vec<PayoutRecord>, PortError> {
        self.payouts
            .history(claim_id.into())
            .await?
            .into_iter()
            .map(|row| payout_from_row(row).map_err(PortError::from))
            .collect()
    }
}

fn conflict_from(current: CurrentState) -> Result<TransitionOutcome, PortError> {
    let actual = parse_status(&current.status)?;
    let payout = current
        .payout_status
        .as_deref()
        .map(parse_payout_state)
        .transpose()?;
    Ok(TransitionOutcome::Conflict { actual, payout })
}

fn status_update(change: &StatusChange) -> Result<StatusUpdate, PortError> {
    let verdict = change
        .verdict
        .as_ref()
        .map(|v| {
            serde_json::to_value(v)
                .map(|json| VerdictColumns {
                    json,
                    fraud_score: i16::from(v.fraud_score),
                    risk_level: v.risk_level.as_str().to_string(),
                    confidence: i16::from(v.confidence),
                })
                .map_err(|e| PortError::internal(format!("verdict serialisation: {e}")))
        })
        .transpose()?;

    let decision = change.decision.as_ref().map(|d| {
        let by: Uuid = d.decided_by.into();
        DecisionColumns {
            approved_by: (d.action == DecisionAction::Approve).then_some(by),
            rejected_by: (d.action == DecisionAction::Reject).then_some(by),
            comments: d.comments.clone(),
            decided_at: d.decided_at,
        }
    });

    Ok(StatusUpdate {
        claim_id: change.claim_id.into(),
        from: change.from.as_str().to_string(),
        to: change.to.as_str().to_string(),
        verdict,
        decision,
        stale_before: change.stale_before,
    })
}

fn parse_status(raw: &str) -> Result<ClaimStatus, DatabaseError> {
    raw.parse::<ClaimStatus>()
        .map_err(|e| DatabaseError::corrupt("claims.status", e))
}

fn parse_payout_state(raw: &str) -> Result<PayoutState, DatabaseError> {
    raw.parse::<PayoutState>()
        .map_err(|e| DatabaseError::corrupt("claims.payout_status", e))
}

fn parse_currency(raw: &str) -> Result<Currency, DatabaseError> {
    Currency::from_code(raw.trim()).map_err(|e| DatabaseError::corrupt("currency", e))
}

fn bank_account(
    name: Option<String>,
    number: Option<String>,
    ifsc: Option<String>,
) -> Option<BankAccount> {
    match (name, number, ifsc) {
        (Some(name), Some(number), Some(ifsc)) => Some(BankAccount::new(name, number, ifsc)),
        (None, None, None) => None,
        _ => {
            warn!("Partial bank details in row, treating as absent");
            None
        }
    }
}

fn claim_to_row(claim: &Claim) -> ClaimRow {
    let account = claim.payout_account.as_ref();
    ClaimRow {
        claim_id: claim.id.into(),
        claim_number: claim.claim_number.clone(),
        policy_id: claim.policy_id.into(),
        claimant_id: claim.claimant_id.into(),
        provider_id: claim.provider_id.into(),
        amount: claim.amount.amount(),
        currency: claim.amount.currency().code().to_string(),
        incident_date: claim.incident_date,
        description: claim.description.clone(),
        record_id: claim.record_id.as_str().to_string(),
        hospital_name: claim.hospital_name.clone(),
        treatment_details: claim.treatment_details.clone(),
        beneficiary_name: account.map(|a| a.beneficiary_name.clone()),
        account_number: account.map(|a| a.account_number.clone()),
        ifsc_code: account.map(|a| a.ifsc_code.clone()),
        status: claim.status.as_str().to_string(),
        risk_verdict_json: None,
        fraud_score: None,
        risk_level: None,
        ai_confidence: None,
        approved_by: None,
        rejected_by: None,
        provider_comments: None,
        decided_at: None,
        payout_id: None,
        payout_status: None,
        payout_amount: None,
        created_at: claim.created_at,
        updated_at: claim.updated_at,
    }
}

fn claim_from_row(row: ClaimRow, documents: Vec<ClaimDocument>) -> Result<Claim, DatabaseError> {
    let currency = parse_currency(&row.currency)?;
    let status = parse_status(&row.status)?;
    let record_id = RecordId::parse(&row.record_id)
        .map_err(|e| DatabaseError::corrupt("claims.record_id", e))?;

    let verdict = row
        .risk_verdict_json
        .map(serde_json::from_value::<RiskVerdict>)
        .transpose()
        .map_err(|e| DatabaseError::corrupt("claims.risk_verdict_json", e))?;

    let decision = match (row.approved_by, row.rejected_by, row.decided_at) {
        (Some(by), _, Some(at)) => Some((by, DecisionAction::Approve, at)),
        (None, Some(by), Some(at)) => Some((by, DecisionAction::Reject, at)),
        _ => None,
    }
    .map(|(by, action, decided_at)| ProviderDecision {
        decided_by: PartyId::from(by),
        action,
        comments: row.provider_comments.clone(),
        decided_at,
    });

    let payout = match (row.payout_id, row.payout_status.as_deref(), row.payout_amount) {
        (Some(id), Some(state), Some(amount)) => Some(ClaimPayout {
            state: parse_payout_state(state)?,
            payout_id: PayoutId::from(id),
            amount: Money::new(amount, currency),
        }),
        _ => None,
    };

    Ok(Claim {
        id: ClaimId::from(row.claim_id),
        claim_number: row.claim_number,
        policy_id: PolicyId::from(row.policy_id),
        claimant_id: PartyId::from(row.claimant_id),
        provider_id: PartyId::from(row.provider_id),
        amount: Money::new(row.amount, currency),
        incident_date: row.incident_date,
        description: row.description,
        record_id,
        hospital_name: row.hospital_name,
        treatment_details: row.treatment_details,
        documents,
        payout_account: bank_account(row.beneficiary_name, row.account_number, row.ifsc_code),
        status,
        verdict,
        decision,
        payout,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn document_to_row(claim_id: ClaimId, position: usize, doc: &ClaimDocument) -> DocumentRow {
    DocumentRow {
        document_id: doc.id.into(),
        claim_id: claim_id.into(),
        position: position as i32,
        document_type: doc.document_type.clone(),
        file_name: doc.file_name.clone(),
        storage_path: doc.storage_path.clone(),
        size_bytes: doc.size_bytes as i64,
        mime_type: doc.mime_type.clone(),
    }
}

fn document_from_row(row: DocumentRow) -> Result<ClaimDocument, DatabaseError> {
    let size_bytes = u64::try_from(row.size_bytes)
        .map_err(|e| DatabaseError::corrupt("claim_documents.size_bytes", e))?;
    Ok(ClaimDocument {
        id: row.document_id.into(),
        document_type: row.document_type,
        file_name: row.file_name,
        storage_path: row.storage_path,
        size_bytes,
        mime_type: row.mime_type,
    })
}

fn payout_to_row(record: &PayoutRecord) -> PayoutRow {
    let account = record.account.as_ref();
    PayoutRow {
        payout_id: record.id.into(),
        claim_id: record.claim_id.into(),
        attempt: record.attempt as i32,
        amount: record.amount.amount(),
        currency: record.amount.currency().code().to_string(),
        beneficiary_name: account.map(|a| a.beneficiary_name.clone()),
        account_number: account.map(|a| a.account_number.clone()),
        ifsc_code: account.map(|a| a.ifsc_code.clone()),
        status: record.status.as_str().to_string(),
        transfer_id: record.transfer_id.clone(),
        reference: record.reference.clone(),
        error_kind: record.error_kind.clone(),
        error_message: record.error_message.clone(),
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

fn payout_from_row(row: PayoutRow) -> Result<PayoutRecord, DatabaseError> {
    let currency = parse_currency(&row.currency)?;
    let status = row
        .status
        .parse::<PayoutStatus>()
        .map_err(|e| DatabaseError::corrupt("payout_records.status", e))?;
    let attempt = u32::try_from(row.attempt)
        .map_err(|e| DatabaseError::corrupt("payout_records.attempt", e))?;

    Ok(PayoutRecord {
        id: PayoutId::from(row.payout_id),
        claim_id: ClaimId::from(row.claim_id),
        attempt,
        amount: Money::new(row.amount, currency),
        account: bank_account(row.beneficiary_name, row.account_number, row.ifsc_code),
        status,
        transfer_id: row.transfer_id,
        reference: row.reference,
        error_kind: row.error_kind,
        error_message: row.error_message,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn row() -> ClaimRow {
        let now = Utc::now();
        ClaimRow {
            claim_id: Uuid::now_v7(),
            claim_number: "CLM-2024-0000042".to_string(),
            policy_id: Uuid::now_v7(),
            claimant_id: Uuid::now_v7(),
            provider_id: Uuid::now_v7(),
            amount: dec!(125000.00),
            currency: "INR".to_string(),
            incident_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            description: "Appendectomy".to_string(),
            record_id: "ABDM123456789".to_string(),
            hospital_name: None,
            treatment_details: None,
            beneficiary_name: Some("Rajesh Kumar".to_string()),
            account_number: Some("123456789012".to_string()),
            ifsc_code: Some("HDFC0001234".to_string()),
            status: "approved".to_string(),
            risk_verdict_json: Some(serde_json::to_value(RiskVerdict::fallback()).unwrap()),
            fraud_score: Some(15),
            risk_level: Some("LOW".to_string()),
            ai_confidence: Some(85),
            approved_by: Some(Uuid::now_v7()),
            rejected_by: None,
            provider_comments: Some("Looks fine".to_string()),
            decided_at: Some(now),
            payout_id: Some(Uuid::now_v7()),
            payout_status: Some("settled".to_string()),
            payout_amount: Some(dec!(125000.00)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_row_converts_to_claim() {
        let claim = claim_from_row(row(), Vec::new()).unwrap();
        assert_eq!(claim.status, ClaimStatus::Approved);
        assert_eq!(claim.amount, Money::inr(dec!(125000)));
        assert_eq!(claim.verdict, Some(RiskVerdict::fallback()));
        assert_eq!(claim.decision.as_ref().unwrap().action, DecisionAction::Approve);
        assert_eq!(claim.payout_state(), Some(PayoutState::Settled));
        assert!(claim.payout_account.is_some());
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        let mut bad = row();
        bad.status = "escalated".to_string();
        let err = claim_from_row(bad, Vec::new()).unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRow(_)));
    }

    #[test]
    fn test_rejection_is_read_back_as_reject() {
        let mut rejected = row();
        rejected.status = "rejected".to_string();
        rejected.rejected_by = rejected.approved_by.take();
        rejected.payout_id = None;
        rejected.payout_status = None;
        rejected.payout_amount = None;

        let claim = claim_from_row(rejected, Vec::new()).unwrap();
        assert_eq!(claim.decision.unwrap().action, DecisionAction::Reject);
        assert!(claim.payout.is_none());
    }

    #[test]
    fn test_status_change_carries_decision_columns() {
        let provider = PartyId::new_v7();
        let change = StatusChange::new(
            ClaimId::new_v7(),
            ClaimStatus::PendingProviderReview,
            ClaimStatus::Rejected,
        )
        .with_decision(ProviderDecision {
            decided_by: provider,
            action: DecisionAction::Reject,
            comments: Some("Duplicate bill".to_string()),
            decided_at: Utc::now(),
        });

        let update = status_update(&change).unwrap();
        assert_eq!(update.from, "pending_provider_review");
        assert_eq!(update.to, "rejected");
        let decision = update.decision.unwrap();
        assert_eq!(decision.rejected_by, Some(Uuid::from(provider)));
        assert!(decision.approved_by.is_none());
    }
}
