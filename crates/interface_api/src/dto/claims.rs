//! Claims DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Currency, Money, PartyId, PolicyId};
use domain_claims::{
    AmountValidation, AnalysisOutcome, BankAccount, Claim, ClaimDocument, ClaimPayout,
    ClaimStatus, DecisionAction, PayoutRecord, PayoutState, PayoutStatus, ProviderDecision,
    RiskLevel, RiskVerdict, SubmitClaim, VerdictSource,
};

use crate::error::ApiError;

fn default_currency() -> String {
    "INR".to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitClaimRequest {
    pub policy_id: Uuid,
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "must be an ISO 4217 code"))]
    pub currency: String,
    pub incident_date: NaiveDate,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    #[validate(length(min = 1, max = 32))]
    pub record_id: String,
    #[validate(length(max = 200))]
    pub hospital_name: Option<String>,
    #[validate(length(max = 5000))]
    pub treatment_details: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub documents: Vec<DocumentRequest>,
    #[validate(nested)]
    pub bank_details: Option<BankDetailsRequest>,
}

impl SubmitClaimRequest {
    /// Domain command on behalf of `claimant`
    pub fn into_command(self, claimant: PartyId) -> Result<SubmitClaim, ApiError> {
        let currency = Currency::from_code(&self.currency.to_ascii_uppercase())
            .map_err(|e| ApiError::Validation(e.to_string(), vec![format!("currency: {e}")]))?;

        Ok(SubmitClaim {
            policy_id: PolicyId::from(self.policy_id),
            claimant_id: claimant,
            amount: Money::new(self.amount, currency),
            incident_date: self.incident_date,
            description: self.description,
            record_id: self.record_id.trim().to_string(),
            hospital_name: self.hospital_name,
            treatment_details: self.treatment_details,
            documents: self.documents.into_iter().map(DocumentRequest::into_document).collect(),
            payout_account: self.bank_details.map(BankDetailsRequest::into_account),
        })
    }
}

/// Metadata of an already-uploaded file
#[derive(Debug, Deserialize, Validate)]
pub struct DocumentRequest {
    #[validate(length(min = 1, max = 64))]
    pub document_type: String,
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(length(min = 1, max = 1024))]
    pub storage_path: String,
    pub size_bytes: u64,
    #[validate(length(min = 1, max = 128))]
    pub mime_type: String,
}

impl DocumentRequest {
    fn into_document(self) -> ClaimDocument {
        ClaimDocument::new(
            self.document_type,
            self.file_name,
            self.storage_path,
            self.size_bytes,
            self.mime_type,
        )
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct BankDetailsRequest {
    #[validate(length(min = 1, max = 200))]
    pub beneficiary_name: String,
    #[validate(length(min = 1, max = 34))]
    pub account_number: String,
    #[validate(length(min = 1, max = 11))]
    pub ifsc_code: String,
}

impl BankDetailsRequest {
    fn into_account(self) -> BankAccount {
        BankAccount::new(self.beneficiary_name, self.account_number, self.ifsc_code)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct DecisionRequest {
    pub action: DecisionAction,
    #[validate(length(max = 2000))]
    pub comments: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub document_type: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

impl From<&ClaimDocument> for DocumentResponse {
    fn from(doc: &ClaimDocument) -> Self {
        Self {
            id: *doc.id.as_uuid(),
            document_type: doc.document_type.clone(),
            file_name: doc.file_name.clone(),
            size_bytes: doc.size_bytes,
            mime_type: doc.mime_type.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VerdictResponse {
    pub fraud_score: u8,
    pub risk_level: RiskLevel,
    pub is_valid_claim: bool,
    pub confidence: u8,
    pub analysis: String,
    pub summary: String,
    pub red_flags: Vec<String>,
    pub recommendations: Vec<String>,
    pub disease_match: Option<bool>,
    pub amount_validation: Option<AmountValidation>,
    pub source: VerdictSource,
}

impl From<&RiskVerdict> for VerdictResponse {
    fn from(v: &RiskVerdict) -> Self {
        Self {
            fraud_score: v.fraud_score,
            risk_level: v.risk_level,
            is_valid_claim: v.is_valid_claim,
            confidence: v.confidence,
            analysis: v.analysis.clone(),
            summary: v.summary.clone(),
            red_flags: v.red_flags.clone(),
            recommendations: v.recommendations.clone(),
            disease_match: v.disease_match,
            amount_validation: v.amount_validation,
            source: v.source,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub decided_by: Uuid,
    pub action: DecisionAction,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl From<&ProviderDecision> for DecisionResponse {
    fn from(d: &ProviderDecision) -> Self {
        Self {
            decided_by: *d.decided_by.as_uuid(),
            action: d.action,
            comments: d.comments.clone(),
            decided_at: d.decided_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PayoutSummary {
    pub payout_id: Uuid,
    pub state: PayoutState,
    pub amount: Decimal,
    pub currency: String,
}

impl From<&ClaimPayout> for PayoutSummary {
    fn from(p: &ClaimPayout) -> Self {
        Self {
            payout_id: *p.payout_id.as_uuid(),
            state: p.state,
            amount: p.amount.amount(),
            currency: p.amount.currency().code().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub id: Uuid,
    pub claim_number: String,
    pub policy_id: Uuid,
    pub claimant_id: Uuid,
    pub provider_id: Uuid,
    pub status: ClaimStatus,
    pub amount: Decimal,
    pub currency: String,
    pub incident_date: NaiveDate,
    pub description: String,
    pub record_id: String,
    pub hospital_name: Option<String>,
    pub treatment_details: Option<String>,
    pub documents: Vec<DocumentResponse>,
    /// Last four digits only
    pub payout_account: Option<String>,
    pub verdict: Option<VerdictResponse>,
    pub decision: Option<DecisionResponse>,
    pub payout: Option<PayoutSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Claim> for ClaimResponse {
    fn from(claim: &Claim) -> Self {
        Self {
            id: *claim.id.as_uuid(),
            claim_number: claim.claim_number.clone(),
            policy_id: *claim.policy_id.as_uuid(),
            claimant_id: *claim.claimant_id.as_uuid(),
            provider_id: *claim.provider_id.as_uuid(),
            status: claim.status,
            amount: claim.amount.amount(),
            currency: claim.amount.currency().code().to_string(),
            incident_date: claim.incident_date,
            description: claim.description.clone(),
            record_id: claim.record_id.as_str().to_string(),
            hospital_name: claim.hospital_name.clone(),
            treatment_details: claim.treatment_details.clone(),
            documents: claim.documents.iter().map(DocumentResponse::from).collect(),
            payout_account: claim.payout_account.as_ref().map(BankAccount::masked_account),
            verdict: claim.verdict.as_ref().map(VerdictResponse::from),
            decision: claim.decision.as_ref().map(DecisionResponse::from),
            payout: claim.payout.as_ref().map(PayoutSummary::from),
            created_at: claim.created_at,
            updated_at: claim.updated_at,
        }
    }
}

/// Result of an analysis run
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub claim: ClaimResponse,
    /// Set when the records registry could not supply the patient's history
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_unavailable: Option<String>,
}

impl From<&AnalysisOutcome> for AnalysisResponse {
    fn from(outcome: &AnalysisOutcome) -> Self {
        let records_unavailable = match outcome {
            AnalysisOutcome::RecordsUnavailable { error, .. } => Some(error.to_string()),
            AnalysisOutcome::Routed { .. } => None,
        };
        Self {
            claim: ClaimResponse::from(outcome.claim()),
            records_unavailable,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PayoutRecordResponse {
    pub id: Uuid,
    pub attempt: u32,
    pub amount: Decimal,
    pub currency: String,
    pub status: PayoutStatus,
    pub payout_account: Option<String>,
    pub transfer_id: Option<String>,
    pub reference: Option<String>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PayoutRecord> for PayoutRecordResponse {
    fn from(r: &PayoutRecord) -> Self {
        Self {
            id: *r.id.as_uuid(),
            attempt: r.attempt,
            amount: r.amount.amount(),
            currency: r.amount.currency().code().to_string(),
            status: r.status,
            payout_account: r.account.as_ref().map(BankAccount::masked_account),
            transfer_id: r.transfer_id.clone(),
            reference: r.reference.clone(),
            error_kind: r.error_kind.clone(),
            error_message: r.error_message.clone(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SubmitClaimRequest {
        serde_json::from_value(serde_json::json!({
            "policy_id": Uuid::now_v7(),
            "amount": "125000.00",
            "incident_date": "2024-03-01",
            "description": "Appendectomy",
            "record_id": " ABDM123456789 ",
            "bank_details": {
                "beneficiary_name": "Rajesh Kumar",
                "account_number": "123456789012",
                "ifsc_code": "HDFC0001234"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_currency_defaults_to_inr() {
        let req = request();
        assert_eq!(req.currency, "INR");
        assert!(req.validate().is_ok());

        let command = req.into_command(PartyId::new_v7()).unwrap();
        assert_eq!(command.amount.currency().code(), "INR");
        assert_eq!(command.record_id, "ABDM123456789");
        assert!(command.payout_account.is_some());
    }

    #[test]
    fn test_empty_description_fails_validation() {
        let mut req = request();
        req.description = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_nested_bank_details_are_validated() {
        let mut req = request();
        if let Some(bank) = req.bank_details.as_mut() {
            bank.ifsc_code = "HDFC00012345678".to_string();
        }
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_unknown_currency_is_rejected() {
        let mut req = request();
        req.currency = "XYZ".to_string();
        assert!(matches!(
            req.into_command(PartyId::new_v7()),
            Err(ApiError::Validation(..))
        ));
    }

    #[test]
    fn test_decision_action_is_snake_case() {
        let req: DecisionRequest =
            serde_json::from_str(r#"{"action": "approve", "comments": "ok"}"#).unwrap();
        assert_eq!(req.action, DecisionAction::Approve);
    }
}
