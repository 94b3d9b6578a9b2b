//! Claim aggregate
//!
//! A claim moves through a small status machine owned by the workflow:
//!
//! ```text
//! Submitted ──> AnalysisPending ──> AutoRejected
//!                  │     │
//!                  │     └──> PendingProviderReview ──> Approved | Rejected
//!                  ▼                   ▲
//!          RecordsFetchFailed ─────────┘ (manual review)
//!                  │
//!                  └──> AnalysisPending (retry)
//! ```
//!
//! `Approved` carries a payout sub-state that never moves the claim back out
//! of approval.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimId, DocumentId, Money, PartyId, PayoutId, PolicyId};

use crate::error::ClaimError;
use crate::records::RecordId;
use crate::verdict::RiskVerdict;

/// Largest accepted upload, in bytes
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

const ACCEPTED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "pdf", "doc", "docx"];

const ACCEPTED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

static IFSC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{4}0[A-Z0-9]{6}$").expect("IFSC pattern compiles"));

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Accepted at intake, waiting for analysis
    Submitted,
    /// Records fetch and risk analysis in flight
    AnalysisPending,
    /// The records registry could not supply the patient history
    RecordsFetchFailed,
    /// The risk verdict marked the claim invalid
    AutoRejected,
    /// Waiting for the policy's provider to decide
    PendingProviderReview,
    /// Approved by the provider; see the payout sub-state
    Approved,
    /// Rejected by the provider
    Rejected,
}

impl ClaimStatus {
    pub const ACTIVE: [ClaimStatus; 4] = [
        ClaimStatus::Submitted,
        ClaimStatus::AnalysisPending,
        ClaimStatus::RecordsFetchFailed,
        ClaimStatus::PendingProviderReview,
    ];

    /// Terminal claims never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClaimStatus::AutoRejected | ClaimStatus::Approved | ClaimStatus::Rejected
        )
    }

    /// Active claims block a new submission on the same policy
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether the workflow may move a claim from `self` to `target`
    pub fn can_transition_to(&self, target: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (*self, target),
            (Submitted, AnalysisPending)
                | (RecordsFetchFailed, AnalysisPending)
                | (AnalysisPending, AnalysisPending)
                | (AnalysisPending, RecordsFetchFailed)
                | (AnalysisPending, AutoRejected)
                | (AnalysisPending, PendingProviderReview)
                | (RecordsFetchFailed, PendingProviderReview)
                | (PendingProviderReview, Approved)
                | (PendingProviderReview, Rejected)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Submitted => "submitted",
            ClaimStatus::AnalysisPending => "analysis_pending",
            ClaimStatus::RecordsFetchFailed => "records_fetch_failed",
            ClaimStatus::AutoRejected => "auto_rejected",
            ClaimStatus::PendingProviderReview => "pending_provider_review",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(ClaimStatus::Submitted),
            "analysis_pending" => Ok(ClaimStatus::AnalysisPending),
            "records_fetch_failed" => Ok(ClaimStatus::RecordsFetchFailed),
            "auto_rejected" => Ok(ClaimStatus::AutoRejected),
            "pending_provider_review" => Ok(ClaimStatus::PendingProviderReview),
            "approved" => Ok(ClaimStatus::Approved),
            "rejected" => Ok(ClaimStatus::Rejected),
            other => Err(format!("unknown claim status '{other}'")),
        }
    }
}

/// Payout progress of an approved claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutState {
    Initiated,
    Settled,
    Failed,
}

impl PayoutState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutState::Initiated => "initiated",
            PayoutState::Settled => "settled",
            PayoutState::Failed => "failed",
        }
    }
}

impl fmt::Display for PayoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(PayoutState::Initiated),
            "settled" => Ok(PayoutState::Settled),
            "failed" => Ok(PayoutState::Failed),
            other => Err(format!("unknown payout state '{other}'")),
        }
    }
}

/// Latest payout attempt as mirrored on the claim row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimPayout {
    pub state: PayoutState,
    pub payout_id: PayoutId,
    pub amount: Money,
}

/// Provider's verdict on a reviewed claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Reject,
}

impl DecisionAction {
    /// Status the claim lands in after this action
    pub fn target_status(&self) -> ClaimStatus {
        match self {
            DecisionAction::Approve => ClaimStatus::Approved,
            DecisionAction::Reject => ClaimStatus::Rejected,
        }
    }
}

/// Who decided, what and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDecision {
    pub decided_by: PartyId,
    pub action: DecisionAction,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Beneficiary bank details for the payout transfer
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub beneficiary_name: String,
    pub account_number: String,
    /// Indian Financial System Code of the branch
    pub ifsc_code: String,
}

impl BankAccount {
    pub fn new(
        beneficiary_name: impl Into<String>,
        account_number: impl Into<String>,
        ifsc_code: impl Into<String>,
    ) -> Self {
        Self {
            beneficiary_name: beneficiary_name.into(),
            account_number: account_number.into(),
            ifsc_code: ifsc_code.into(),
        }
    }

    /// Checks the account shape the payout gateway accepts
    pub fn validate(&self) -> Result<(), ClaimError> {
        if self.beneficiary_name.trim().is_empty() {
            return Err(ClaimError::InvalidBankDetails(
                "beneficiary name is required".to_string(),
            ));
        }
        let digits = self.account_number.len();
        if !(9..=18).contains(&digits) || !self.account_number.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ClaimError::InvalidBankDetails(
                "account number must be 9 to 18 digits".to_string(),
            ));
        }
        if !IFSC_PATTERN.is_match(&self.ifsc_code) {
            return Err(ClaimError::InvalidBankDetails(format!(
                "'{}' is not a valid IFSC code",
                self.ifsc_code
            )));
        }
        Ok(())
    }

    /// Account number with all but the last four digits hidden
    pub fn masked_account(&self) -> String {
        let total = self.account_number.chars().count();
        let hidden = total.saturating_sub(4);
        let tail: String = self.account_number.chars().skip(hidden).collect();
        format!("{}{}", "X".repeat(hidden), tail)
    }
}

// Account numbers stay out of logs.
impl fmt::Debug for BankAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankAccount")
            .field("beneficiary_name", &self.beneficiary_name)
            .field("account_number", &self.masked_account())
            .field("ifsc_code", &self.ifsc_code)
            .finish()
    }
}

/// Metadata for an uploaded supporting document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimDocument {
    pub id: DocumentId,
    /// Free-form label such as "discharge_summary"
    pub document_type: String,
    pub file_name: String,
    pub storage_path: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

impl ClaimDocument {
    pub fn new(
        document_type: impl Into<String>,
        file_name: impl Into<String>,
        storage_path: impl Into<String>,
        size_bytes: u64,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: DocumentId::new_v7(),
            document_type: document_type.into(),
            file_name: file_name.into(),
            storage_path: storage_path.into(),
            size_bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Accepts images, PDF and Word documents up to 10 MiB.
    ///
    /// Either the MIME type or the file extension may vouch for the type;
    /// browsers are inconsistent about what they send for `.docx`.
    pub fn validate(&self) -> Result<(), ClaimError> {
        if self.size_bytes > MAX_DOCUMENT_BYTES {
            return Err(ClaimError::InvalidDocument(format!(
                "{} is {} bytes, the limit is {} bytes",
                self.file_name, self.size_bytes, MAX_DOCUMENT_BYTES
            )));
        }

        let mime = self.mime_type.to_ascii_lowercase();
        let mime_ok = mime.starts_with("image/") || ACCEPTED_MIME_TYPES.contains(&mime.as_str());
        let extension_ok = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);

        if !mime_ok && !extension_ok {
            return Err(ClaimError::InvalidDocument(format!(
                "{} has unsupported type {}",
                self.file_name, self.mime_type
            )));
        }
        Ok(())
    }
}

/// Intake command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitClaim {
    pub policy_id: PolicyId,
    pub claimant_id: PartyId,
    pub amount: Money,
    pub incident_date: NaiveDate,
    pub description: String,
    /// External patient id in the health-record registry
    pub record_id: String,
    pub hospital_name: Option<String>,
    pub treatment_details: Option<String>,
    pub documents: Vec<ClaimDocument>,
    pub payout_account: Option<BankAccount>,
}

/// A claim against a policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,
    /// Human-readable number, `CLM-<year>-<hex>`
    pub claim_number: String,
    pub policy_id: PolicyId,
    pub claimant_id: PartyId,
    /// Provider of the policy at submission time
    pub provider_id: PartyId,
    pub amount: Money,
    pub incident_date: NaiveDate,
    pub description: String,
    pub record_id: RecordId,
    pub hospital_name: Option<String>,
    pub treatment_details: Option<String>,
    pub documents: Vec<ClaimDocument>,
    pub payout_account: Option<BankAccount>,
    pub status: ClaimStatus,
    /// Set once, together with the routing transition
    pub verdict: Option<RiskVerdict>,
    pub decision: Option<ProviderDecision>,
    pub payout: Option<ClaimPayout>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// Builds a freshly submitted claim from a validated command
    pub fn submitted(command: SubmitClaim, record_id: RecordId, provider_id: PartyId) -> Self {
        let now = Utc::now();
        let id = ClaimId::new_v7();
        Self {
            id,
            claim_number: claim_number_for(id, now),
            policy_id: command.policy_id,
            claimant_id: command.claimant_id,
            provider_id,
            amount: command.amount,
            incident_date: command.incident_date,
            description: command.description,
            record_id,
            hospital_name: command.hospital_name,
            treatment_details: command.treatment_details,
            documents: command.documents,
            payout_account: command.payout_account,
            status: ClaimStatus::Submitted,
            verdict: None,
            decision: None,
            payout: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Claimant or the provider on the policy
    pub fn is_visible_to(&self, party: PartyId) -> bool {
        self.claimant_id == party || self.provider_id == party
    }

    pub fn payout_state(&self) -> Option<PayoutState> {
        self.payout.as_ref().map(|p| p.state)
    }
}

/// `CLM-<year>-<16 hex digits>`, taken from the low 64 bits of the claim
/// id. Those bits are random or counter bits in a v7 UUID, so numbers stay
/// unique without a database round trip.
fn claim_number_for(id: ClaimId, at: DateTime<Utc>) -> String {
    format!("CLM-{}-{:016X}", at.year(), id.as_uuid().as_u128() as u64)
}
