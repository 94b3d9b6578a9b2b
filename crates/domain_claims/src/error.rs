//! Claims domain errors

use thiserror::Error;

use core_kernel::{ClaimId, PolicyId, PortError};

use crate::claim::ClaimStatus;

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Unknown policy, or a policy the claimant does not hold
    #[error("Policy not found: {0}")]
    PolicyNotFound(PolicyId),

    #[error("Policy {policy_id} cannot take claims: {reason}")]
    PolicyInactive { policy_id: PolicyId, reason: String },

    #[error("An active claim already exists for this policy: {existing}")]
    DuplicateClaim { existing: ClaimId },

    #[error("Invalid claim amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid record reference: {0}")]
    InvalidRecordReference(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid bank details: {0}")]
    InvalidBankDetails(String),

    /// Unknown claim, or a claim the caller may not see
    #[error("Claim not found: {0}")]
    ClaimNotFound(ClaimId),

    #[error("Claim {claim_id} has already been processed (status {status})")]
    AlreadyProcessed { claim_id: ClaimId, status: ClaimStatus },

    #[error("Cannot {operation} claim {claim_id} in status {status}")]
    InvalidState {
        claim_id: ClaimId,
        status: ClaimStatus,
        operation: &'static str,
    },

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Storage failure: {0}")]
    Store(#[from] PortError),
}

impl ClaimError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ClaimError::PolicyNotFound(_) => "POLICY_NOT_FOUND",
            ClaimError::PolicyInactive { .. } => "POLICY_INACTIVE",
            ClaimError::DuplicateClaim { .. } => "DUPLICATE_CLAIM",
            ClaimError::InvalidAmount(_) => "INVALID_AMOUNT",
            ClaimError::InvalidRecordReference(_) => "INVALID_RECORD_REFERENCE",
            ClaimError::InvalidDocument(_) => "INVALID_DOCUMENT",
            ClaimError::InvalidBankDetails(_) => "INVALID_BANK_DETAILS",
            ClaimError::ClaimNotFound(_) => "CLAIM_NOT_FOUND",
            ClaimError::AlreadyProcessed { .. } => "ALREADY_PROCESSED",
            ClaimError::InvalidState { .. } => "INVALID_STATE",
            ClaimError::NotAuthorized(_) => "NOT_AUTHORIZED",
            ClaimError::Store(_) => "INTERNAL_ERROR",
        }
    }

    /// Input problems the caller can fix; nothing was written
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ClaimError::PolicyInactive { .. }
                | ClaimError::InvalidAmount(_)
                | ClaimError::InvalidRecordReference(_)
                | ClaimError::InvalidDocument(_)
                | ClaimError::InvalidBankDetails(_)
        )
    }
}
