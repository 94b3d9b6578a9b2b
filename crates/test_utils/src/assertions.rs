//! Custom Test Assertions
//!
//! Assertion helpers for claims that say what went wrong in domain terms.

use rust_decimal::Decimal;

use core_kernel::{Money, PartyId};
use domain_claims::{
    Claim, ClaimError, ClaimStatus, DecisionAction, PayoutState, RiskLevel, RiskVerdict,
    VerdictSource,
};

/// Asserts that two Money values are equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies differ or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts the claim's status
pub fn assert_claim_status(claim: &Claim, expected: ClaimStatus) {
    assert_eq!(
        claim.status, expected,
        "Claim {} is {}, expected {}",
        claim.claim_number, claim.status, expected
    );
}

/// Asserts the claim was routed with a verdict and the verdict matches the status
pub fn assert_routed(claim: &Claim) {
    let verdict = claim
        .verdict
        .as_ref()
        .unwrap_or_else(|| panic!("Claim {} has no verdict", claim.claim_number));
    let expected = if verdict.is_valid_claim {
        ClaimStatus::PendingProviderReview
    } else {
        ClaimStatus::AutoRejected
    };
    assert_claim_status(claim, expected);
}

/// Asserts a provider decision with `action` by `decider` is recorded
pub fn assert_decided(claim: &Claim, action: DecisionAction, decider: PartyId) {
    let decision = claim
        .decision
        .as_ref()
        .unwrap_or_else(|| panic!("Claim {} has no decision", claim.claim_number));
    assert_eq!(decision.action, action, "Unexpected decision action");
    assert_eq!(decision.decided_by, decider, "Decision made by someone else");
    assert_claim_status(claim, action.target_status());
}

/// Asserts the mirrored payout sub-state
pub fn assert_payout_state(claim: &Claim, expected: PayoutState) {
    assert_eq!(
        claim.payout_state(),
        Some(expected),
        "Claim {} payout state is {:?}, expected {}",
        claim.claim_number,
        claim.payout_state(),
        expected
    );
}

/// Asserts every verdict field sits in its documented range
pub fn assert_verdict_well_formed(verdict: &RiskVerdict) {
    assert!(verdict.fraud_score <= 100, "fraud score {} > 100", verdict.fraud_score);
    assert!(verdict.confidence <= 100, "confidence {} > 100", verdict.confidence);
    if verdict.source == VerdictSource::TextExtraction {
        assert!(
            verdict.analysis.chars().count() <= 500,
            "extracted analysis is not truncated"
        );
    }
}

/// Asserts the verdict is the fixed fallback
pub fn assert_fallback_verdict(verdict: &RiskVerdict) {
    assert_eq!(verdict.source, VerdictSource::Fallback, "verdict is not the fallback");
    assert_eq!(verdict, &RiskVerdict::fallback());
}

/// Asserts the verdict's tier
pub fn assert_risk_level(verdict: &RiskVerdict, expected: RiskLevel) {
    assert_eq!(
        verdict.risk_level, expected,
        "Risk level {}, expected {}",
        verdict.risk_level.as_str(),
        expected.as_str()
    );
}

/// Asserts that a result failed with the given error code
pub fn assert_claim_error<T: std::fmt::Debug>(result: Result<T, ClaimError>, code: &str) {
    match result {
        Ok(value) => panic!("Expected {code} error, got Ok({value:?})"),
        Err(error) => assert_eq!(error.code(), code, "Unexpected error: {error}"),
    }
}
