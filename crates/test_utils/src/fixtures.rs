//! Pre-built Test Fixtures
//!
//! Consistent, predictable data for the claims test suites. The record ids
//! match the two patients seeded into the sandbox registry.

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use core_kernel::{CoveragePeriod, Money};
use rust_decimal_macros::dec;

use domain_claims::{BankAccount, ClaimDocument};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Coverage of the standard health policy
    pub fn coverage() -> Money {
        Money::inr(dec!(500000))
    }

    pub fn premium() -> Money {
        Money::inr(dec!(12000))
    }

    /// A typical hospitalisation claim
    pub fn claim_amount() -> Money {
        Money::inr(dec!(125000))
    }

    /// One paisa over the standard coverage
    pub fn over_coverage() -> Money {
        Money::inr(dec!(500000.01))
    }
}

/// Fixture for temporal test data, relative to now
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Policy that started a month ago and runs for a year
    pub fn current_period() -> CoveragePeriod {
        let now = Utc::now();
        // A 30-day start offset and one-year length always form a valid period.
        CoveragePeriod::new(now - Duration::days(30), now + Duration::days(335))
            .unwrap_or_else(|e| panic!("fixture period: {e}"))
    }

    /// Policy that ended last week
    pub fn lapsed_period() -> CoveragePeriod {
        let now = Utc::now();
        CoveragePeriod::new(now - Duration::days(372), now - Duration::days(7))
            .unwrap_or_else(|e| panic!("fixture period: {e}"))
    }

    /// Incident two days ago
    pub fn recent_incident() -> NaiveDate {
        Utc::now().date_naive() - Days::new(2)
    }

    pub fn policy_created_at() -> DateTime<Utc> {
        Utc::now() - Duration::days(30)
    }
}

/// Fixture for identifiers and free text
pub struct StringFixtures;

impl StringFixtures {
    /// Sandbox patient with a cardiac history
    pub fn rajesh_record_id() -> &'static str {
        "ABDM123456789"
    }

    /// Sandbox patient with a diabetes history
    pub fn priya_record_id() -> &'static str {
        "ABDM987654321"
    }

    /// Well-formed but absent from the sandbox registry
    pub fn unknown_record_id() -> &'static str {
        "ABDM000000001"
    }

    pub fn malformed_record_id() -> &'static str {
        "ABDM12345"
    }

    pub fn policy_number() -> &'static str {
        "POL-HEALTH-0001"
    }

    pub fn claim_description() -> &'static str {
        "Hospitalised for acute chest pain, angioplasty performed"
    }
}

/// Fixture for claim attachments and bank details
pub struct ClaimFixtures;

impl ClaimFixtures {
    pub fn discharge_summary() -> ClaimDocument {
        ClaimDocument::new(
            "discharge_summary",
            "discharge.pdf",
            "claims/discharge.pdf",
            120_000,
            "application/pdf",
        )
    }

    pub fn hospital_bill() -> ClaimDocument {
        ClaimDocument::new("bill", "bill.jpg", "claims/bill.jpg", 80_000, "image/jpeg")
    }

    pub fn bank_account() -> BankAccount {
        BankAccount::new("Rajesh Kumar", "123456789012", "HDFC0001234")
    }

    /// IFSC code with a lower-case bank prefix and too few characters
    pub fn invalid_bank_account() -> BankAccount {
        BankAccount::new("Rajesh Kumar", "123456789012", "hdfc01")
    }
}

/// Raw analysis backend replies
pub struct VerdictFixtures;

impl VerdictFixtures {
    /// Low-risk, valid claim
    pub fn clean() -> &'static str {
        r#"{
            "fraudScore": 12,
            "riskLevel": "LOW",
            "isValidClaim": true,
            "confidence": 91,
            "analysis": "Treatment matches the recorded diagnosis",
            "summary": "Consistent with medical history",
            "redFlags": [],
            "recommendations": ["Approve"],
            "diseaseMatch": true,
            "amountValidation": "APPROPRIATE"
        }"#
    }

    /// High risk but still a valid claim, so it goes to review
    pub fn high_risk() -> &'static str {
        r#"{
            "fraudScore": 72,
            "riskLevel": "HIGH",
            "isValidClaim": true,
            "confidence": 64,
            "summary": "Amount well above typical cost",
            "redFlags": ["Amount exceeds typical treatment cost"],
            "amountValidation": "TOO_HIGH"
        }"#
    }

    /// Backend judged the claim invalid; it is auto-rejected
    pub fn invalid_claim() -> &'static str {
        r#"{
            "fraudScore": 88,
            "riskLevel": "CRITICAL",
            "isValidClaim": false,
            "confidence": 80,
            "summary": "No matching diagnosis on record"
        }"#
    }

    /// Prose with no JSON object; the parser has to fall back to text extraction
    pub fn prose() -> &'static str {
        "After review the claim looks medium risk; the bill is somewhat above the usual cost."
    }
}
