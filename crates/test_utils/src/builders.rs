//! Test Data Builders
//!
//! Builders with sensible defaults, so tests only spell out the fields they
//! care about.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{CoveragePeriod, Money, PartyId, PolicyId};

use domain_claims::{
    BankAccount, ClaimDocument, Policy, PolicyStatus, PolicyType, SubmitClaim,
};

use crate::fixtures::{ClaimFixtures, MoneyFixtures, StringFixtures, TemporalFixtures};

/// Builder for [`Policy`]
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    id: PolicyId,
    policy_number: String,
    holder_id: PartyId,
    provider_id: PartyId,
    policy_type: PolicyType,
    coverage: Money,
    premium: Money,
    period: CoveragePeriod,
    status: PolicyStatus,
    created_at: DateTime<Utc>,
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyBuilder {
    /// Active health policy, ₹500,000 coverage, fresh holder and provider
    pub fn new() -> Self {
        Self {
            id: PolicyId::new_v7(),
            policy_number: StringFixtures::policy_number().to_string(),
            holder_id: PartyId::new_v7(),
            provider_id: PartyId::new_v7(),
            policy_type: PolicyType::Health,
            coverage: MoneyFixtures::coverage(),
            premium: MoneyFixtures::premium(),
            period: TemporalFixtures::current_period(),
            status: PolicyStatus::Active,
            created_at: TemporalFixtures::policy_created_at(),
        }
    }

    pub fn with_id(mut self, id: PolicyId) -> Self {
        self.id = id;
        self
    }

    pub fn with_policy_number(mut self, number: impl Into<String>) -> Self {
        self.policy_number = number.into();
        self
    }

    pub fn with_holder(mut self, holder: PartyId) -> Self {
        self.holder_id = holder;
        self
    }

    pub fn with_provider(mut self, provider: PartyId) -> Self {
        self.provider_id = provider;
        self
    }

    pub fn with_type(mut self, policy_type: PolicyType) -> Self {
        self.policy_type = policy_type;
        self
    }

    pub fn with_coverage(mut self, coverage: Money) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn with_period(mut self, period: CoveragePeriod) -> Self {
        self.period = period;
        self
    }

    pub fn with_status(mut self, status: PolicyStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> Policy {
        Policy {
            id: self.id,
            policy_number: self.policy_number,
            holder_id: self.holder_id,
            provider_id: self.provider_id,
            policy_type: self.policy_type,
            coverage: self.coverage,
            premium: self.premium,
            period: self.period,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// Builder for [`SubmitClaim`] commands
#[derive(Debug, Clone)]
pub struct SubmitClaimBuilder {
    policy_id: PolicyId,
    claimant_id: PartyId,
    amount: Money,
    incident_date: NaiveDate,
    description: String,
    record_id: String,
    hospital_name: Option<String>,
    treatment_details: Option<String>,
    documents: Vec<ClaimDocument>,
    payout_account: Option<BankAccount>,
}

impl SubmitClaimBuilder {
    /// Claim by the policy's holder with one document and valid bank details
    pub fn for_policy(policy: &Policy) -> Self {
        Self {
            policy_id: policy.id,
            claimant_id: policy.holder_id,
            amount: MoneyFixtures::claim_amount(),
            incident_date: TemporalFixtures::recent_incident(),
            description: StringFixtures::claim_description().to_string(),
            record_id: StringFixtures::rajesh_record_id().to_string(),
            hospital_name: Some("Apollo Hospitals, Chennai".to_string()),
            treatment_details: Some("Angioplasty with stent placement".to_string()),
            documents: vec![ClaimFixtures::discharge_summary()],
            payout_account: Some(ClaimFixtures::bank_account()),
        }
    }

    pub fn with_claimant(mut self, claimant: PartyId) -> Self {
        self.claimant_id = claimant;
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_incident_date(mut self, date: NaiveDate) -> Self {
        self.incident_date = date;
        self
    }

    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = record_id.into();
        self
    }

    pub fn with_document(mut self, document: ClaimDocument) -> Self {
        self.documents.push(document);
        self
    }

    pub fn without_documents(mut self) -> Self {
        self.documents.clear();
        self
    }

    pub fn with_payout_account(mut self, account: BankAccount) -> Self {
        self.payout_account = Some(account);
        self
    }

    pub fn without_payout_account(mut self) -> Self {
        self.payout_account = None;
        self
    }

    pub fn build(self) -> SubmitClaim {
        SubmitClaim {
            policy_id: self.policy_id,
            claimant_id: self.claimant_id,
            amount: self.amount,
            incident_date: self.incident_date,
            description: self.description,
            record_id: self.record_id,
            hospital_name: self.hospital_name,
            treatment_details: self.treatment_details,
            documents: self.documents,
            payout_account: self.payout_account,
        }
    }
}
