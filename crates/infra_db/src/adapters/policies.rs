//! PostgreSQL policy store

use async_trait::async_trait;
use tracing::instrument;

use core_kernel::{
    CoveragePeriod, Currency, DomainPort, Money, PartyId, PolicyId, PortError,
};
use domain_claims::{Policy, PolicyStatus, PolicyStore, PolicyType};

use crate::error::DatabaseError;
use crate::pool::DatabasePool;
use crate::repositories::policies::{PolicyRepository, PolicyRow};

/// PostgreSQL-backed implementation of [`PolicyStore`]
#[derive(Debug, Clone)]
pub struct PostgresPolicyStore {
    repository: PolicyRepository,
}

impl PostgresPolicyStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            repository: PolicyRepository::new(pool),
        }
    }

    /// Stores a policy. Used for seeding; claims never write policies.
    pub async fn insert_policy(&self, policy: &Policy) -> Result<(), PortError> {
        Ok(self.repository.insert(&policy_to_row(policy)).await?)
    }
}

impl DomainPort for PostgresPolicyStore {}

#[async_trait]
impl PolicyStore for PostgresPolicyStore {
    #[instrument(skip(self), fields(policy_id = %id))]
    async fn get_policy(&self, id: PolicyId) -> Result<Policy, PortError> {
        let row = self.repository.get_by_id(id.into()).await.map_err(|e| {
            if e.is_not_found() {
                PortError::not_found("Policy", id)
            } else {
                e.into()
            }
        })?;
        Ok(policy_from_row(row)?)
    }
}

fn policy_to_row(policy: &Policy) -> PolicyRow {
    PolicyRow {
        policy_id: policy.id.into(),
        policy_number: policy.policy_number.clone(),
        holder_id: policy.holder_id.into(),
        provider_id: policy.provider_id.into(),
        policy_type: policy.policy_type.as_str().to_ascii_lowercase(),
        coverage_amount: policy.coverage.amount(),
        premium_amount: policy.premium.amount(),
        currency: policy.coverage.currency().code().to_string(),
        valid_from: policy.period.start,
        valid_to: policy.period.end,
        status: policy.status.as_str().to_string(),
        created_at: policy.created_at,
    }
}

fn policy_from_row(row: PolicyRow) -> Result<Policy, DatabaseError> {
    let currency = Currency::from_code(row.currency.trim())
        .map_err(|e| DatabaseError::corrupt("policies.currency", e))?;
    let policy_type = row
        .policy_type
        .parse::<PolicyType>()
        .map_err(|e| DatabaseError::corrupt("policies.policy_type", e))?;
    let status = row
        .status
        .parse::<PolicyStatus>()
        .map_err(|e| DatabaseError::corrupt("policies.status", e))?;
    let period = CoveragePeriod::new(row.valid_from, row.valid_to)
        .map_err(|e| DatabaseError::corrupt("policies.valid_to", e))?;

    Ok(Policy {
        id: PolicyId::from(row.policy_id),
        policy_number: row.policy_number,
        holder_id: PartyId::from(row.holder_id),
        provider_id: PartyId::from(row.provider_id),
        policy_type,
        coverage: Money::new(row.coverage_amount, currency),
        premium: Money::new(row.premium_amount, currency),
        period,
        status,
        created_at: row.created_at,
    })
}
