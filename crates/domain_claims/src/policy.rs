//! Policy snapshot as seen by the claims workflow
//!
//! Policies are administered elsewhere; the workflow only reads them to
//! check ownership, status, coverage amount and the validity window.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CoveragePeriod, Money, PartyId, PolicyId};

/// Lifecycle status of a purchased policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Active,
    Expired,
    Cancelled,
    Suspended,
}

impl PolicyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyStatus::Active => "active",
            PolicyStatus::Expired => "expired",
            PolicyStatus::Cancelled => "cancelled",
            PolicyStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(PolicyStatus::Active),
            "expired" => Ok(PolicyStatus::Expired),
            "cancelled" => Ok(PolicyStatus::Cancelled),
            "suspended" => Ok(PolicyStatus::Suspended),
            other => Err(format!("unknown policy status '{other}'")),
        }
    }
}

/// Line of business
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyType {
    Health,
    Vehicle,
    Life,
    Travel,
    Property,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Health => "Health",
            PolicyType::Vehicle => "Vehicle",
            PolicyType::Life => "Life",
            PolicyType::Travel => "Travel",
            PolicyType::Property => "Property",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "health" => Ok(PolicyType::Health),
            "vehicle" => Ok(PolicyType::Vehicle),
            "life" => Ok(PolicyType::Life),
            "travel" => Ok(PolicyType::Travel),
            "property" => Ok(PolicyType::Property),
            other => Err(format!("unknown policy type '{other}'")),
        }
    }
}

/// A purchased policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Canonical identifier
    pub id: PolicyId,
    /// Human-readable number, display only
    pub policy_number: String,
    /// Policy holder, the only party allowed to claim
    pub holder_id: PartyId,
    /// Insurer that adjudicates claims on this policy
    pub provider_id: PartyId,
    pub policy_type: PolicyType,
    pub coverage: Money,
    pub premium: Money,
    pub period: CoveragePeriod,
    pub status: PolicyStatus,
    pub created_at: DateTime<Utc>,
}

impl Policy {
    /// Whether an incident on `date` can be claimed against this policy
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.status == PolicyStatus::Active && self.period.covers_date(date)
    }

    /// Reason the policy cannot take a claim for `date`, if any
    pub fn inactive_reason(&self, date: NaiveDate) -> Option<String> {
        if self.status != PolicyStatus::Active {
            return Some(format!("policy is {}", self.status));
        }
        if !self.period.covers_date(date) {
            return Some(format!(
                "incident date {} is outside the coverage period {} to {}",
                date,
                self.period.start.date_naive(),
                self.period.end.date_naive()
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn policy(status: PolicyStatus) -> Policy {
        Policy {
            id: PolicyId::new_v7(),
            policy_number: "POL-2024-000001".to_string(),
            holder_id: PartyId::new_v7(),
            provider_id: PartyId::new_v7(),
            policy_type: PolicyType::Health,
            coverage: Money::inr(dec!(500000)),
            premium: Money::inr(dec!(12000)),
            period: CoveragePeriod::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap(),
            )
            .unwrap(),
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_active_policy_covers_date_in_window() {
        let p = policy(PolicyStatus::Active);
        assert!(p.covers(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()));
        assert!(p.inactive_reason(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()).is_none());
    }

    #[test]
    fn test_suspended_policy_covers_nothing() {
        let p = policy(PolicyStatus::Suspended);
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert!(!p.covers(date));
        assert!(p.inactive_reason(date).unwrap().contains("suspended"));
    }

    #[test]
    fn test_date_outside_window() {
        let p = policy(PolicyStatus::Active);
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert!(!p.covers(date));
        assert!(p.inactive_reason(date).unwrap().contains("outside"));
    }

    #[test]
    fn test_status_and_type_parse() {
        assert_eq!("ACTIVE".parse::<PolicyStatus>().unwrap(), PolicyStatus::Active);
        assert_eq!("health".parse::<PolicyType>().unwrap(), PolicyType::Health);
        assert!("boat".parse::<PolicyType>().is_err());
    }
}
