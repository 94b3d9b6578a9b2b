//! User-facing notifications

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimId, DomainPort, NotificationId, PartyId, PortError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    NewClaim,
    ReviewRequired,
    ClaimAutoRejected,
    RecordsUnavailable,
    ClaimApproved,
    ClaimRejected,
    PayoutInitiated,
    PayoutSettled,
    PayoutFailed,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::NewClaim => "new_claim",
            NotificationCategory::ReviewRequired => "review_required",
            NotificationCategory::ClaimAutoRejected => "claim_auto_rejected",
            NotificationCategory::RecordsUnavailable => "records_unavailable",
            NotificationCategory::ClaimApproved => "claim_approved",
            NotificationCategory::ClaimRejected => "claim_rejected",
            NotificationCategory::PayoutInitiated => "payout_initiated",
            NotificationCategory::PayoutSettled => "payout_settled",
            NotificationCategory::PayoutFailed => "payout_failed",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_claim" => Ok(NotificationCategory::NewClaim),
            "review_required" => Ok(NotificationCategory::ReviewRequired),
            "claim_auto_rejected" => Ok(NotificationCategory::ClaimAutoRejected),
            "records_unavailable" => Ok(NotificationCategory::RecordsUnavailable),
            "claim_approved" => Ok(NotificationCategory::ClaimApproved),
            "claim_rejected" => Ok(NotificationCategory::ClaimRejected),
            "payout_initiated" => Ok(NotificationCategory::PayoutInitiated),
            "payout_settled" => Ok(NotificationCategory::PayoutSettled),
            "payout_failed" => Ok(NotificationCategory::PayoutFailed),
            other => Err(format!("unknown notification category '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: PartyId,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub related_claim: ClaimId,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient: PartyId,
        title: impl Into<String>,
        message: impl Into<String>,
        category: NotificationCategory,
        related_claim: ClaimId,
    ) -> Self {
        Self {
            id: NotificationId::new_v7(),
            recipient,
            title: title.into(),
            message: message.into(),
            category,
            related_claim,
            created_at: Utc::now(),
        }
    }
}

/// Inbox writer. The workflow logs failures and carries on.
#[async_trait]
pub trait Notifier: DomainPort {
    async fn notify(&self, notification: Notification) -> Result<(), PortError>;
}
