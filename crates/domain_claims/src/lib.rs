//! Claim Adjudication Domain
//!
//! This crate implements the lifecycle of a health insurance claim from
//! submission through risk analysis, provider decision and payout.
//!
//! # Claim Lifecycle
//!
//! ```text
//! Submitted -> AnalysisPending -> RecordsFetchFailed ─┐
//!                              -> AutoRejected        │ (manual review)
//!                              -> PendingProviderReview <┘
//!                                   -> Approved (payout: Initiated -> Settled | Failed)
//!                                   -> Rejected
//! ```
//!
//! The [`workflow::ClaimWorkflow`] is the only writer of claim status. It
//! talks to storage through the traits in [`ports`] and to the outside world
//! through four clients, each of which owns its own fallback:
//!
//! - [`records::ExternalRecordsClient`] - national health-record registry
//! - [`analysis::RiskAnalysisClient`] - generative-AI fraud scoring
//! - [`payout::PayoutClient`] - bank transfer gateway
//! - [`ledger::LedgerClient`] - optional lifecycle notarization

pub mod policy;
pub mod claim;
pub mod verdict;
pub mod records;
pub mod analysis;
pub mod payout;
pub mod ledger;
pub mod notification;
pub mod ports;
pub mod workflow;
pub mod error;

pub use policy::{Policy, PolicyStatus, PolicyType};
pub use claim::{
    BankAccount, Claim, ClaimDocument, ClaimPayout, ClaimStatus, DecisionAction, PayoutState,
    ProviderDecision, SubmitClaim,
};
pub use verdict::{AmountValidation, RiskLevel, RiskVerdict, VerdictSource};
pub use records::{ExternalRecordsClient, RecordBundle, RecordId, RecordsConfig, RecordsError};
pub use analysis::{AnalysisConfig, AnalysisContext, AnalysisProvider, RiskAnalysisClient};
pub use payout::{
    PayoutClient, PayoutConfig, PayoutMode, PayoutRecord, PayoutRequest, PayoutResult, PayoutStatus,
};
pub use ledger::{LedgerClient, LedgerConfig, LedgerEvent, LedgerReceipt};
pub use notification::{Notification, NotificationCategory, Notifier};
pub use ports::{ClaimStore, CreateOutcome, PolicyStore, StatusChange, TransitionOutcome};
pub use workflow::{AnalysisOutcome, ClaimWorkflow, WorkflowConfig, WorkflowDependencies};
pub use error::ClaimError;
