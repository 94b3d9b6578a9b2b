//! Claims Domain Ports
//!
//! Storage seams for the workflow. The PostgreSQL adapters live in
//! `infra_db`; in-memory adapters for tests live in [`mock`].
//!
//! Every status change goes through [`ClaimStore::transition`], a
//! conditional write keyed on the status the caller last saw. Adapters must
//! apply the check and the write atomically and report the status they found
//! when the check fails. The same holds for the payout sub-state.
//!
//! ```rust,ignore
//! let change = StatusChange::new(claim.id, ClaimStatus::PendingProviderReview, ClaimStatus::Approved)
//!     .with_decision(decision);
//! match claims.transition(&change).await? {
//!     TransitionOutcome::Applied(claim) => { /* we won */ }
//!     TransitionOutcome::Conflict { actual, .. } => { /* someone else moved it */ }
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::{ClaimId, DomainPort, PartyId, PolicyId, PortError};

use crate::claim::{Claim, ClaimStatus, PayoutState, ProviderDecision};
use crate::payout::PayoutRecord;
use crate::policy::Policy;
use crate::verdict::RiskVerdict;

pub use crate::analysis::AnalysisBackend;
pub use crate::ledger::LedgerBackend;
pub use crate::notification::Notifier;
pub use crate::payout::PayoutGateway;
pub use crate::records::RecordsSource;

/// Conditional status update
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub claim_id: ClaimId,
    /// Status the claim must currently have
    pub from: ClaimStatus,
    pub to: ClaimStatus,
    /// Written only if the claim has no verdict yet
    pub verdict: Option<RiskVerdict>,
    pub decision: Option<ProviderDecision>,
    /// When set, the claim must also have been untouched since this instant
    pub stale_before: Option<DateTime<Utc>>,
}

impl StatusChange {
    pub fn new(claim_id: ClaimId, from: ClaimStatus, to: ClaimStatus) -> Self {
        Self {
            claim_id,
            from,
            to,
            verdict: None,
            decision: None,
            stale_before: None,
        }
    }

    pub fn with_verdict(mut self, verdict: RiskVerdict) -> Self {
        self.verdict = Some(verdict);
        self
    }

    pub fn with_decision(mut self, decision: ProviderDecision) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn stale_before(mut self, instant: DateTime<Utc>) -> Self {
        self.stale_before = Some(instant);
        self
    }
}

/// Result of a conditional write
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    Applied(Claim),
    /// The precondition did not hold; carries what the store found
    Conflict {
        actual: ClaimStatus,
        payout: Option<PayoutState>,
    },
}

/// Result of an atomic duplicate-check-and-insert
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(Claim),
    /// Another active claim on the policy won
    ActiveClaimExists(ClaimId),
}

/// Read access to purchased policies
#[async_trait]
pub trait PolicyStore: DomainPort {
    async fn get_policy(&self, id: PolicyId) -> Result<Policy, PortError>;
}

/// Persistence for claims and their payout attempts
#[async_trait]
pub trait ClaimStore: DomainPort {
    /// Inserts `claim` unless the policy already has an active claim
    async fn create_claim(&self, claim: &Claim) -> Result<CreateOutcome, PortError>;

    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError>;

    async fn active_claim_for_policy(&self, policy_id: PolicyId) -> Result<Option<ClaimId>, PortError>;

    /// Newest first
    async fn claims_for_claimant(&self, claimant_id: PartyId) -> Result<Vec<Claim>, PortError>;

    /// Newest first
    async fn claims_for_provider(&self, provider_id: PartyId) -> Result<Vec<Claim>, PortError>;

    async fn transition(&self, change: &StatusChange) -> Result<TransitionOutcome, PortError>;

    /// Appends an attempt and mirrors it on the claim, provided the claim is
    /// approved and its sub-state is still `expected`
    async fn record_payout_attempt(
        &self,
        record: &PayoutRecord,
        expected: Option<PayoutState>,
    ) -> Result<TransitionOutcome, PortError>;

    /// Stores the outcome of an in-flight attempt and mirrors its state on
    /// the claim. Applies only while the claim still points at `record`
    /// with sub-state `initiated`.
    async fn complete_payout_attempt(&self, record: &PayoutRecord) -> Result<TransitionOutcome, PortError>;

    /// Oldest attempt first
    async fn payout_history(&self, claim_id: ClaimId) -> Result<Vec<PayoutRecord>, PortError>;
}

/// In-memory adapters and scripted backends for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{Mutex, RwLock};

    use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable};

    use crate::claim::ClaimPayout;
    use crate::ledger::LedgerEvent;
    use crate::notification::Notification;
    use crate::payout::{PayoutRequest, PayoutStatus, TransferReceipt};
    use crate::records::{RecordBundle, RecordId};

    /// In-memory policy store
    #[derive(Debug, Default)]
    pub struct InMemoryPolicyStore {
        policies: RwLock<HashMap<PolicyId, Policy>>,
    }

    impl InMemoryPolicyStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_policies(policies: Vec<Policy>) -> Self {
            let store = Self::new();
            for policy in policies {
                store.insert(policy).await;
            }
            store
        }

        pub async fn insert(&self, policy: Policy) {
            self.policies.write().await.insert(policy.id, policy);
        }
    }

    impl DomainPort for InMemoryPolicyStore {}

    #[async_trait]
    impl PolicyStore for InMemoryPolicyStore {
        async fn get_policy(&self, id: PolicyId) -> Result<Policy, PortError> {
            self.policies
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Policy", id))
        }
    }

    #[derive(Debug, Default)]
    struct ClaimTables {
        claims: HashMap<ClaimId, Claim>,
        payouts: Vec<PayoutRecord>,
    }

    impl ClaimTables {
        fn conflict(claim: &Claim) -> TransitionOutcome {
            TransitionOutcome::Conflict {
                actual: claim.status,
                payout: claim.payout_state(),
            }
        }
    }

    /// In-memory claim store. One lock guards both tables, so every
    /// check-and-write below is atomic.
    #[derive(Debug, Default)]
    pub struct InMemoryClaimStore {
        tables: RwLock<ClaimTables>,
        completions_failing: AtomicBool,
    }

    impl InMemoryClaimStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Rewrites a claim's `updated_at`, for lease expiry tests
        pub async fn backdate(&self, id: ClaimId, updated_at: DateTime<Utc>) {
            if let Some(claim) = self.tables.write().await.claims.get_mut(&id) {
                claim.updated_at = updated_at;
            }
        }

        pub async fn payout_count(&self) -> usize {
            self.tables.read().await.payouts.len()
        }

        /// Makes `complete_payout_attempt` fail as a lost connection would
        pub fn fail_payout_completions(&self, failing: bool) {
            self.completions_failing.store(failing, Ordering::SeqCst);
        }
    }

    impl DomainPort for InMemoryClaimStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryClaimStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::new("claim-store", AdapterHealth::Healthy, 0)
                .with_message("in-memory")
        }
    }

    #[async_trait]
    impl ClaimStore for InMemoryClaimStore {
        async fn create_claim(&self, claim: &Claim) -> Result<CreateOutcome, PortError> {
            let mut tables = self.tables.write().await;
            if let Some(existing) = tables
                .claims
                .values()
                .find(|c| c.policy_id == claim.policy_id && c.status.is_active())
            {
                return Ok(CreateOutcome::ActiveClaimExists(existing.id));
            }
            tables.claims.insert(claim.id, claim.clone());
            Ok(CreateOutcome::Created(claim.clone()))
        }

        async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
            self.tables
                .read()
                .await
                .claims
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Claim", id))
        }

        async fn active_claim_for_policy(&self, policy_id: PolicyId) -> Result<Option<ClaimId>, PortError> {
            Ok(self
                .tables
                .read()
                .await
                .claims
                .values()
                .find(|c| c.policy_id == policy_id && c.status.is_active())
                .map(|c| c.id))
        }

        async fn claims_for_claimant(&self, claimant_id: PartyId) -> Result<Vec<Claim>, PortError> {
            let tables = self.tables.read().await;
            let mut claims: Vec<Claim> = tables
                .claims
                .values()
                .filter(|c| c.claimant_id == claimant_id)
                .cloned()
                .collect();
            claims.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(claims)
        }

        async fn claims_for_provider(&self, provider_id: PartyId) -> Result<Vec<Claim>, PortError> {
            let tables = self.tables.read().await;
            let mut claims: Vec<Claim> = tables
                .claims
                .values()
                .filter(|c| c.provider_id == provider_id)
                .cloned()
                .collect();
            claims.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(claims)
        }

        async fn transition(&self, change: &StatusChange) -> Result<TransitionOutcome, PortError> {
            let mut tables = self.tables.write().await;
            let claim = tables
                .claims
                .get_mut(&change.claim_id)
                .ok_or_else(|| PortError::not_found("Claim", change.claim_id))?;

            let fresh = change
                .stale_before
                .map(|cutoff| claim.updated_at >= cutoff)
                .unwrap_or(false);
            if claim.status != change.from || fresh {
                return Ok(ClaimTables::conflict(claim));
            }

            claim.status = change.to;
            if claim.verdict.is_none() {
                if let Some(verdict) = &change.verdict {
                    claim.verdict = Some(verdict.clone());
                }
            }
            if let Some(decision) = &change.decision {
                claim.decision = Some(decision.clone());
            }
            claim.updated_at = Utc::now();
            Ok(TransitionOutcome::Applied(claim.clone()))
        }

        async fn record_payout_attempt(
            &self,
            record: &PayoutRecord,
            expected: Option<PayoutState>,
        ) -> Result<TransitionOutcome, PortError> {
            let mut tables = self.tables.write().await;
            let claim = tables
                .claims
                .get_mut(&record.claim_id)
                .ok_or_else(|| PortError::not_found("Claim", record.claim_id))?;

            if claim.status != ClaimStatus::Approved || claim.payout_state() != expected {
                return Ok(ClaimTables::conflict(claim));
            }

            claim.payout = Some(ClaimPayout {
                state: record.status.payout_state(),
                payout_id: record.id,
                amount: record.amount,
            });
            claim.updated_at = Utc::now();
            let updated = claim.clone();
            tables.payouts.push(record.clone());
            Ok(TransitionOutcome::Applied(updated))
        }

        async fn complete_payout_attempt(&self, record: &PayoutRecord) -> Result<TransitionOutcome, PortError> {
            if self.completions_failing.load(Ordering::SeqCst) {
                return Err(PortError::connection("claim store connection lost"));
            }
            let mut guard = self.tables.write().await;
            let tables = &mut *guard;
            let claim = tables
                .claims
                .get_mut(&record.claim_id)
                .ok_or_else(|| PortError::not_found("Claim", record.claim_id))?;

            let in_flight = claim.status == ClaimStatus::Approved
                && claim
                    .payout
                    .as_ref()
                    .is_some_and(|p| p.payout_id == record.id && p.state == PayoutState::Initiated);
            if !in_flight {
                return Ok(ClaimTables::conflict(claim));
            }

            let stored = tables
                .payouts
                .iter_mut()
                .find(|p| p.id == record.id)
                .ok_or_else(|| PortError::not_found("PayoutRecord", record.id))?;
            *stored = PayoutRecord {
                updated_at: Utc::now(),
                ..record.clone()
            };

            if let Some(payout) = claim.payout.as_mut() {
                payout.state = record.status.payout_state();
            }
            claim.updated_at = Utc::now();
            Ok(TransitionOutcome::Applied(claim.clone()))
        }

        async fn payout_history(&self, claim_id: ClaimId) -> Result<Vec<PayoutRecord>, PortError> {
            let mut records: Vec<PayoutRecord> = self
                .tables
                .read()
                .await
                .payouts
                .iter()
                .filter(|p| p.claim_id == claim_id)
                .cloned()
                .collect();
            records.sort_by_key(|p| p.attempt);
            Ok(records)
        }
    }

    /// Notifier that keeps everything it was asked to send
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
        failing: AtomicBool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every `notify` call fails
        pub fn failing() -> Self {
            let notifier = Self::default();
            notifier.failing.store(true, Ordering::SeqCst);
            notifier
        }

        pub async fn sent(&self) -> Vec<Notification> {
            self.sent.lock().await.clone()
        }

        pub async fn sent_to(&self, recipient: PartyId) -> Vec<Notification> {
            self.sent()
                .await
                .into_iter()
                .filter(|n| n.recipient == recipient)
                .collect()
        }
    }

    impl DomainPort for RecordingNotifier {}

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, notification: Notification) -> Result<(), PortError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PortError::connection("notification inbox unreachable"));
            }
            self.sent.lock().await.push(notification);
            Ok(())
        }
    }

    /// What a scripted backend does when called
    #[derive(Debug, Clone)]
    pub enum Script {
        Reply(String),
        Fail,
        Hang,
    }

    /// Analysis backend that follows a script
    #[derive(Debug)]
    pub struct ScriptedAnalysisBackend {
        script: Script,
        calls: AtomicUsize,
    }

    impl ScriptedAnalysisBackend {
        pub fn new(script: Script) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn reply(text: impl Into<String>) -> Self {
            Self::new(Script::Reply(text.into()))
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnalysisBackend for ScriptedAnalysisBackend {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, PortError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Reply(text) => Ok(text.clone()),
                Script::Fail => Err(PortError::unavailable("scripted analysis backend")),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    /// Records source that always fails in transport
    #[derive(Debug, Default)]
    pub struct UnreachableRecordsSource;

    #[async_trait]
    impl RecordsSource for UnreachableRecordsSource {
        async fn lookup(&self, _id: &RecordId) -> Result<Option<RecordBundle>, PortError> {
            Err(PortError::connection("records registry unreachable"))
        }

        fn name(&self) -> &'static str {
            "unreachable"
        }
    }

    /// Payout gateway that answers every transfer with one scripted result
    #[derive(Debug)]
    pub struct ScriptedPayoutGateway {
        outcome: Mutex<Result<PayoutStatus, String>>,
        status_report: Mutex<PayoutStatus>,
        calls: AtomicUsize,
    }

    impl ScriptedPayoutGateway {
        /// Accepts transfers with `status`
        pub fn accepting(status: PayoutStatus) -> Self {
            Self {
                outcome: Mutex::new(Ok(status)),
                status_report: Mutex::new(status),
                calls: AtomicUsize::new(0),
            }
        }

        /// Refuses transfers with a 5xx-style failure
        pub fn refusing(message: impl Into<String>) -> Self {
            Self {
                outcome: Mutex::new(Err(message.into())),
                status_report: Mutex::new(PayoutStatus::Failed),
                calls: AtomicUsize::new(0),
            }
        }

        /// Switches the scripted transfer outcome
        pub async fn set_outcome(&self, outcome: Result<PayoutStatus, String>) {
            *self.outcome.lock().await = outcome;
        }

        /// Sets what status checks report
        pub async fn set_status_report(&self, status: PayoutStatus) {
            *self.status_report.lock().await = status;
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PayoutGateway for ScriptedPayoutGateway {
        async fn create_transfer(
            &self,
            transfer_id: &str,
            _request: &PayoutRequest,
        ) -> Result<TransferReceipt, PortError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome.lock().await.clone() {
                Ok(status) => Ok(TransferReceipt {
                    transfer_id: transfer_id.to_string(),
                    reference: Some(format!("UTR-{transfer_id}")),
                    status,
                }),
                Err(message) => Err(PortError::unavailable(message)),
            }
        }

        async fn transfer_status(&self, transfer_id: &str) -> Result<TransferReceipt, PortError> {
            Ok(TransferReceipt {
                transfer_id: transfer_id.to_string(),
                reference: Some(format!("UTR-{transfer_id}")),
                status: *self.status_report.lock().await,
            })
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    /// Ledger backend that remembers events, or refuses them all
    #[derive(Debug, Default)]
    pub struct RecordingLedgerBackend {
        events: Mutex<Vec<LedgerEvent>>,
        down: bool,
    }

    impl RecordingLedgerBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn down() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                down: true,
            }
        }

        pub async fn events(&self) -> Vec<LedgerEvent> {
            self.events.lock().await.clone()
        }
    }

    #[async_trait]
    impl LedgerBackend for RecordingLedgerBackend {
        async fn submit(&self, event: &LedgerEvent) -> Result<String, PortError> {
            if self.down {
                return Err(PortError::connection("ledger unreachable"));
            }
            let mut events = self.events.lock().await;
            events.push(event.clone());
            Ok(format!("0x{:064x}", events.len()))
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }
}
