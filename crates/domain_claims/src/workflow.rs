//! Claim workflow
//!
//! The only component with branching business logic and the only writer of
//! claim status. Every transition is a conditional write at the store, so
//! two requests racing on the same claim cannot both win.
//!
//! Side channels (notifications and the ledger) are best-effort: their
//! failures are logged and never change the outcome of an operation.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use core_kernel::{ClaimId, HealthCheckResult, HealthCheckable, PartyId, PolicyId};

use crate::analysis::{AnalysisContext, RiskAnalysisClient};
use crate::claim::{
    Claim, ClaimStatus, DecisionAction, PayoutState, ProviderDecision, SubmitClaim,
};
use crate::error::ClaimError;
use crate::ledger::{LedgerClient, LedgerEvent};
use crate::notification::{Notification, NotificationCategory, Notifier};
use crate::payout::{PayoutClient, PayoutRecord, PayoutRequest, PayoutResult};
use crate::policy::Policy;
use crate::ports::{ClaimStore, CreateOutcome, PolicyStore, StatusChange, TransitionOutcome};
use crate::records::{ExternalRecordsClient, RecordId, RecordsError};
use crate::verdict::RiskVerdict;

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// How long an `AnalysisPending` claim stays claimed before another
    /// request may take the analysis over
    pub analysis_lease: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            analysis_lease: Duration::from_secs(300),
        }
    }
}

/// Everything the workflow talks to, constructed once at startup
#[derive(Clone)]
pub struct WorkflowDependencies {
    pub policies: Arc<dyn PolicyStore>,
    pub claims: Arc<dyn ClaimStore>,
    pub records: ExternalRecordsClient,
    pub analysis: RiskAnalysisClient,
    pub payouts: PayoutClient,
    pub ledger: LedgerClient,
    pub notifier: Arc<dyn Notifier>,
}

/// Result of running analysis on a claim
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    /// Verdict stored; the claim is `AutoRejected` or `PendingProviderReview`
    Routed { claim: Claim, verdict: RiskVerdict },
    /// The registry could not supply records; the claim waits in
    /// `RecordsFetchFailed` for a retry or manual review
    RecordsUnavailable { claim: Claim, error: RecordsError },
}

impl AnalysisOutcome {
    pub fn claim(&self) -> &Claim {
        match self {
            AnalysisOutcome::Routed { claim, .. } => claim,
            AnalysisOutcome::RecordsUnavailable { claim, .. } => claim,
        }
    }

    pub fn verdict(&self) -> Option<&RiskVerdict> {
        match self {
            AnalysisOutcome::Routed { verdict, .. } => Some(verdict),
            AnalysisOutcome::RecordsUnavailable { .. } => None,
        }
    }

    pub fn into_claim(self) -> Claim {
        match self {
            AnalysisOutcome::Routed { claim, .. } => claim,
            AnalysisOutcome::RecordsUnavailable { claim, .. } => claim,
        }
    }
}

pub struct ClaimWorkflow {
    policies: Arc<dyn PolicyStore>,
    claims: Arc<dyn ClaimStore>,
    records: ExternalRecordsClient,
    analysis: RiskAnalysisClient,
    payouts: PayoutClient,
    ledger: LedgerClient,
    notifier: Arc<dyn Notifier>,
    config: WorkflowConfig,
}

impl ClaimWorkflow {
    pub fn new(deps: WorkflowDependencies, config: WorkflowConfig) -> Self {
        Self {
            policies: deps.policies,
            claims: deps.claims,
            records: deps.records,
            analysis: deps.analysis,
            payouts: deps.payouts,
            ledger: deps.ledger,
            notifier: deps.notifier,
            config,
        }
    }

    /// Validates and stores a new claim in `Submitted`.
    ///
    /// Checks run in a fixed order and the first failure wins: policy,
    /// duplicate, amount, record id, documents and bank details. Nothing is
    /// written unless all pass.
    #[instrument(skip(self, command), fields(policy_id = %command.policy_id, claimant_id = %command.claimant_id))]
    pub async fn submit(&self, command: SubmitClaim) -> Result<Claim, ClaimError> {
        let policy = self.load_policy(command.policy_id).await?;
        if policy.holder_id != command.claimant_id {
            return Err(ClaimError::PolicyNotFound(command.policy_id));
        }
        if let Some(reason) = policy.inactive_reason(command.incident_date) {
            return Err(ClaimError::PolicyInactive {
                policy_id: policy.id,
                reason,
            });
        }

        if let Some(existing) = self.claims.active_claim_for_policy(policy.id).await? {
            return Err(ClaimError::DuplicateClaim { existing });
        }

        match command.amount.is_within(&policy.coverage) {
            Ok(true) => {}
            Ok(false) => {
                return Err(ClaimError::InvalidAmount(format!(
                    "{} must be more than zero and no more than the coverage of {}",
                    command.amount, policy.coverage
                )))
            }
            Err(e) => return Err(ClaimError::InvalidAmount(e.to_string())),
        }

        let record_id = RecordId::parse(&command.record_id)
            .map_err(|e| ClaimError::InvalidRecordReference(e.to_string()))?;

        for document in &command.documents {
            document.validate()?;
        }
        if let Some(account) = &command.payout_account {
            account.validate()?;
        }

        let candidate = Claim::submitted(command, record_id, policy.provider_id);
        let claim = match self.claims.create_claim(&candidate).await? {
            CreateOutcome::Created(claim) => claim,
            CreateOutcome::ActiveClaimExists(existing) => {
                return Err(ClaimError::DuplicateClaim { existing });
            }
        };

        info!(
            claim_id = %claim.id,
            claim_number = %claim.claim_number,
            amount = %claim.amount,
            "Claim submitted"
        );

        self.notify(Notification::new(
            claim.provider_id,
            "New Claim Submitted",
            format!(
                "New claim {} of {} submitted on policy {}. Risk analysis pending.",
                claim.claim_number, claim.amount, policy.policy_number
            ),
            NotificationCategory::NewClaim,
            claim.id,
        ))
        .await;
        self.record_ledger(LedgerEvent::ClaimSubmitted {
            claim_id: claim.id,
            policy_id: claim.policy_id,
            amount: claim.amount,
        })
        .await;

        Ok(claim)
    }

    /// Fetches records, scores the claim and routes it.
    ///
    /// A records failure parks the claim in `RecordsFetchFailed` instead of
    /// rejecting it; the caller sees [`AnalysisOutcome::RecordsUnavailable`].
    #[instrument(skip(self), fields(claim_id = %claim_id))]
    pub async fn run_analysis(&self, claim_id: ClaimId) -> Result<AnalysisOutcome, ClaimError> {
        let claim = self.load_claim(claim_id).await?;

        let claim_work = match claim.status {
            ClaimStatus::Submitted | ClaimStatus::RecordsFetchFailed => {
                StatusChange::new(claim.id, claim.status, ClaimStatus::AnalysisPending)
            }
            ClaimStatus::AnalysisPending => {
                let lease = chrono::Duration::from_std(self.config.analysis_lease)
                    .unwrap_or_else(|_| chrono::Duration::minutes(5));
                let cutoff = Utc::now() - lease;
                if claim.updated_at >= cutoff {
                    return Err(ClaimError::InvalidState {
                        claim_id,
                        status: claim.status,
                        operation: "analyse",
                    });
                }
                warn!(claim_id = %claim_id, "Analysis lease expired, taking the claim over");
                StatusChange::new(claim.id, ClaimStatus::AnalysisPending, ClaimStatus::AnalysisPending)
                    .stale_before(cutoff)
            }
            status => return Err(ClaimError::AlreadyProcessed { claim_id, status }),
        };

        let policy = self.load_policy(claim.policy_id).await?;
        let claim = self.apply(&claim_work).await?;

        let records = match self.records.fetch_id(&claim.record_id).await {
            Ok(records) => records,
            Err(error) => return self.park_for_records(claim, error).await,
        };

        let context = AnalysisContext {
            amount: claim.amount,
            policy_type: policy.policy_type,
            coverage: policy.coverage,
            description: claim.description.clone(),
            incident_date: claim.incident_date,
            hospital_name: claim.hospital_name.clone(),
            treatment_details: claim.treatment_details.clone(),
            records,
            documents: claim.documents.clone(),
        };
        let verdict = self.analysis.analyze(&context).await;

        let target = if verdict.is_valid_claim {
            ClaimStatus::PendingProviderReview
        } else {
            ClaimStatus::AutoRejected
        };
        let change = StatusChange::new(claim.id, ClaimStatus::AnalysisPending, target)
            .with_verdict(verdict.clone());
        let claim = self.apply(&change).await?;

        info!(
            claim_id = %claim.id,
            status = %claim.status,
            fraud_score = verdict.fraud_score,
            risk_level = %verdict.risk_level,
            source = ?verdict.source,
            "Claim analysed"
        );

        if target == ClaimStatus::AutoRejected {
            self.notify(Notification::new(
                claim.claimant_id,
                "Claim Rejected",
                format!(
                    "Your claim {} was rejected after automated review. {}",
                    claim.claim_number, verdict.summary
                ),
                NotificationCategory::ClaimAutoRejected,
                claim.id,
            ))
            .await;
        } else {
            self.notify(Notification::new(
                claim.provider_id,
                "Claim Ready for Review",
                format!(
                    "Claim {} of {} is ready for review. AI Analysis: {} risk, {}% fraud score.",
                    claim.claim_number, claim.amount, verdict.risk_level, verdict.fraud_score
                ),
                NotificationCategory::ReviewRequired,
                claim.id,
            ))
            .await;
        }

        self.record_ledger(LedgerEvent::ClaimAnalysed {
            claim_id: claim.id,
            fraud_score: verdict.fraud_score,
            risk_level: verdict.risk_level,
            is_valid_claim: verdict.is_valid_claim,
        })
        .await;
        if target == ClaimStatus::AutoRejected {
            self.record_ledger(LedgerEvent::ClaimRejected {
                claim_id: claim.id,
                rejected_by: None,
            })
            .await;
        }

        Ok(AnalysisOutcome::Routed { claim, verdict })
    }

    async fn park_for_records(
        &self,
        claim: Claim,
        error: RecordsError,
    ) -> Result<AnalysisOutcome, ClaimError> {
        warn!(
            claim_id = %claim.id,
            record_id = %claim.record_id,
            kind = error.kind(),
            error = %error,
            "Patient records unavailable, claim needs manual handling"
        );

        let change = StatusChange::new(
            claim.id,
            ClaimStatus::AnalysisPending,
            ClaimStatus::RecordsFetchFailed,
        );
        let claim = self.apply(&change).await?;

        self.notify(Notification::new(
            claim.provider_id,
            "Records Unavailable",
            format!(
                "Medical records for claim {} could not be fetched ({}). Retry the analysis or review it manually.",
                claim.claim_number,
                error.kind()
            ),
            NotificationCategory::RecordsUnavailable,
            claim.id,
        ))
        .await;

        Ok(AnalysisOutcome::RecordsUnavailable { claim, error })
    }

    /// `submit` followed by `run_analysis`, for single-request intake
    pub async fn submit_and_analyse(&self, command: SubmitClaim) -> Result<AnalysisOutcome, ClaimError> {
        let claim = self.submit(command).await?;
        self.run_analysis(claim.id).await
    }

    /// Provider's approve or reject on a claim in `PendingProviderReview`.
    ///
    /// The new status is committed before the payout is attempted, and a
    /// payout failure never reverts the approval.
    #[instrument(skip(self, comments), fields(claim_id = %claim_id, decider = %decider, action = ?action))]
    pub async fn decide(
        &self,
        claim_id: ClaimId,
        decider: PartyId,
        action: DecisionAction,
        comments: Option<String>,
    ) -> Result<Claim, ClaimError> {
        let claim = self.load_claim(claim_id).await?;
        if claim.provider_id != decider {
            return Err(ClaimError::NotAuthorized(format!(
                "only the policy's provider can decide claim {}",
                claim.claim_number
            )));
        }
        match claim.status {
            ClaimStatus::PendingProviderReview => {}
            status if status.is_terminal() => {
                return Err(ClaimError::AlreadyProcessed { claim_id, status });
            }
            status => {
                return Err(ClaimError::InvalidState {
                    claim_id,
                    status,
                    operation: "decide",
                });
            }
        }

        let comments = comments.filter(|c| !c.trim().is_empty());
        let decision = ProviderDecision {
            decided_by: decider,
            action,
            comments: comments.clone(),
            decided_at: Utc::now(),
        };
        let change = StatusChange::new(
            claim.id,
            ClaimStatus::PendingProviderReview,
            action.target_status(),
        )
        .with_decision(decision);
        let claim = self.apply(&change).await?;

        info!(claim_id = %claim.id, status = %claim.status, "Provider decision recorded");

        match action {
            DecisionAction::Reject => {
                self.notify(Notification::new(
                    claim.claimant_id,
                    "Claim Rejected",
                    format!(
                        "Your claim {} has been rejected. Reason: {}",
                        claim.claim_number,
                        comments.as_deref().unwrap_or("No reason provided")
                    ),
                    NotificationCategory::ClaimRejected,
                    claim.id,
                ))
                .await;
                self.record_ledger(LedgerEvent::ClaimRejected {
                    claim_id: claim.id,
                    rejected_by: Some(decider),
                })
                .await;
                Ok(claim)
            }
            DecisionAction::Approve => {
                self.record_ledger(LedgerEvent::ClaimApproved {
                    claim_id: claim.id,
                    approved_by: decider,
                    amount: claim.amount,
                })
                .await;
                self.pay(claim, 1, None).await
            }
        }
    }

    /// Moves a `RecordsFetchFailed` claim to provider review without a verdict
    #[instrument(skip(self), fields(claim_id = %claim_id, decider = %decider))]
    pub async fn release_for_review(&self, claim_id: ClaimId, decider: PartyId) -> Result<Claim, ClaimError> {
        let claim = self.load_claim(claim_id).await?;
        if claim.provider_id != decider {
            return Err(ClaimError::NotAuthorized(format!(
                "only the policy's provider can review claim {}",
                claim.claim_number
            )));
        }
        match claim.status {
            ClaimStatus::RecordsFetchFailed => {}
            status if status.is_terminal() => {
                return Err(ClaimError::AlreadyProcessed { claim_id, status });
            }
            status => {
                return Err(ClaimError::InvalidState {
                    claim_id,
                    status,
                    operation: "release for manual review",
                });
            }
        }

        let change = StatusChange::new(
            claim.id,
            ClaimStatus::RecordsFetchFailed,
            ClaimStatus::PendingProviderReview,
        );
        let claim = self.apply(&change).await?;
        info!(claim_id = %claim.id, "Claim released for manual review");
        Ok(claim)
    }

    /// New payout attempt for an approved claim whose last payout failed,
    /// or whose first attempt was never stored
    #[instrument(skip(self), fields(claim_id = %claim_id, operator = %operator))]
    pub async fn retry_payout(&self, claim_id: ClaimId, operator: PartyId) -> Result<Claim, ClaimError> {
        let claim = self.load_claim(claim_id).await?;
        if claim.provider_id != operator {
            return Err(ClaimError::NotAuthorized(format!(
                "only the policy's provider can retry the payout for claim {}",
                claim.claim_number
            )));
        }
        let expected = claim.payout_state();
        if claim.status != ClaimStatus::Approved || !matches!(expected, None | Some(PayoutState::Failed)) {
            return Err(ClaimError::InvalidState {
                claim_id,
                status: claim.status,
                operation: "retry the payout of",
            });
        }

        let attempt = self.claims.payout_history(claim.id).await?.len() as u32 + 1;
        info!(claim_id = %claim.id, attempt, "Retrying payout");
        self.pay(claim, attempt, expected).await
    }

    /// Asks the gateway how an in-flight transfer is doing and settles or
    /// fails the payout accordingly
    #[instrument(skip(self), fields(claim_id = %claim_id))]
    pub async fn refresh_payout(&self, claim_id: ClaimId) -> Result<Claim, ClaimError> {
        let claim = self.load_claim(claim_id).await?;
        let payout = match (&claim.status, &claim.payout) {
            (ClaimStatus::Approved, Some(p)) if p.state == PayoutState::Initiated => p.clone(),
            _ => {
                return Err(ClaimError::InvalidState {
                    claim_id,
                    status: claim.status,
                    operation: "refresh the payout of",
                });
            }
        };

        let history = self.claims.payout_history(claim.id).await?;
        let Some(record) = history.into_iter().find(|r| r.id == payout.payout_id) else {
            return Err(core_kernel::PortError::not_found("PayoutRecord", payout.payout_id).into());
        };
        let Some(transfer_id) = record.transfer_id.clone() else {
            debug!(claim_id = %claim.id, "Payout attempt has no transfer to check");
            return Ok(claim);
        };

        let resolved = match self.payouts.transfer_status(&transfer_id).await {
            Ok(receipt) => record.clone().with_receipt(&receipt),
            Err(e) if e.is_not_found() => {
                warn!(claim_id = %claim.id, %transfer_id, "Gateway has no such transfer, attempt failed");
                record
                    .clone()
                    .resolved(&PayoutResult::failed("transfer_not_found", e.to_string()))
            }
            Err(e) => {
                warn!(claim_id = %claim.id, %transfer_id, error = %e, "Transfer status check failed");
                return Ok(claim);
            }
        };

        let next = resolved.status.payout_state();
        if next == PayoutState::Initiated && resolved.status == record.status {
            return Ok(claim);
        }
        let claim = self.complete_attempt(claim_id, &resolved).await?;
        if next == PayoutState::Initiated {
            return Ok(claim);
        }

        if next == PayoutState::Settled {
            info!(claim_id = %claim.id, %transfer_id, "Payout settled");
            self.notify(Notification::new(
                claim.claimant_id,
                "Payment Completed",
                format!(
                    "Payment of {} for claim {} has been credited to your bank account.",
                    payout.amount, claim.claim_number
                ),
                NotificationCategory::PayoutSettled,
                claim.id,
            ))
            .await;
        } else {
            let kind = resolved.error_kind.as_deref().unwrap_or("transfer_failed");
            self.alert_payout_failure(&claim, kind).await;
        }
        Ok(claim)
    }

    /// Claim as seen by its claimant or provider
    pub async fn get_claim(&self, claim_id: ClaimId, viewer: PartyId) -> Result<Claim, ClaimError> {
        let claim = self.load_claim(claim_id).await?;
        if !claim.is_visible_to(viewer) {
            return Err(ClaimError::ClaimNotFound(claim_id));
        }
        Ok(claim)
    }

    pub async fn claims_for_claimant(&self, claimant: PartyId) -> Result<Vec<Claim>, ClaimError> {
        Ok(self.claims.claims_for_claimant(claimant).await?)
    }

    pub async fn claims_for_provider(&self, provider: PartyId) -> Result<Vec<Claim>, ClaimError> {
        Ok(self.claims.claims_for_provider(provider).await?)
    }

    /// All payout attempts on a claim, oldest first
    pub async fn payout_history(
        &self,
        claim_id: ClaimId,
        viewer: PartyId,
    ) -> Result<Vec<PayoutRecord>, ClaimError> {
        let claim = self.get_claim(claim_id, viewer).await?;
        Ok(self.claims.payout_history(claim.id).await?)
    }

    /// Health of the external integrations
    pub async fn integration_health(&self) -> Vec<HealthCheckResult> {
        vec![
            self.records.health_check().await,
            self.analysis.health_check().await,
            self.payouts.health_check().await,
            self.ledger.health_check().await,
        ]
    }

    /// One payout attempt; the claim is already `Approved`.
    ///
    /// The attempt is stored as in flight before the gateway is called and
    /// completed afterwards. If the completion cannot be written the claim
    /// stays `initiated` on a known transfer id and `refresh_payout` settles
    /// it from the gateway's answer.
    async fn pay(
        &self,
        claim: Claim,
        attempt: u32,
        expected: Option<PayoutState>,
    ) -> Result<Claim, ClaimError> {
        let sendable = PayoutRequest::for_claim(&claim)
            .ok_or_else(|| PayoutResult::failed("missing_bank_details", "claim has no payout account"))
            .and_then(|request| match PayoutClient::refusal(&request) {
                Some(refusal) => Err(refusal),
                None => Ok(request),
            });

        let (claim, record, result) = match sendable {
            Ok(request) => {
                let transfer_id = PayoutClient::transfer_id(claim.id, attempt);
                let pending = PayoutRecord::in_flight(&claim, attempt, &transfer_id);
                self.start_attempt(&pending, expected).await?;

                let result = self.payouts.initiate(&transfer_id, &request).await;
                let record = pending.resolved(&result);
                let claim = self.complete_attempt(claim.id, &record).await?;
                (claim, record, result)
            }
            Err(refusal) => {
                let record = PayoutRecord::refused(&claim, attempt, &refusal);
                let claim = self.start_attempt(&record, expected).await?;
                (claim, record, refusal)
            }
        };

        match &result {
            PayoutResult::Accepted { transfer_id, .. } => {
                info!(
                    claim_id = %claim.id,
                    payout_id = %record.id,
                    %transfer_id,
                    status = %record.status,
                    attempt,
                    "Payout initiated"
                );
                let (title, category) = if attempt == 1 {
                    ("Claim Approved", NotificationCategory::ClaimApproved)
                } else {
                    ("Payment Initiated", NotificationCategory::PayoutInitiated)
                };
                self.notify(Notification::new(
                    claim.claimant_id,
                    title,
                    format!(
                        "Your claim {} has been approved. Payment of {} has been initiated to your bank account.",
                        claim.claim_number, claim.amount
                    ),
                    category,
                    claim.id,
                ))
                .await;
                self.record_ledger(LedgerEvent::PayoutInitiated {
                    claim_id: claim.id,
                    transfer_id: transfer_id.clone(),
                    amount: claim.amount,
                })
                .await;
            }
            PayoutResult::Failed { error_kind, message } => {
                error!(
                    claim_id = %claim.id,
                    payout_id = %record.id,
                    error_kind = %error_kind,
                    error = %message,
                    attempt,
                    "Payout failed, claim stays approved"
                );
                if attempt == 1 {
                    self.notify(Notification::new(
                        claim.claimant_id,
                        "Claim Approved",
                        format!(
                            "Your claim {} has been approved. The payment could not be processed yet and will be retried.",
                            claim.claim_number
                        ),
                        NotificationCategory::ClaimApproved,
                        claim.id,
                    ))
                    .await;
                }
                self.alert_payout_failure(&claim, error_kind).await;
            }
        }

        Ok(claim)
    }

    async fn start_attempt(
        &self,
        record: &PayoutRecord,
        expected: Option<PayoutState>,
    ) -> Result<Claim, ClaimError> {
        match self.claims.record_payout_attempt(record, expected).await? {
            TransitionOutcome::Applied(claim) => Ok(claim),
            TransitionOutcome::Conflict { actual, .. } => Err(ClaimError::AlreadyProcessed {
                claim_id: record.claim_id,
                status: actual,
            }),
        }
    }

    async fn complete_attempt(&self, claim_id: ClaimId, record: &PayoutRecord) -> Result<Claim, ClaimError> {
        match self.claims.complete_payout_attempt(record).await {
            Ok(TransitionOutcome::Applied(claim)) => Ok(claim),
            Ok(TransitionOutcome::Conflict { actual, .. }) => Err(ClaimError::AlreadyProcessed {
                claim_id,
                status: actual,
            }),
            Err(e) => {
                error!(
                    claim_id = %claim_id,
                    payout_id = %record.id,
                    transfer_id = ?record.transfer_id,
                    status = %record.status,
                    error = %e,
                    "Payout outcome could not be recorded, refresh the payout to settle it"
                );
                Err(e.into())
            }
        }
    }

    async fn alert_payout_failure(&self, claim: &Claim, error_kind: &str) {
        self.notify(Notification::new(
            claim.provider_id,
            "Payout Failed",
            format!(
                "Payout of {} for claim {} failed ({}). Retry once the cause is fixed.",
                claim.amount, claim.claim_number, error_kind
            ),
            NotificationCategory::PayoutFailed,
            claim.id,
        ))
        .await;
    }

    /// Applies a conditional transition; losing the race is `AlreadyProcessed`
    async fn apply(&self, change: &StatusChange) -> Result<Claim, ClaimError> {
        debug_assert!(change.from.can_transition_to(change.to));
        match self.claims.transition(change).await {
            Ok(TransitionOutcome::Applied(claim)) => Ok(claim),
            Ok(TransitionOutcome::Conflict { actual, .. }) => {
                debug!(claim_id = %change.claim_id, expected = %change.from, %actual, "Lost transition race");
                Err(ClaimError::AlreadyProcessed {
                    claim_id: change.claim_id,
                    status: actual,
                })
            }
            Err(e) if e.is_not_found() => Err(ClaimError::ClaimNotFound(change.claim_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_claim(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        self.claims.get_claim(id).await.map_err(|e| {
            if e.is_not_found() {
                ClaimError::ClaimNotFound(id)
            } else {
                e.into()
            }
        })
    }

    async fn load_policy(&self, id: PolicyId) -> Result<Policy, ClaimError> {
        self.policies.get_policy(id).await.map_err(|e| {
            if e.is_not_found() {
                ClaimError::PolicyNotFound(id)
            } else {
                e.into()
            }
        })
    }

    async fn notify(&self, notification: Notification) {
        let category = notification.category;
        let recipient = notification.recipient;
        if let Err(e) = self.notifier.notify(notification).await {
            warn!(%recipient, category = %category, error = %e, "Notification not delivered");
        }
    }

    async fn record_ledger(&self, event: LedgerEvent) {
        let receipt = self.ledger.record(&event).await;
        debug!(
            event = event.name(),
            receipt_id = %receipt.receipt_id,
            mocked = receipt.mocked,
            "Ledger receipt"
        );
    }
}

#[cfg(test)]
mod tests;
