use super::*;

use chrono::{Days, NaiveDate};
use rust_decimal_macros::dec;

use core_kernel::{CoveragePeriod, Money};

use crate::claim::{BankAccount, ClaimDocument};
use crate::payout::PayoutStatus;
use crate::policy::{PolicyStatus, PolicyType};
use crate::ports::mock::{
    InMemoryClaimStore, InMemoryPolicyStore, RecordingLedgerBackend, RecordingNotifier, Script,
    ScriptedAnalysisBackend, ScriptedPayoutGateway, UnreachableRecordsSource,
};
use crate::ports::AnalysisBackend;
use crate::records::SandboxRecordsSource;
use crate::verdict::{RiskLevel, VerdictSource};

const CLEAN_VERDICT: &str = r#"{
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
}"#;

const INVALID_VERDICT: &str = r#"{
    "fraudScore": 88,
    "riskLevel": "CRITICAL",
    "isValidClaim": false,
    "confidence": 80,
    "summary": "No matching diagnosis on record"
}"#;

enum Payouts {
    Sandbox,
    Gateway(Arc<ScriptedPayoutGateway>),
}

struct Setup {
    analysis: Script,
    analysis_timeout: Duration,
    records_unreachable: bool,
    payouts: Payouts,
    ledger_down: bool,
    notifier_failing: bool,
    policy_status: PolicyStatus,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            analysis: Script::Reply(CLEAN_VERDICT.to_string()),
            analysis_timeout: Duration::from_secs(5),
            records_unreachable: false,
            payouts: Payouts::Sandbox,
            ledger_down: false,
            notifier_failing: false,
            policy_status: PolicyStatus::Active,
        }
    }
}

struct Harness {
    workflow: ClaimWorkflow,
    claims: Arc<InMemoryClaimStore>,
    notifier: Arc<RecordingNotifier>,
    ledger: Arc<RecordingLedgerBackend>,
    analysis: Arc<ScriptedAnalysisBackend>,
    policy: Policy,
    holder: PartyId,
    provider: PartyId,
}

impl Setup {
    async fn build(self) -> Harness {
        let holder = PartyId::new_v7();
        let provider = PartyId::new_v7();
        let now = Utc::now();
        let policy = Policy {
            id: PolicyId::new_v7(),
            policy_number: "POL-HEALTH-0001".to_string(),
            holder_id: holder,
            provider_id: provider,
            policy_type: PolicyType::Health,
            coverage: Money::inr(dec!(500000)),
            premium: Money::inr(dec!(12000)),
            period: CoveragePeriod::new(now - chrono::Duration::days(30), now + chrono::Duration::days(335))
                .unwrap(),
            status: self.policy_status,
            created_at: now - chrono::Duration::days(30),
        };

        let policies = Arc::new(InMemoryPolicyStore::with_policies(vec![policy.clone()]).await);
        let claims = Arc::new(InMemoryClaimStore::new());
        let notifier = Arc::new(if self.notifier_failing {
            RecordingNotifier::failing()
        } else {
            RecordingNotifier::new()
        });
        let ledger = Arc::new(if self.ledger_down {
            RecordingLedgerBackend::down()
        } else {
            RecordingLedgerBackend::new()
        });
        let analysis = Arc::new(ScriptedAnalysisBackend::new(self.analysis));

        let records = if self.records_unreachable {
            ExternalRecordsClient::new(Arc::new(UnreachableRecordsSource), Duration::from_secs(1))
        } else {
            ExternalRecordsClient::new(Arc::new(SandboxRecordsSource::seeded()), Duration::from_secs(1))
        };
        let payouts = match self.payouts {
            Payouts::Sandbox => PayoutClient::sandbox(),
            Payouts::Gateway(gateway) => PayoutClient::live(gateway, Duration::from_secs(1)),
        };

        let deps = WorkflowDependencies {
            policies,
            claims: claims.clone(),
            records,
            analysis: RiskAnalysisClient::new(
                analysis.clone() as Arc<dyn AnalysisBackend>,
                self.analysis_timeout,
            ),
            payouts,
            ledger: LedgerClient::enabled(ledger.clone(), Duration::from_secs(1)),
            notifier: notifier.clone(),
        };

        Harness {
            workflow: ClaimWorkflow::new(deps, WorkflowConfig::default()),
            claims,
            notifier,
            ledger,
            analysis,
            policy,
            holder,
            provider,
        }
    }
}

async fn harness() -> Harness {
    Setup::default().build().await
}

impl Harness {
    fn command(&self) -> SubmitClaim {
        SubmitClaim {
            policy_id: self.policy.id,
            claimant_id: self.holder,
            amount: Money::inr(dec!(125000)),
            incident_date: Utc::now().date_naive() - Days::new(2),
            description: "Hospitalised for acute chest pain".to_string(),
            record_id: "ABDM123456789".to_string(),
            hospital_name: Some("Apollo Hospitals, Chennai".to_string()),
            treatment_details: Some("Angioplasty with stent placement".to_string()),
            documents: vec![ClaimDocument::new(
                "discharge_summary",
                "discharge.pdf",
                "claims/discharge.pdf",
                120_000,
                "application/pdf",
            )],
            payout_account: Some(BankAccount::new("Rajesh Kumar", "123456789012", "HDFC0001234")),
        }
    }

    async fn submitted(&self) -> Claim {
        self.workflow.submit(self.command()).await.unwrap()
    }

    async fn in_review(&self) -> Claim {
        let claim = self.submitted().await;
        self.workflow.run_analysis(claim.id).await.unwrap().into_claim()
    }

    async fn approved(&self) -> Claim {
        let claim = self.in_review().await;
        self.workflow
            .decide(claim.id, self.provider, DecisionAction::Approve, None)
            .await
            .unwrap()
    }

    async fn categories_for(&self, party: PartyId) -> Vec<NotificationCategory> {
        self.notifier
            .sent_to(party)
            .await
            .into_iter()
            .map(|n| n.category)
            .collect()
    }

    async fn ledger_events(&self) -> Vec<&'static str> {
        self.ledger.events().await.iter().map(|e| e.name()).collect()
    }
}

mod submit {
    use super::*;

    #[tokio::test]
    async fn test_submit_stores_claim_and_alerts_provider() {
        let h = harness().await;
        let claim = h.submitted().await;

        assert_eq!(claim.status, ClaimStatus::Submitted);
        assert_eq!(claim.provider_id, h.provider);
        assert!(claim.claim_number.starts_with("CLM-"));
        assert!(claim.verdict.is_none());

        let stored = h.claims.get_claim(claim.id).await.unwrap();
        assert_eq!(stored.id, claim.id);

        let sent = h.notifier.sent_to(h.provider).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].category, NotificationCategory::NewClaim);
        assert_eq!(sent[0].title, "New Claim Submitted");
        assert_eq!(h.ledger_events().await, vec!["claim_submitted"]);
    }

    #[tokio::test]
    async fn test_second_active_claim_is_duplicate() {
        let h = harness().await;
        let first = h.submitted().await;

        match h.workflow.submit(h.command()).await {
            Err(ClaimError::DuplicateClaim { existing }) => assert_eq!(existing, first.id),
            other => panic!("expected duplicate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_new_claim_allowed_after_rejection() {
        let h = harness().await;
        let first = h.in_review().await;
        h.workflow
            .decide(first.id, h.provider, DecisionAction::Reject, Some("Not covered".into()))
            .await
            .unwrap();

        let second = h.workflow.submit(h.command()).await.unwrap();
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn test_amount_equal_to_coverage_accepted() {
        let h = harness().await;
        let mut command = h.command();
        command.amount = h.policy.coverage;

        let claim = h.workflow.submit(command).await.unwrap();
        assert_eq!(claim.amount, h.policy.coverage);
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let h = harness().await;
        let mut command = h.command();
        command.amount = Money::inr(dec!(0));

        let err = h.workflow.submit(command).await.unwrap_err();
        assert!(matches!(err, ClaimError::InvalidAmount(_)));
        assert!(h.claims.claims_for_claimant(h.holder).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_amount_above_coverage_rejected() {
        let h = harness().await;
        let mut command = h.command();
        command.amount = Money::inr(dec!(500000.01));

        let err = h.workflow.submit(command).await.unwrap_err();
        assert!(matches!(err, ClaimError::InvalidAmount(_)));
        assert!(h.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_policy_and_foreign_holder_look_the_same() {
        let h = harness().await;

        let mut unknown = h.command();
        unknown.policy_id = PolicyId::new_v7();
        assert!(matches!(
            h.workflow.submit(unknown).await,
            Err(ClaimError::PolicyNotFound(_))
        ));

        let mut foreign = h.command();
        foreign.claimant_id = PartyId::new_v7();
        assert!(matches!(
            h.workflow.submit(foreign).await,
            Err(ClaimError::PolicyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_suspended_policy_rejected() {
        let h = Setup {
            policy_status: PolicyStatus::Suspended,
            ..Setup::default()
        }
        .build()
        .await;

        let err = h.workflow.submit(h.command()).await.unwrap_err();
        assert!(matches!(err, ClaimError::PolicyInactive { .. }));
    }

    #[tokio::test]
    async fn test_incident_outside_coverage_rejected() {
        let h = harness().await;
        let mut command = h.command();
        command.incident_date = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();

        let err = h.workflow.submit(command).await.unwrap_err();
        assert!(matches!(err, ClaimError::PolicyInactive { .. }));
    }

    #[tokio::test]
    async fn test_malformed_record_id_rejected() {
        let h = harness().await;
        let mut command = h.command();
        command.record_id = "ABDM12345".to_string();

        let err = h.workflow.submit(command).await.unwrap_err();
        assert!(matches!(err, ClaimError::InvalidRecordReference(_)));
        assert_eq!(err.code(), "INVALID_RECORD_REFERENCE");
    }

    #[tokio::test]
    async fn test_oversized_document_rejected() {
        let h = harness().await;
        let mut command = h.command();
        command.documents.push(ClaimDocument::new(
            "scan",
            "mri.png",
            "claims/mri.png",
            11 * 1024 * 1024,
            "image/png",
        ));

        let err = h.workflow.submit(command).await.unwrap_err();
        assert!(matches!(err, ClaimError::InvalidDocument(_)));
    }

    #[tokio::test]
    async fn test_bad_ifsc_rejected() {
        let h = harness().await;
        let mut command = h.command();
        command.payout_account = Some(BankAccount::new("Rajesh Kumar", "123456789012", "HDFC1234"));

        let err = h.workflow.submit(command).await.unwrap_err();
        assert!(matches!(err, ClaimError::InvalidBankDetails(_)));
    }
}

mod analysis {
    use super::*;

    #[tokio::test]
    async fn test_valid_verdict_routes_to_provider_review() {
        let h = harness().await;
        let claim = h.submitted().await;

        let outcome = h.workflow.run_analysis(claim.id).await.unwrap();
        let verdict = outcome.verdict().unwrap().clone();
        let claim = outcome.into_claim();

        assert_eq!(claim.status, ClaimStatus::PendingProviderReview);
        assert_eq!(verdict.fraud_score, 12);
        assert_eq!(verdict.source, VerdictSource::Model);
        assert_eq!(claim.verdict.as_ref(), Some(&verdict));

        let sent = h.notifier.sent_to(h.provider).await;
        let review = sent
            .iter()
            .find(|n| n.category == NotificationCategory::ReviewRequired)
            .unwrap();
        assert_eq!(review.title, "Claim Ready for Review");
        assert!(review.message.contains("LOW risk"));
        assert!(review.message.contains("12% fraud score"));
        assert_eq!(h.ledger_events().await, vec!["claim_submitted", "claim_analysed"]);
    }

    #[tokio::test]
    async fn test_invalid_verdict_auto_rejects() {
        let h = Setup {
            analysis: Script::Reply(INVALID_VERDICT.to_string()),
            ..Setup::default()
        }
        .build()
        .await;
        let claim = h.submitted().await;

        let claim = h.workflow.run_analysis(claim.id).await.unwrap().into_claim();
        assert_eq!(claim.status, ClaimStatus::AutoRejected);
        assert_eq!(claim.verdict.as_ref().unwrap().risk_level, RiskLevel::Critical);
        assert_eq!(
            h.categories_for(h.holder).await,
            vec![NotificationCategory::ClaimAutoRejected]
        );
        assert_eq!(
            h.ledger_events().await,
            vec!["claim_submitted", "claim_analysed", "claim_rejected"]
        );

        // Auto-rejected claims are out of the provider's hands.
        let err = h
            .workflow
            .decide(claim.id, h.provider, DecisionAction::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::AlreadyProcessed { status: ClaimStatus::AutoRejected, .. }));
        assert_eq!(h.claims.payout_count().await, 0);
    }

    #[tokio::test]
    async fn test_backend_timeout_uses_fallback_verdict() {
        let h = Setup {
            analysis: Script::Hang,
            analysis_timeout: Duration::from_millis(50),
            ..Setup::default()
        }
        .build()
        .await;
        let claim = h.submitted().await;

        let outcome = h.workflow.run_analysis(claim.id).await.unwrap();
        let verdict = outcome.verdict().unwrap();
        assert_eq!(verdict.source, VerdictSource::Fallback);
        assert_eq!(verdict.fraud_score, 15);
        assert_eq!(outcome.claim().status, ClaimStatus::PendingProviderReview);
    }

    #[tokio::test]
    async fn test_backend_failure_uses_fallback_verdict() {
        let h = Setup {
            analysis: Script::Fail,
            ..Setup::default()
        }
        .build()
        .await;
        let claim = h.submitted().await;

        let outcome = h.workflow.run_analysis(claim.id).await.unwrap();
        assert_eq!(outcome.verdict().unwrap(), &RiskVerdict::fallback());
    }

    #[tokio::test]
    async fn test_unstructured_output_is_read_for_a_score() {
        let h = Setup {
            analysis: Script::Reply("This looks like a medium risk claim, fraud score about 40.".into()),
            ..Setup::default()
        }
        .build()
        .await;
        let claim = h.submitted().await;

        let outcome = h.workflow.run_analysis(claim.id).await.unwrap();
        let verdict = outcome.verdict().unwrap();
        assert_eq!(verdict.source, VerdictSource::TextExtraction);
        assert_eq!(verdict.fraud_score, 40);
        assert_eq!(verdict.risk_level, RiskLevel::Medium);
        assert_eq!(outcome.claim().status, ClaimStatus::PendingProviderReview);
    }

    #[tokio::test]
    async fn test_unknown_patient_parks_claim() {
        let h = harness().await;
        let mut command = h.command();
        command.record_id = "ABDM000000001".to_string();
        let claim = h.workflow.submit(command).await.unwrap();

        let outcome = h.workflow.run_analysis(claim.id).await.unwrap();
        match &outcome {
            AnalysisOutcome::RecordsUnavailable { claim, error } => {
                assert_eq!(claim.status, ClaimStatus::RecordsFetchFailed);
                assert!(matches!(error, RecordsError::NotFound(_)));
                assert!(claim.verdict.is_none());
            }
            other => panic!("expected records failure, got {other:?}"),
        }
        assert_eq!(h.analysis.calls(), 0);
        assert!(h
            .categories_for(h.provider)
            .await
            .contains(&NotificationCategory::RecordsUnavailable));

        // Still an active claim, so no second one on the policy.
        assert!(matches!(
            h.workflow.submit(h.command()).await,
            Err(ClaimError::DuplicateClaim { .. })
        ));
    }

    #[tokio::test]
    async fn test_parked_claim_can_be_retried() {
        let h = Setup {
            records_unreachable: true,
            ..Setup::default()
        }
        .build()
        .await;
        let claim = h.submitted().await;

        let first = h.workflow.run_analysis(claim.id).await.unwrap();
        assert_eq!(first.claim().status, ClaimStatus::RecordsFetchFailed);

        let second = h.workflow.run_analysis(claim.id).await.unwrap();
        assert!(matches!(
            second,
            AnalysisOutcome::RecordsUnavailable { error: RecordsError::Unavailable(_), .. }
        ));
    }

    #[tokio::test]
    async fn test_parked_claim_released_for_manual_review() {
        let h = Setup {
            records_unreachable: true,
            ..Setup::default()
        }
        .build()
        .await;
        let claim = h.submitted().await;
        h.workflow.run_analysis(claim.id).await.unwrap();

        let err = h.workflow.release_for_review(claim.id, h.holder).await.unwrap_err();
        assert!(matches!(err, ClaimError::NotAuthorized(_)));

        let released = h.workflow.release_for_review(claim.id, h.provider).await.unwrap();
        assert_eq!(released.status, ClaimStatus::PendingProviderReview);
        assert!(released.verdict.is_none());

        let approved = h
            .workflow
            .decide(claim.id, h.provider, DecisionAction::Approve, None)
            .await
            .unwrap();
        assert_eq!(approved.status, ClaimStatus::Approved);
    }

    #[tokio::test]
    async fn test_analysed_claim_is_not_analysed_again() {
        let h = harness().await;
        let claim = h.in_review().await;

        let err = h.workflow.run_analysis(claim.id).await.unwrap_err();
        assert!(matches!(err, ClaimError::AlreadyProcessed { .. }));
        assert_eq!(h.analysis.calls(), 1);
    }

    #[tokio::test]
    async fn test_fresh_analysis_lease_blocks_second_runner() {
        let h = harness().await;
        let claim = h.submitted().await;
        let change = StatusChange::new(claim.id, ClaimStatus::Submitted, ClaimStatus::AnalysisPending);
        h.claims.transition(&change).await.unwrap();

        let err = h.workflow.run_analysis(claim.id).await.unwrap_err();
        assert!(matches!(err, ClaimError::InvalidState { status: ClaimStatus::AnalysisPending, .. }));
        assert_eq!(h.analysis.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_analysis_lease_is_taken_over() {
        let h = harness().await;
        let claim = h.submitted().await;
        let change = StatusChange::new(claim.id, ClaimStatus::Submitted, ClaimStatus::AnalysisPending);
        h.claims.transition(&change).await.unwrap();
        h.claims
            .backdate(claim.id, Utc::now() - chrono::Duration::minutes(10))
            .await;

        let outcome = h.workflow.run_analysis(claim.id).await.unwrap();
        assert_eq!(outcome.claim().status, ClaimStatus::PendingProviderReview);
    }

    #[tokio::test]
    async fn test_submit_and_analyse_in_one_call() {
        let h = harness().await;
        let outcome = h.workflow.submit_and_analyse(h.command()).await.unwrap();
        assert_eq!(outcome.claim().status, ClaimStatus::PendingProviderReview);
    }
}

mod decide {
    use super::*;

    #[tokio::test]
    async fn test_approve_pays_out_in_sandbox() {
        let h = harness().await;
        let claim = h.approved().await;

        assert_eq!(claim.status, ClaimStatus::Approved);
        assert_eq!(claim.payout_state(), Some(PayoutState::Settled));
        assert_eq!(claim.decision.as_ref().unwrap().decided_by, h.provider);

        let history = h.workflow.payout_history(claim.id, h.holder).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].attempt, 1);
        assert!(history[0].reference.as_deref().unwrap().starts_with("MOCK_UTR_"));
        assert!(history[0].transfer_id.as_deref().unwrap().starts_with("PAYOUT_"));

        let sent = h.notifier.sent_to(h.holder).await;
        assert_eq!(sent.last().unwrap().title, "Claim Approved");
        assert!(sent.last().unwrap().message.contains("has been initiated"));
        assert!(h.ledger_events().await.ends_with(&["claim_approved", "payout_initiated"]));
    }

    #[tokio::test]
    async fn test_second_approval_changes_nothing() {
        let h = harness().await;
        let claim = h.approved().await;

        let err = h
            .workflow
            .decide(claim.id, h.provider, DecisionAction::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::AlreadyProcessed { status: ClaimStatus::Approved, .. }));
        assert_eq!(h.claims.payout_count().await, 1);
    }

    #[tokio::test]
    async fn test_racing_approvals_pay_once() {
        let h = harness().await;
        let claim = h.in_review().await;

        let (a, b) = tokio::join!(
            h.workflow.decide(claim.id, h.provider, DecisionAction::Approve, None),
            h.workflow.decide(claim.id, h.provider, DecisionAction::Approve, None),
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(h.claims.payout_count().await, 1);
    }

    #[tokio::test]
    async fn test_reject_notifies_claimant_with_reason() {
        let h = harness().await;
        let claim = h.in_review().await;

        let claim = h
            .workflow
            .decide(
                claim.id,
                h.provider,
                DecisionAction::Reject,
                Some("Pre-existing condition".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(claim.status, ClaimStatus::Rejected);
        assert!(claim.payout.is_none());
        let last = h.notifier.sent_to(h.holder).await.pop().unwrap();
        assert_eq!(last.category, NotificationCategory::ClaimRejected);
        assert!(last.message.ends_with("Reason: Pre-existing condition"));
        assert_eq!(h.claims.payout_count().await, 0);
    }

    #[tokio::test]
    async fn test_only_the_provider_decides() {
        let h = harness().await;
        let claim = h.in_review().await;

        for outsider in [h.holder, PartyId::new_v7()] {
            let err = h
                .workflow
                .decide(claim.id, outsider, DecisionAction::Approve, None)
                .await
                .unwrap_err();
            assert!(matches!(err, ClaimError::NotAuthorized(_)));
        }
        let stored = h.claims.get_claim(claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::PendingProviderReview);
    }

    #[tokio::test]
    async fn test_decide_before_analysis_is_invalid() {
        let h = harness().await;
        let claim = h.submitted().await;

        let err = h
            .workflow
            .decide(claim.id, h.provider, DecisionAction::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::InvalidState { operation: "decide", .. }));
    }

    #[tokio::test]
    async fn test_unknown_claim() {
        let h = harness().await;
        let err = h
            .workflow
            .decide(ClaimId::new_v7(), h.provider, DecisionAction::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::ClaimNotFound(_)));
    }
}

mod payouts {
    use super::*;

    async fn with_gateway(gateway: ScriptedPayoutGateway) -> (Harness, Arc<ScriptedPayoutGateway>) {
        let gateway = Arc::new(gateway);
        let h = Setup {
            payouts: Payouts::Gateway(gateway.clone()),
            ..Setup::default()
        }
        .build()
        .await;
        (h, gateway)
    }

    #[tokio::test]
    async fn test_gateway_failure_keeps_approval() {
        let (h, _gateway) = with_gateway(ScriptedPayoutGateway::refusing("bank offline")).await;
        let claim = h.approved().await;

        assert_eq!(claim.status, ClaimStatus::Approved);
        assert_eq!(claim.payout_state(), Some(PayoutState::Failed));

        let history = h.claims.payout_history(claim.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, PayoutStatus::Failed);
        assert_eq!(history[0].error_kind.as_deref(), Some("unavailable"));

        assert!(h
            .categories_for(h.provider)
            .await
            .contains(&NotificationCategory::PayoutFailed));
        let claimant_last = h.notifier.sent_to(h.holder).await.pop().unwrap();
        assert_eq!(claimant_last.category, NotificationCategory::ClaimApproved);
        assert!(claimant_last.message.contains("will be retried"));
        assert!(!h.ledger_events().await.contains(&"payout_initiated"));
    }

    #[tokio::test]
    async fn test_missing_bank_details_fail_the_payout() {
        let h = harness().await;
        let mut command = h.command();
        command.payout_account = None;
        let claim = h.workflow.submit(command).await.unwrap();
        h.workflow.run_analysis(claim.id).await.unwrap();

        let claim = h
            .workflow
            .decide(claim.id, h.provider, DecisionAction::Approve, None)
            .await
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Approved);
        assert_eq!(claim.payout_state(), Some(PayoutState::Failed));
        let history = h.claims.payout_history(claim.id).await.unwrap();
        assert_eq!(history[0].error_kind.as_deref(), Some("missing_bank_details"));
    }

    #[tokio::test]
    async fn test_retry_then_refresh_settles() {
        let (h, gateway) = with_gateway(ScriptedPayoutGateway::refusing("bank offline")).await;
        let claim = h.approved().await;

        gateway.set_outcome(Ok(PayoutStatus::Pending)).await;
        gateway.set_status_report(PayoutStatus::Pending).await;
        let claim = h.workflow.retry_payout(claim.id, h.provider).await.unwrap();
        assert_eq!(claim.payout_state(), Some(PayoutState::Initiated));
        assert!(h
            .categories_for(h.holder)
            .await
            .contains(&NotificationCategory::PayoutInitiated));

        let history = h.claims.payout_history(claim.id).await.unwrap();
        assert_eq!(history.iter().map(|p| p.attempt).collect::<Vec<_>>(), vec![1, 2]);

        // Gateway still pending: nothing moves.
        let claim = h.workflow.refresh_payout(claim.id).await.unwrap();
        assert_eq!(claim.payout_state(), Some(PayoutState::Initiated));

        gateway.set_status_report(PayoutStatus::Success).await;
        let claim = h.workflow.refresh_payout(claim.id).await.unwrap();
        assert_eq!(claim.payout_state(), Some(PayoutState::Settled));
        assert_eq!(claim.status, ClaimStatus::Approved);

        let history = h.claims.payout_history(claim.id).await.unwrap();
        assert_eq!(history[1].status, PayoutStatus::Success);
        assert!(h
            .categories_for(h.holder)
            .await
            .contains(&NotificationCategory::PayoutSettled));
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_refresh_reports_failed_transfer() {
        let (h, gateway) = with_gateway(ScriptedPayoutGateway::accepting(PayoutStatus::Pending)).await;
        let claim = h.approved().await;
        assert_eq!(claim.payout_state(), Some(PayoutState::Initiated));

        gateway.set_status_report(PayoutStatus::Failed).await;
        let claim = h.workflow.refresh_payout(claim.id).await.unwrap();
        assert_eq!(claim.payout_state(), Some(PayoutState::Failed));
        assert!(h
            .categories_for(h.provider)
            .await
            .contains(&NotificationCategory::PayoutFailed));
    }

    #[tokio::test]
    async fn test_lost_payout_outcome_is_settled_by_refresh() {
        let (h, gateway) = with_gateway(ScriptedPayoutGateway::accepting(PayoutStatus::Success)).await;
        let claim = h.in_review().await;

        h.claims.fail_payout_completions(true);
        let err = h
            .workflow
            .decide(claim.id, h.provider, DecisionAction::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::Store(_)));
        assert_eq!(gateway.calls(), 1);

        let stored = h.claims.get_claim(claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Approved);
        assert_eq!(stored.payout_state(), Some(PayoutState::Initiated));
        let history = h.claims.payout_history(claim.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, PayoutStatus::Initiated);
        assert_eq!(
            history[0].transfer_id.as_deref(),
            Some(PayoutClient::transfer_id(claim.id, 1).as_str())
        );

        // Money may have moved, so a second transfer is refused.
        let err = h.workflow.retry_payout(claim.id, h.provider).await.unwrap_err();
        assert!(matches!(err, ClaimError::InvalidState { .. }));

        h.claims.fail_payout_completions(false);
        let claim = h.workflow.refresh_payout(claim.id).await.unwrap();
        assert_eq!(claim.payout_state(), Some(PayoutState::Settled));
        let history = h.claims.payout_history(claim.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, PayoutStatus::Success);
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_approval_without_attempt_can_be_retried() {
        let h = harness().await;
        let claim = h.in_review().await;
        let decision = ProviderDecision {
            decided_by: h.provider,
            action: DecisionAction::Approve,
            comments: None,
            decided_at: Utc::now(),
        };
        let change = StatusChange::new(claim.id, ClaimStatus::PendingProviderReview, ClaimStatus::Approved)
            .with_decision(decision);
        h.claims.transition(&change).await.unwrap();

        let err = h
            .workflow
            .decide(claim.id, h.provider, DecisionAction::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::AlreadyProcessed { .. }));

        let claim = h.workflow.retry_payout(claim.id, h.provider).await.unwrap();
        assert_eq!(claim.payout_state(), Some(PayoutState::Settled));
        let history = h.claims.payout_history(claim.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].attempt, 1);
    }

    #[tokio::test]
    async fn test_retry_needs_a_failed_payout() {
        let h = harness().await;
        let claim = h.approved().await;

        let err = h.workflow.retry_payout(claim.id, h.provider).await.unwrap_err();
        assert!(matches!(err, ClaimError::InvalidState { .. }));
        assert_eq!(h.claims.payout_count().await, 1);
    }

    #[tokio::test]
    async fn test_retry_by_claimant_not_authorized() {
        let (h, _gateway) = with_gateway(ScriptedPayoutGateway::refusing("bank offline")).await;
        let claim = h.approved().await;

        let err = h.workflow.retry_payout(claim.id, h.holder).await.unwrap_err();
        assert!(matches!(err, ClaimError::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn test_refresh_on_settled_payout_is_invalid() {
        let h = harness().await;
        let claim = h.approved().await;

        let err = h.workflow.refresh_payout(claim.id).await.unwrap_err();
        assert!(matches!(err, ClaimError::InvalidState { .. }));
    }
}

mod side_channels {
    use super::*;

    #[tokio::test]
    async fn test_ledger_outage_changes_nothing() {
        let h = Setup {
            ledger_down: true,
            ..Setup::default()
        }
        .build()
        .await;

        let claim = h.approved().await;
        assert_eq!(claim.status, ClaimStatus::Approved);
        assert_eq!(claim.payout_state(), Some(PayoutState::Settled));
        assert!(h.ledger.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_notifier_outage_changes_nothing() {
        let h = Setup {
            notifier_failing: true,
            ..Setup::default()
        }
        .build()
        .await;

        let claim = h.approved().await;
        assert_eq!(claim.status, ClaimStatus::Approved);
        assert!(h.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_integration_health_lists_every_client() {
        let h = harness().await;
        let ids: Vec<String> = h
            .workflow
            .integration_health()
            .await
            .into_iter()
            .map(|r| r.adapter_id)
            .collect();
        assert_eq!(ids, vec!["records", "analysis", "payout", "ledger"]);
    }
}

mod queries {
    use super::*;

    #[tokio::test]
    async fn test_strangers_cannot_see_claims() {
        let h = harness().await;
        let claim = h.submitted().await;

        assert!(h.workflow.get_claim(claim.id, h.holder).await.is_ok());
        assert!(h.workflow.get_claim(claim.id, h.provider).await.is_ok());

        let stranger = PartyId::new_v7();
        assert!(matches!(
            h.workflow.get_claim(claim.id, stranger).await,
            Err(ClaimError::ClaimNotFound(_))
        ));
        assert!(matches!(
            h.workflow.payout_history(claim.id, stranger).await,
            Err(ClaimError::ClaimNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_listings_by_party() {
        let h = harness().await;
        let claim = h.submitted().await;

        let mine = h.workflow.claims_for_claimant(h.holder).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, claim.id);

        let queue = h.workflow.claims_for_provider(h.provider).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert!(h
            .workflow
            .claims_for_provider(h.holder)
            .await
            .unwrap()
            .is_empty());
    }
}
