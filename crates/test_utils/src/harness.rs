//! Workflow Harness
//!
//! Wires a [`ClaimWorkflow`] to the in-memory stores and scripted backends,
//! with one active policy already on file.
//!
//! ```rust,ignore
//! let h = WorkflowHarness::builder()
//!     .analysis(Script::Reply(VerdictFixtures::high_risk().to_string()))
//!     .build()
//!     .await;
//! let claim = h.workflow.submit(h.command().build()).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use core_kernel::PartyId;
use domain_claims::ports::mock::{
    InMemoryClaimStore, InMemoryPolicyStore, RecordingLedgerBackend, RecordingNotifier, Script,
    ScriptedAnalysisBackend, ScriptedPayoutGateway, UnreachableRecordsSource,
};
use domain_claims::records::SandboxRecordsSource;
use domain_claims::{
    ClaimWorkflow, ExternalRecordsClient, LedgerClient, PayoutClient, Policy, PolicyStatus,
    RiskAnalysisClient, WorkflowConfig, WorkflowDependencies,
};

use crate::builders::{PolicyBuilder, SubmitClaimBuilder};
use crate::fixtures::VerdictFixtures;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(1);

/// A workflow over mocks, plus handles to inspect them
pub struct WorkflowHarness {
    pub workflow: ClaimWorkflow,
    pub claims: Arc<InMemoryClaimStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub ledger: Arc<RecordingLedgerBackend>,
    pub analysis: Arc<ScriptedAnalysisBackend>,
    /// Present when the builder was given a gateway
    pub gateway: Option<Arc<ScriptedPayoutGateway>>,
    pub policy: Policy,
    pub holder: PartyId,
    pub provider: PartyId,
}

impl WorkflowHarness {
    pub fn builder() -> WorkflowHarnessBuilder {
        WorkflowHarnessBuilder::default()
    }

    /// Clean verdicts, sandbox records and sandbox payouts
    pub async fn new() -> Self {
        Self::builder().build().await
    }

    /// A valid claim by the holder against the harness policy
    pub fn command(&self) -> SubmitClaimBuilder {
        SubmitClaimBuilder::for_policy(&self.policy)
    }
}

/// Knobs for [`WorkflowHarness`]
pub struct WorkflowHarnessBuilder {
    analysis: Script,
    analysis_timeout: Duration,
    records_unreachable: bool,
    gateway: Option<Arc<ScriptedPayoutGateway>>,
    ledger_down: bool,
    notifier_failing: bool,
    policy_status: PolicyStatus,
    config: WorkflowConfig,
}

impl Default for WorkflowHarnessBuilder {
    fn default() -> Self {
        Self {
            analysis: Script::Reply(VerdictFixtures::clean().to_string()),
            analysis_timeout: Duration::from_secs(5),
            records_unreachable: false,
            gateway: None,
            ledger_down: false,
            notifier_failing: false,
            policy_status: PolicyStatus::Active,
            config: WorkflowConfig::default(),
        }
    }
}

impl WorkflowHarnessBuilder {
    pub fn analysis(mut self, script: Script) -> Self {
        self.analysis = script;
        self
    }

    pub fn analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = timeout;
        self
    }

    pub fn records_unreachable(mut self) -> Self {
        self.records_unreachable = true;
        self
    }

    /// Routes payouts through `gateway` instead of the sandbox
    pub fn payout_gateway(mut self, gateway: ScriptedPayoutGateway) -> Self {
        self.gateway = Some(Arc::new(gateway));
        self
    }

    pub fn ledger_down(mut self) -> Self {
        self.ledger_down = true;
        self
    }

    pub fn notifier_failing(mut self) -> Self {
        self.notifier_failing = true;
        self
    }

    pub fn policy_status(mut self, status: PolicyStatus) -> Self {
        self.policy_status = status;
        self
    }

    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn build(self) -> WorkflowHarness {
        let holder = PartyId::new_v7();
        let provider = PartyId::new_v7();
        let policy = PolicyBuilder::new()
            .with_holder(holder)
            .with_provider(provider)
            .with_status(self.policy_status)
            .build();

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
            ExternalRecordsClient::new(Arc::new(UnreachableRecordsSource), CLIENT_TIMEOUT)
        } else {
            ExternalRecordsClient::new(Arc::new(SandboxRecordsSource::seeded()), CLIENT_TIMEOUT)
        };
        let payouts = match &self.gateway {
            Some(gateway) => PayoutClient::live(gateway.clone(), CLIENT_TIMEOUT),
            None => PayoutClient::sandbox(),
        };

        let deps = WorkflowDependencies {
            policies,
            claims: claims.clone(),
            records,
            analysis: RiskAnalysisClient::new(analysis.clone(), self.analysis_timeout),
            payouts,
            ledger: LedgerClient::enabled(ledger.clone(), CLIENT_TIMEOUT),
            notifier: notifier.clone(),
        };

        WorkflowHarness {
            workflow: ClaimWorkflow::new(deps, self.config),
            claims,
            notifier,
            ledger,
            analysis,
            gateway: self.gateway,
            policy,
            holder,
            provider,
        }
    }
}
