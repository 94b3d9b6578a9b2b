//! Lifecycle notarization ledger
//!
//! The ledger is optional. With no endpoint configured the client is
//! `Disabled` and hands out mock receipts; an enabled ledger that errors or
//! times out does the same after logging a warning. Recording never fails
//! and never blocks a claim.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use core_kernel::{
    AdapterHealth, ClaimId, HealthCheckResult, HealthCheckable, Money, PartyId, PolicyId,
    PortError,
};

use crate::verdict::RiskLevel;

/// Event written to the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    ClaimSubmitted {
        claim_id: ClaimId,
        policy_id: PolicyId,
        amount: Money,
    },
    ClaimAnalysed {
        claim_id: ClaimId,
        fraud_score: u8,
        risk_level: RiskLevel,
        is_valid_claim: bool,
    },
    ClaimApproved {
        claim_id: ClaimId,
        approved_by: PartyId,
        amount: Money,
    },
    ClaimRejected {
        claim_id: ClaimId,
        rejected_by: Option<PartyId>,
    },
    PayoutInitiated {
        claim_id: ClaimId,
        transfer_id: String,
        amount: Money,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::ClaimSubmitted { .. } => "claim_submitted",
            LedgerEvent::ClaimAnalysed { .. } => "claim_analysed",
            LedgerEvent::ClaimApproved { .. } => "claim_approved",
            LedgerEvent::ClaimRejected { .. } => "claim_rejected",
            LedgerEvent::PayoutInitiated { .. } => "payout_initiated",
        }
    }
}

/// Proof of recording; `mocked` when the ledger was not actually written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    pub receipt_id: String,
    pub mocked: bool,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerReceipt {
    fn mock() -> Self {
        let now = Utc::now();
        Self {
            receipt_id: format!("mock-tx-{}", now.timestamp_millis()),
            mocked: true,
            recorded_at: now,
        }
    }
}

/// A writable ledger
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Returns the ledger's transaction id
    async fn submit(&self, event: &LedgerEvent) -> Result<String, PortError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Ledger gateway URL; `None` disables the ledger
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub enum LedgerClient {
    Disabled,
    Enabled {
        backend: Arc<dyn LedgerBackend>,
        timeout: Duration,
    },
}

impl LedgerClient {
    pub fn enabled(backend: Arc<dyn LedgerBackend>, timeout: Duration) -> Self {
        LedgerClient::Enabled { backend, timeout }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        match &config.endpoint {
            Some(endpoint) => {
                let backend = HttpLedgerBackend::new(endpoint, config.api_key.clone(), config.timeout);
                Self::enabled(Arc::new(backend), config.timeout)
            }
            None => LedgerClient::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, LedgerClient::Enabled { .. })
    }

    /// Records an event; always yields a receipt
    pub async fn record(&self, event: &LedgerEvent) -> LedgerReceipt {
        let LedgerClient::Enabled { backend, timeout } = self else {
            debug!(event = event.name(), "Ledger disabled, issuing mock receipt");
            return LedgerReceipt::mock();
        };

        match tokio::time::timeout(*timeout, backend.submit(event)).await {
            Ok(Ok(receipt_id)) => {
                debug!(event = event.name(), %receipt_id, "Ledger event recorded");
                LedgerReceipt {
                    receipt_id,
                    mocked: false,
                    recorded_at: Utc::now(),
                }
            }
            Ok(Err(e)) => {
                warn!(event = event.name(), error = %e, "Ledger write failed, issuing mock receipt");
                LedgerReceipt::mock()
            }
            Err(_) => {
                warn!(
                    event = event.name(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Ledger write timed out, issuing mock receipt"
                );
                LedgerReceipt::mock()
            }
        }
    }
}

#[async_trait]
impl HealthCheckable for LedgerClient {
    async fn health_check(&self) -> HealthCheckResult {
        match self {
            LedgerClient::Disabled => {
                HealthCheckResult::new("ledger", AdapterHealth::Degraded, 0).with_message("disabled")
            }
            LedgerClient::Enabled { backend, .. } => {
                HealthCheckResult::new("ledger", AdapterHealth::Healthy, 0).with_message(backend.name())
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSubmitResponse {
    transaction_hash: String,
}

/// Ledger gateway reached over HTTP: `POST {endpoint}/events`
pub struct HttpLedgerBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpLedgerBackend {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl LedgerBackend for HttpLedgerBackend {
    async fn submit(&self, event: &LedgerEvent) -> Result<String, PortError> {
        let mut request = self.client.post(format!("{}/events", self.endpoint)).json(event);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PortError::connection(format!("ledger: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::unavailable(format!("ledger returned {status}")));
        }

        response
            .json::<LedgerSubmitResponse>()
            .await
            .map(|r| r.transaction_hash)
            .map_err(|e| PortError::transformation(format!("ledger payload: {e}")))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
