//! Payout gateway client
//!
//! Approved claims are paid by bank transfer. In sandbox mode no network
//! call is made and the transfer is reported as settled immediately; live
//! mode talks to a Cashfree-style `/v1/transfers` API.
//!
//! `initiate` never returns an error. Every failure, whether bad bank
//! details, transport, non-2xx or timeout, comes back as
//! [`PayoutResult::Failed`] so the workflow can record it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use core_kernel::{
    AdapterHealth, ClaimId, CoreError, HealthCheckResult, HealthCheckable, Money, PayoutId,
    PortError,
};

use crate::claim::{BankAccount, Claim, PayoutState};

pub const DEFAULT_PAYOUT_BASE_URL: &str = "https://sandbox.cashfree.com/payout";

/// Status of a single transfer attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Initiated,
    Pending,
    Success,
    Failed,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Initiated => "initiated",
            PayoutStatus::Pending => "pending",
            PayoutStatus::Success => "success",
            PayoutStatus::Failed => "failed",
        }
    }

    /// Claim-level payout state implied by this attempt
    pub fn payout_state(&self) -> PayoutState {
        match self {
            PayoutStatus::Initiated | PayoutStatus::Pending => PayoutState::Initiated,
            PayoutStatus::Success => PayoutState::Settled,
            PayoutStatus::Failed => PayoutState::Failed,
        }
    }

    /// Maps gateway vocabulary (`SUCCESS`, `REVERSED`, ...) onto our statuses
    pub fn from_gateway(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" | "COMPLETED" => PayoutStatus::Success,
            "FAILED" | "REJECTED" | "REVERSED" | "ERROR" => PayoutStatus::Failed,
            "RECEIVED" | "INITIATED" => PayoutStatus::Initiated,
            _ => PayoutStatus::Pending,
        }
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(PayoutStatus::Initiated),
            "pending" => Ok(PayoutStatus::Pending),
            "success" => Ok(PayoutStatus::Success),
            "failed" => Ok(PayoutStatus::Failed),
            other => Err(format!("unknown payout status '{other}'")),
        }
    }
}

/// Transfer instruction for one claim
#[derive(Debug, Clone)]
pub struct PayoutRequest {
    pub claim_id: ClaimId,
    pub amount: Money,
    pub account: BankAccount,
    pub purpose: String,
}

impl PayoutRequest {
    /// Request for the full claimed amount; `None` without bank details
    pub fn for_claim(claim: &Claim) -> Option<Self> {
        claim.payout_account.as_ref().map(|account| Self {
            claim_id: claim.id,
            amount: claim.amount,
            account: account.clone(),
            purpose: format!("Insurance claim settlement for claim {}", claim.claim_number),
        })
    }
}

/// Outcome of a transfer attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutResult {
    Accepted {
        transfer_id: String,
        /// Bank reference (UTR) once known
        reference: Option<String>,
        status: PayoutStatus,
    },
    Failed {
        error_kind: String,
        message: String,
    },
}

impl PayoutResult {
    pub fn failed(error_kind: impl Into<String>, message: impl Into<String>) -> Self {
        PayoutResult::Failed {
            error_kind: error_kind.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> PayoutStatus {
        match self {
            PayoutResult::Accepted { status, .. } => *status,
            PayoutResult::Failed { .. } => PayoutStatus::Failed,
        }
    }
}

/// What the gateway reports about a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub transfer_id: String,
    pub reference: Option<String>,
    pub status: PayoutStatus,
}

/// One payout attempt. Retries append new records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub id: PayoutId,
    pub claim_id: ClaimId,
    /// 1 for the first attempt
    pub attempt: u32,
    pub amount: Money,
    pub account: Option<BankAccount>,
    pub status: PayoutStatus,
    pub transfer_id: Option<String>,
    pub reference: Option<String>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayoutRecord {
    fn blank(claim: &Claim, attempt: u32, transfer_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PayoutId::new_v7(),
            claim_id: claim.id,
            attempt,
            amount: claim.amount,
            account: claim.payout_account.clone(),
            status: PayoutStatus::Initiated,
            transfer_id,
            reference: None,
            error_kind: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attempt stored before the gateway is called, so a lost response can
    /// be recovered by asking the gateway about `transfer_id`
    pub fn in_flight(claim: &Claim, attempt: u32, transfer_id: &str) -> Self {
        Self::blank(claim, attempt, Some(transfer_id.to_string()))
    }

    /// Attempt that failed before any transfer was created
    pub fn refused(claim: &Claim, attempt: u32, result: &PayoutResult) -> Self {
        Self::blank(claim, attempt, None).resolved(result)
    }

    /// This attempt once the gateway has answered
    pub fn resolved(mut self, result: &PayoutResult) -> Self {
        match result {
            PayoutResult::Accepted {
                transfer_id,
                reference,
                status,
            } => {
                self.status = *status;
                self.transfer_id = Some(transfer_id.clone());
                if reference.is_some() {
                    self.reference = reference.clone();
                }
            }
            PayoutResult::Failed {
                error_kind,
                message,
            } => {
                self.status = PayoutStatus::Failed;
                self.error_kind = Some(error_kind.clone());
                self.error_message = Some(message.clone());
            }
        }
        self.updated_at = Utc::now();
        self
    }

    /// This attempt as a later status check reports it
    pub fn with_receipt(self, receipt: &TransferReceipt) -> Self {
        self.resolved(&PayoutResult::Accepted {
            transfer_id: receipt.transfer_id.clone(),
            reference: receipt.reference.clone(),
            status: receipt.status,
        })
    }
}

/// A live transfer API
#[async_trait]
pub trait PayoutGateway: Send + Sync {
    async fn create_transfer(
        &self,
        transfer_id: &str,
        request: &PayoutRequest,
    ) -> Result<TransferReceipt, PortError>;

    async fn transfer_status(&self, transfer_id: &str) -> Result<TransferReceipt, PortError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutMode {
    /// Synthetic settled transfers, no network
    Sandbox,
    Live,
}

impl FromStr for PayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "mock" => Ok(PayoutMode::Sandbox),
            "live" | "production" => Ok(PayoutMode::Live),
            other => Err(format!("unknown payout mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PayoutConfig {
    pub mode: PayoutMode,
    pub base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub timeout: Duration,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            mode: PayoutMode::Sandbox,
            base_url: DEFAULT_PAYOUT_BASE_URL.to_string(),
            client_id: None,
            client_secret: None,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Payout client; sandbox when no gateway is attached
#[derive(Clone)]
pub struct PayoutClient {
    gateway: Option<Arc<dyn PayoutGateway>>,
    timeout: Duration,
}

impl PayoutClient {
    pub fn sandbox() -> Self {
        Self {
            gateway: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn live(gateway: Arc<dyn PayoutGateway>, timeout: Duration) -> Self {
        Self {
            gateway: Some(gateway),
            timeout,
        }
    }

    /// Live mode requires both gateway credentials
    pub fn from_config(config: &PayoutConfig) -> Result<Self, CoreError> {
        match config.mode {
            PayoutMode::Sandbox => Ok(Self::sandbox()),
            PayoutMode::Live => {
                let (Some(id), Some(secret)) = (&config.client_id, &config.client_secret) else {
                    return Err(CoreError::configuration(
                        "live payout mode needs a client id and client secret",
                    ));
                };
                let gateway = CashfreeGateway::new(&config.base_url, id, secret, config.timeout);
                Ok(Self::live(Arc::new(gateway), config.timeout))
            }
        }
    }

    pub fn is_sandbox(&self) -> bool {
        self.gateway.is_none()
    }

    /// Transfer id for an attempt. Stable per attempt so the gateway can
    /// deduplicate a resent request.
    pub fn transfer_id(claim_id: ClaimId, attempt: u32) -> String {
        format!("PAYOUT_{}_{}", claim_id.as_uuid().simple(), attempt)
    }

    /// Why `request` cannot be sent at all, if it cannot
    pub fn refusal(request: &PayoutRequest) -> Option<PayoutResult> {
        if let Err(e) = request.account.validate() {
            return Some(PayoutResult::failed("invalid_bank_details", e.to_string()));
        }
        if !request.amount.is_positive() {
            return Some(PayoutResult::failed(
                "invalid_amount",
                format!("cannot pay out {}", request.amount),
            ));
        }
        None
    }

    /// Starts a transfer; failures are returned, never raised
    pub async fn initiate(&self, transfer_id: &str, request: &PayoutRequest) -> PayoutResult {
        if let Some(refusal) = Self::refusal(request) {
            return refusal;
        }
        let transfer_id = transfer_id.to_string();

        let Some(gateway) = &self.gateway else {
            info!(claim_id = %request.claim_id, %transfer_id, amount = %request.amount, "Sandbox payout settled");
            return PayoutResult::Accepted {
                transfer_id,
                reference: Some(format!("MOCK_UTR_{}", Utc::now().timestamp_millis())),
                status: PayoutStatus::Success,
            };
        };

        match tokio::time::timeout(self.timeout, gateway.create_transfer(&transfer_id, request)).await {
            Ok(Ok(receipt)) => {
                info!(
                    claim_id = %request.claim_id,
                    transfer_id = %receipt.transfer_id,
                    status = %receipt.status,
                    gateway = gateway.name(),
                    "Payout accepted by gateway"
                );
                PayoutResult::Accepted {
                    transfer_id: receipt.transfer_id,
                    reference: receipt.reference,
                    status: receipt.status,
                }
            }
            Ok(Err(e)) => {
                warn!(claim_id = %request.claim_id, error = %e, "Payout gateway call failed");
                PayoutResult::failed(e.kind(), e.to_string())
            }
            Err(_) => {
                let e = PortError::timeout("create_transfer", self.timeout);
                warn!(claim_id = %request.claim_id, error = %e, "Payout gateway timed out");
                PayoutResult::failed(e.kind(), e.to_string())
            }
        }
    }

    /// Current gateway status of a transfer
    pub async fn transfer_status(&self, transfer_id: &str) -> Result<TransferReceipt, PortError> {
        let Some(gateway) = &self.gateway else {
            return Ok(TransferReceipt {
                transfer_id: transfer_id.to_string(),
                reference: None,
                status: PayoutStatus::Success,
            });
        };

        tokio::time::timeout(self.timeout, gateway.transfer_status(transfer_id))
            .await
            .map_err(|_| PortError::timeout("transfer_status", self.timeout))?
    }
}

#[async_trait]
impl HealthCheckable for PayoutClient {
    async fn health_check(&self) -> HealthCheckResult {
        match &self.gateway {
            Some(g) => HealthCheckResult::new("payout", AdapterHealth::Healthy, 0).with_message(g.name()),
            None => HealthCheckResult::new("payout", AdapterHealth::Degraded, 0).with_message("sandbox"),
        }
    }
}

/// Cashfree payouts API (`/v1/transfers`)
pub struct CashfreeGateway {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl CashfreeGateway {
    pub fn new(base_url: &str, client_id: &str, client_secret: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }

    fn receipt_from(transfer_id: &str, body: &Value) -> Result<TransferReceipt, PortError> {
        if body.get("status").and_then(Value::as_str) == Some("ERROR") {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("gateway rejected the transfer");
            return Err(PortError::validation(message.to_string()));
        }

        let data = body.get("data").unwrap_or(&Value::Null);
        let transfer = data.get("transfer").unwrap_or(data);
        let status = transfer
            .get("status")
            .and_then(Value::as_str)
            .map(PayoutStatus::from_gateway)
            .unwrap_or(PayoutStatus::Pending);
        let reference = transfer
            .get("utr")
            .or_else(|| transfer.get("referenceId"))
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        Ok(TransferReceipt {
            transfer_id: transfer_id.to_string(),
            reference,
            status,
        })
    }
}

#[async_trait]
impl PayoutGateway for CashfreeGateway {
    async fn create_transfer(
        &self,
        transfer_id: &str,
        request: &PayoutRequest,
    ) -> Result<TransferReceipt, PortError> {
        let payload = json!({
            "beneId": format!("BENE_{}", request.claim_id.as_uuid().simple()),
            "amount": request.amount.round_to_currency().amount(),
            "transferId": transfer_id,
            "transferMode": "banktransfer",
            "remarks": request.purpose,
            "bankAccount": request.account.account_number,
            "ifsc": request.account.ifsc_code,
            "beneName": request.account.beneficiary_name,
        });

        let response = self
            .client
            .post(format!("{}/v1/transfers", self.base_url))
            .header("X-Client-Id", &self.client_id)
            .header("X-Client-Secret", &self.client_secret)
            .header("X-Request-Id", transfer_id)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::connection(format!("payout gateway: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::unavailable(format!("payout gateway returned {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::transformation(format!("payout gateway payload: {e}")))?;
        Self::receipt_from(transfer_id, &body)
    }

    async fn transfer_status(&self, transfer_id: &str) -> Result<TransferReceipt, PortError> {
        let response = self
            .client
            .get(format!("{}/v1/transfers/{}", self.base_url, transfer_id))
            .header("X-Client-Id", &self.client_id)
            .header("X-Client-Secret", &self.client_secret)
            .send()
            .await
            .map_err(|e| PortError::connection(format!("payout gateway: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PortError::not_found("Transfer", transfer_id));
        }
        if !status.is_success() {
            return Err(PortError::unavailable(format!("payout gateway returned {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::transformation(format!("payout gateway payload: {e}")))?;
        Self::receipt_from(transfer_id, &body)
    }

    fn name(&self) -> &'static str {
        "cashfree"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(account: BankAccount) -> PayoutRequest {
        PayoutRequest {
            claim_id: ClaimId::new_v7(),
            amount: Money::inr(dec!(150000)),
            account,
            purpose: "test".to_string(),
        }
    }

    fn good_account() -> BankAccount {
        BankAccount::new("Priya Sharma", "987654321098", "ICIC0004321")
    }

    struct Refusing;

    #[async_trait]
    impl PayoutGateway for Refusing {
        async fn create_transfer(&self, _: &str, _: &PayoutRequest) -> Result<TransferReceipt, PortError> {
            Err(PortError::unavailable("payout gateway returned 503 Service Unavailable"))
        }

        async fn transfer_status(&self, id: &str) -> Result<TransferReceipt, PortError> {
            Err(PortError::not_found("Transfer", id))
        }

        fn name(&self) -> &'static str {
            "refusing"
        }
    }

    #[tokio::test]
    async fn test_sandbox_settles_with_mock_reference() {
        let result = PayoutClient::sandbox()
            .initiate("PAYOUT_x_1", &request(good_account()))
            .await;
        match result {
            PayoutResult::Accepted { transfer_id, reference, status } => {
                assert_eq!(transfer_id, "PAYOUT_x_1");
                assert!(reference.unwrap().starts_with("MOCK_UTR_"));
                assert_eq!(status, PayoutStatus::Success);
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_bank_details_fail_without_gateway() {
        let bad = BankAccount::new("Priya Sharma", "12", "ICIC0004321");
        let result = PayoutClient::live(Arc::new(Refusing), Duration::from_secs(1))
            .initiate("PAYOUT_x_1", &request(bad))
            .await;
        assert!(matches!(result, PayoutResult::Failed { ref error_kind, .. } if error_kind == "invalid_bank_details"));
    }

    #[tokio::test]
    async fn test_gateway_error_becomes_failed_result() {
        let result = PayoutClient::live(Arc::new(Refusing), Duration::from_secs(1))
            .initiate("PAYOUT_x_1", &request(good_account()))
            .await;
        assert_eq!(result.status(), PayoutStatus::Failed);
        assert!(matches!(result, PayoutResult::Failed { ref error_kind, .. } if error_kind == "unavailable"));
    }

    #[test]
    fn test_live_mode_requires_credentials() {
        let config = PayoutConfig {
            mode: PayoutMode::Live,
            ..PayoutConfig::default()
        };
        assert!(matches!(PayoutClient::from_config(&config), Err(CoreError::Configuration(_))));
        assert!(PayoutClient::from_config(&PayoutConfig::default()).unwrap().is_sandbox());
    }

    #[test]
    fn test_gateway_vocabulary() {
        assert_eq!(PayoutStatus::from_gateway("SUCCESS"), PayoutStatus::Success);
        assert_eq!(PayoutStatus::from_gateway("REVERSED"), PayoutStatus::Failed);
        assert_eq!(PayoutStatus::from_gateway("PENDING"), PayoutStatus::Pending);
        assert_eq!(PayoutStatus::Pending.payout_state(), PayoutState::Initiated);
        assert_eq!(PayoutStatus::Success.payout_state(), PayoutState::Settled);
    }

    #[test]
    fn test_receipt_reads_nested_transfer() {
        let body = json!({
            "status": "SUCCESS",
            "data": { "transfer": { "status": "SUCCESS", "utr": "UTR123" } }
        });
        let receipt = CashfreeGateway::receipt_from("PAYOUT_x_1", &body).unwrap();
        assert_eq!(receipt.status, PayoutStatus::Success);
        assert_eq!(receipt.reference.as_deref(), Some("UTR123"));

        let error = json!({ "status": "ERROR", "message": "Invalid IFSC" });
        assert!(CashfreeGateway::receipt_from("PAYOUT_x_1", &error).is_err());
    }

    #[test]
    fn test_transfer_id_is_stable_per_attempt() {
        let claim_id = ClaimId::new_v7();
        assert_eq!(
            PayoutClient::transfer_id(claim_id, 1),
            PayoutClient::transfer_id(claim_id, 1)
        );
        assert_ne!(
            PayoutClient::transfer_id(claim_id, 1),
            PayoutClient::transfer_id(claim_id, 2)
        );
    }

    #[test]
    fn test_refusal_checks_account_before_gateway() {
        let bad = BankAccount::new("Priya Sharma", "12", "ICIC0004321");
        assert!(PayoutClient::refusal(&request(bad)).is_some());
        assert!(PayoutClient::refusal(&request(good_account())).is_none());
    }
}
