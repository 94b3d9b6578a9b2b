//! HTTP tests for the claims API
//!
//! The router runs over the in-memory stores and scripted backends, so the
//! whole request path is exercised without a database.

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use core_kernel::PartyId;
use domain_claims::ports::mock::InMemoryClaimStore;
use domain_claims::Policy;
use interface_api::auth::{create_token, roles};
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};
use test_utils::{StringFixtures, TemporalFixtures, VerdictFixtures, WorkflowHarness};

const SECRET: &str = "api-test-secret";

struct Api {
    server: TestServer,
    policy: Policy,
    holder: PartyId,
    provider: PartyId,
    claims: Arc<InMemoryClaimStore>,
}

impl Api {
    fn holder_token(&self) -> String {
        token(self.holder, roles::CLAIMANT)
    }

    fn provider_token(&self) -> String {
        token(self.provider, roles::PROVIDER)
    }

    fn submission(&self) -> Value {
        json!({
            "policy_id": self.policy.id.as_uuid(),
            "amount": "125000.00",
            "incident_date": TemporalFixtures::recent_incident(),
            "description": StringFixtures::claim_description(),
            "record_id": StringFixtures::rajesh_record_id(),
            "hospital_name": "Apollo Hospitals, Chennai",
            "documents": [{
                "document_type": "discharge_summary",
                "file_name": "discharge.pdf",
                "storage_path": "claims/discharge.pdf",
                "size_bytes": 120000,
                "mime_type": "application/pdf"
            }],
            "bank_details": {
                "beneficiary_name": "Rajesh Kumar",
                "account_number": "123456789012",
                "ifsc_code": "HDFC0001234"
            }
        })
    }

    /// Submits and analyses the standard claim; returns its id
    async fn routed_claim(&self) -> String {
        let response = self
            .server
            .post("/api/v1/claims/ai-submit")
            .authorization_bearer(self.holder_token())
            .json(&self.submission())
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["claim"]["id"].as_str().unwrap().to_string()
    }
}

fn token(party: PartyId, role: &str) -> String {
    create_token(party, vec![role.to_string()], SECRET, 3600).unwrap()
}

async fn api_with(harness: WorkflowHarness) -> Api {
    let WorkflowHarness {
        workflow,
        claims,
        policy,
        holder,
        provider,
        ..
    } = harness;

    let config = ApiConfig {
        jwt_secret: SECRET.to_string(),
        ..ApiConfig::default()
    };
    let state = AppState::new(workflow, claims.clone(), config);

    Api {
        server: TestServer::new(create_router(state)).unwrap(),
        policy,
        holder,
        provider,
        claims,
    }
}

async fn api() -> Api {
    api_with(WorkflowHarness::new().await).await
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let api = api().await;

        let response = api.server.get("/health").await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "healthy");
    }

    #[tokio::test]
    async fn test_readiness_reports_store_and_integrations() {
        let api = api().await;

        let response = api.server.get("/health/ready").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "ready");
        let checks = body["checks"].as_array().unwrap();
        assert_eq!(checks.len(), 5);
        assert_eq!(checks[0]["adapter_id"], "claim-store");
    }

    #[tokio::test]
    async fn test_response_carries_request_id() {
        let api = api().await;

        let response = api.server.get("/health").await;

        assert!(response.headers().contains_key("x-request-id"));
    }
}

mod authentication {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        let api = api().await;

        let response = api.server.get("/api/v1/claims/me").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let api = api().await;
        let forged =
            create_token(api.holder, vec![roles::CLAIMANT.to_string()], "other", 3600).unwrap();

        let response = api
            .server
            .get("/api/v1/claims/me")
            .authorization_bearer(forged)
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_claimant_cannot_decide() {
        let api = api().await;
        let claim_id = api.routed_claim().await;

        let response = api
            .server
            .post(&format!("/api/v1/claims/{claim_id}/decision"))
            .authorization_bearer(api.holder_token())
            .json(&json!({ "action": "approve" }))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_provider_cannot_submit() {
        let api = api().await;

        let response = api
            .server
            .post("/api/v1/claims")
            .authorization_bearer(api.provider_token())
            .json(&api.submission())
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }
}

mod claim_lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_submit_analyse_approve_and_pay() {
        let api = api().await;

        let claim_id = api.routed_claim().await;

        let pending: Value = api
            .server
            .get("/api/v1/claims/provider")
            .authorization_bearer(api.provider_token())
            .await
            .json();
        let pending = pending.as_array().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0]["status"], "pending_provider_review");
        assert_eq!(pending[0]["verdict"]["risk_level"], "LOW");
        assert_eq!(pending[0]["payout_account"], "XXXXXXXX9012");

        let response = api
            .server
            .post(&format!("/api/v1/claims/{claim_id}/decision"))
            .authorization_bearer(api.provider_token())
            .json(&json!({ "action": "approve", "comments": "Records match" }))
            .await;
        response.assert_status_ok();
        let approved: Value = response.json();
        assert_eq!(approved["status"], "approved");
        assert_eq!(approved["decision"]["action"], "approve");
        assert_eq!(approved["payout"]["state"], "settled");

        let history: Value = api
            .server
            .get(&format!("/api/v1/claims/{claim_id}/payouts"))
            .authorization_bearer(api.holder_token())
            .await
            .json();
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["attempt"], 1);
        assert_eq!(history[0]["status"], "success");
        assert_eq!(api.claims.payout_count().await, 1);
    }

    #[tokio::test]
    async fn test_two_step_submission() {
        let api = api().await;

        let response = api
            .server
            .post("/api/v1/claims")
            .authorization_bearer(api.holder_token())
            .json(&api.submission())
            .await;
        response.assert_status(StatusCode::CREATED);
        let submitted: Value = response.json();
        assert_eq!(submitted["status"], "submitted");
        assert_eq!(submitted["currency"], "INR");

        let claim_id = submitted["id"].as_str().unwrap();
        let response = api
            .server
            .post(&format!("/api/v1/claims/{claim_id}/analysis"))
            .authorization_bearer(api.holder_token())
            .await;
        response.assert_status_ok();
        let analysed: Value = response.json();
        assert_eq!(analysed["claim"]["status"], "pending_provider_review");
        assert!(analysed.get("records_unavailable").is_none());
    }

    #[tokio::test]
    async fn test_reject_with_comments() {
        let api = api().await;
        let claim_id = api.routed_claim().await;

        let response = api
            .server
            .post(&format!("/api/v1/claims/{claim_id}/decision"))
            .authorization_bearer(api.provider_token())
            .json(&json!({ "action": "reject", "comments": "Pre-existing condition" }))
            .await;

        response.assert_status_ok();
        let rejected: Value = response.json();
        assert_eq!(rejected["status"], "rejected");
        assert!(rejected["payout"].is_null());
    }

    #[tokio::test]
    async fn test_invalid_verdict_auto_rejects() {
        let harness = WorkflowHarness::builder()
            .analysis(domain_claims::ports::mock::Script::Reply(
                VerdictFixtures::invalid_claim().to_string(),
            ))
            .build()
            .await;
        let api = api_with(harness).await;

        let response = api
            .server
            .post("/api/v1/claims/ai-submit")
            .authorization_bearer(api.holder_token())
            .json(&api.submission())
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["claim"]["status"], "auto_rejected");
        assert_eq!(body["claim"]["verdict"]["is_valid_claim"], false);
    }

    #[tokio::test]
    async fn test_records_outage_then_manual_review() {
        let harness = WorkflowHarness::builder().records_unreachable().build().await;
        let api = api_with(harness).await;

        let response = api
            .server
            .post("/api/v1/claims/ai-submit")
            .authorization_bearer(api.holder_token())
            .json(&api.submission())
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["claim"]["status"], "records_fetch_failed");
        assert!(body["records_unavailable"].is_string());

        let claim_id = body["claim"]["id"].as_str().unwrap();
        let response = api
            .server
            .post(&format!("/api/v1/claims/{claim_id}/manual-review"))
            .authorization_bearer(api.provider_token())
            .await;

        response.assert_status_ok();
        let released: Value = response.json();
        assert_eq!(released["status"], "pending_provider_review");
        assert!(released["verdict"].is_null());
    }
}

mod error_mapping {
    use super::*;

    fn error_code(body: &Value) -> &str {
        body["error"].as_str().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_second_open_claim_conflicts() {
        let api = api().await;
        api.routed_claim().await;

        let response = api
            .server
            .post("/api/v1/claims")
            .authorization_bearer(api.holder_token())
            .json(&api.submission())
            .await;

        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(error_code(&response.json()), "DUPLICATE_CLAIM");
    }

    #[tokio::test]
    async fn test_second_decision_conflicts() {
        let api = api().await;
        let claim_id = api.routed_claim().await;
        let path = format!("/api/v1/claims/{claim_id}/decision");

        api.server
            .post(&path)
            .authorization_bearer(api.provider_token())
            .json(&json!({ "action": "reject" }))
            .await
            .assert_status_ok();

        let response = api
            .server
            .post(&path)
            .authorization_bearer(api.provider_token())
            .json(&json!({ "action": "approve" }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(error_code(&response.json()), "ALREADY_PROCESSED");
    }

    #[tokio::test]
    async fn test_retry_without_failed_payout_conflicts() {
        let api = api().await;
        let claim_id = api.routed_claim().await;

        let response = api
            .server
            .post(&format!("/api/v1/claims/{claim_id}/payout/retry"))
            .authorization_bearer(api.provider_token())
            .await;

        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(error_code(&response.json()), "INVALID_STATE");
    }

    #[tokio::test]
    async fn test_other_provider_is_not_authorized() {
        let api = api().await;
        let claim_id = api.routed_claim().await;

        let response = api
            .server
            .post(&format!("/api/v1/claims/{claim_id}/decision"))
            .authorization_bearer(token(PartyId::new_v7(), roles::PROVIDER))
            .json(&json!({ "action": "approve" }))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(error_code(&response.json()), "NOT_AUTHORIZED");
    }

    #[tokio::test]
    async fn test_stranger_sees_not_found() {
        let api = api().await;
        let claim_id = api.routed_claim().await;

        let response = api
            .server
            .get(&format!("/api/v1/claims/{claim_id}"))
            .authorization_bearer(token(PartyId::new_v7(), roles::CLAIMANT))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(error_code(&response.json()), "CLAIM_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_record_id_is_unprocessable() {
        let api = api().await;
        let mut body = api.submission();
        body["record_id"] = json!(StringFixtures::malformed_record_id());

        let response = api
            .server
            .post("/api/v1/claims")
            .authorization_bearer(api.holder_token())
            .json(&body)
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error_code(&response.json()), "INVALID_RECORD_REFERENCE");
    }

    #[tokio::test]
    async fn test_amount_over_coverage_is_unprocessable() {
        let api = api().await;
        let mut body = api.submission();
        body["amount"] = json!("500000.01");

        let response = api
            .server
            .post("/api/v1/claims")
            .authorization_bearer(api.holder_token())
            .json(&body)
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error_code(&response.json()), "INVALID_AMOUNT");
    }

    #[tokio::test]
    async fn test_unknown_currency_fails_validation() {
        let api = api().await;
        let mut body = api.submission();
        body["currency"] = json!("XYZ");

        let response = api
            .server
            .post("/api/v1/claims")
            .authorization_bearer(api.holder_token())
            .json(&body)
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error_code(&response.json()), "validation_error");
    }

    #[tokio::test]
    async fn test_unknown_policy_is_not_found() {
        let api = api().await;
        let mut body = api.submission();
        body["policy_id"] = json!(uuid::Uuid::now_v7());

        let response = api
            .server
            .post("/api/v1/claims")
            .authorization_bearer(api.holder_token())
            .json(&body)
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(error_code(&response.json()), "POLICY_NOT_FOUND");
    }
}
