//! Claims handlers
//!
//! Role checks happen here; whether the caller owns or reviews the
//! particular claim is decided by the workflow.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::ClaimId;

use crate::auth::{require_role, roles, Claims};
use crate::dto::claims::*;
use crate::{error::ApiError, AppState};

/// Files a claim; analysis runs separately
pub async fn submit_claim(
    State(state): State<AppState>,
    Extension(auth): Extension<Claims>,
    Json(request): Json<SubmitClaimRequest>,
) -> Result<(StatusCode, Json<ClaimResponse>), ApiError> {
    require_role(&auth, roles::CLAIMANT)?;
    request.validate()?;
    let command = request.into_command(auth.party_id()?)?;

    let claim = state.workflow.submit(command).await?;
    Ok((StatusCode::CREATED, Json(ClaimResponse::from(&claim))))
}

/// Files a claim and analyses it in the same request
pub async fn submit_and_analyse(
    State(state): State<AppState>,
    Extension(auth): Extension<Claims>,
    Json(request): Json<SubmitClaimRequest>,
) -> Result<(StatusCode, Json<AnalysisResponse>), ApiError> {
    require_role(&auth, roles::CLAIMANT)?;
    request.validate()?;
    let command = request.into_command(auth.party_id()?)?;

    let outcome = state.workflow.submit_and_analyse(command).await?;
    Ok((StatusCode::CREATED, Json(AnalysisResponse::from(&outcome))))
}

/// Claims filed by the caller, newest first
pub async fn my_claims(
    State(state): State<AppState>,
    Extension(auth): Extension<Claims>,
) -> Result<Json<Vec<ClaimResponse>>, ApiError> {
    let claims = state.workflow.claims_for_claimant(auth.party_id()?).await?;
    Ok(Json(claims.iter().map(ClaimResponse::from).collect()))
}

/// Claims against policies the caller underwrites, newest first
pub async fn provider_claims(
    State(state): State<AppState>,
    Extension(auth): Extension<Claims>,
) -> Result<Json<Vec<ClaimResponse>>, ApiError> {
    require_role(&auth, roles::PROVIDER)?;
    let claims = state.workflow.claims_for_provider(auth.party_id()?).await?;
    Ok(Json(claims.iter().map(ClaimResponse::from).collect()))
}

/// Gets a claim by ID
pub async fn get_claim(
    State(state): State<AppState>,
    Extension(auth): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim = state
        .workflow
        .get_claim(ClaimId::from(id), auth.party_id()?)
        .await?;
    Ok(Json(ClaimResponse::from(&claim)))
}

/// Runs (or re-runs) records fetch and risk analysis
pub async fn run_analysis(
    State(state): State<AppState>,
    Extension(auth): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let claim_id = ClaimId::from(id);
    state.workflow.get_claim(claim_id, auth.party_id()?).await?;

    let outcome = state.workflow.run_analysis(claim_id).await?;
    Ok(Json(AnalysisResponse::from(&outcome)))
}

/// Provider approves or rejects a reviewed claim
pub async fn decide(
    State(state): State<AppState>,
    Extension(auth): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    require_role(&auth, roles::PROVIDER)?;
    request.validate()?;

    let claim = state
        .workflow
        .decide(ClaimId::from(id), auth.party_id()?, request.action, request.comments)
        .await?;
    Ok(Json(ClaimResponse::from(&claim)))
}

/// Sends a claim whose records could not be fetched to manual review
pub async fn release_for_review(
    State(state): State<AppState>,
    Extension(auth): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    require_role(&auth, roles::PROVIDER)?;
    let claim = state
        .workflow
        .release_for_review(ClaimId::from(id), auth.party_id()?)
        .await?;
    Ok(Json(ClaimResponse::from(&claim)))
}

pub async fn retry_payout(
    State(state): State<AppState>,
    Extension(auth): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    require_role(&auth, roles::PROVIDER)?;
    let claim = state
        .workflow
        .retry_payout(ClaimId::from(id), auth.party_id()?)
        .await?;
    Ok(Json(ClaimResponse::from(&claim)))
}

pub async fn refresh_payout(
    State(state): State<AppState>,
    Extension(auth): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim_id = ClaimId::from(id);
    state.workflow.get_claim(claim_id, auth.party_id()?).await?;

    let claim = state.workflow.refresh_payout(claim_id).await?;
    Ok(Json(ClaimResponse::from(&claim)))
}

/// Payout attempts, oldest first
pub async fn payout_history(
    State(state): State<AppState>,
    Extension(auth): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PayoutRecordResponse>>, ApiError> {
    let records = state
        .workflow
        .payout_history(ClaimId::from(id), auth.party_id()?)
        .await?;
    Ok(Json(records.iter().map(PayoutRecordResponse::from).collect()))
}
