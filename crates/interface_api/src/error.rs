//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_claims::ClaimError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String, Vec<String>),

    #[error(transparent)]
    Claim(#[from] ClaimError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// HTTP status for a domain failure
fn claim_status(err: &ClaimError) -> StatusCode {
    match err {
        ClaimError::PolicyNotFound(_) | ClaimError::ClaimNotFound(_) => StatusCode::NOT_FOUND,
        ClaimError::DuplicateClaim { .. }
        | ClaimError::AlreadyProcessed { .. }
        | ClaimError::InvalidState { .. } => StatusCode::CONFLICT,
        ClaimError::NotAuthorized(_) => StatusCode::FORBIDDEN,
        ClaimError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ClaimError::PolicyInactive { .. }
        | ClaimError::InvalidAmount(_)
        | ClaimError::InvalidRecordReference(_)
        | ClaimError::InvalidDocument(_)
        | ClaimError::InvalidBankDetails(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found".to_string(), msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request".to_string(), msg, None),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized".to_string(),
                "Unauthorized".to_string(),
                None,
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden".to_string(), msg, None),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error".to_string(),
                    "Internal server error".to_string(),
                    None,
                )
            }
            ApiError::Validation(msg, details) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error".to_string(),
                msg,
                (!details.is_empty()).then_some(details),
            ),
            ApiError::Claim(err) => {
                let status = claim_status(&err);
                let message = if let ClaimError::Store(port) = &err {
                    error!(error = %port, kind = port.kind(), "Store failure");
                    "Internal server error".to_string()
                } else {
                    err.to_string()
                };
                (status, err.code().to_string(), message, None)
            }
        };

        let body = ErrorResponse {
            error: error_type,
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingPermission(_) => ApiError::Forbidden(err.to_string()),
            _ => ApiError::Unauthorized,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{field}: {msg}"),
                    None => format!("{field}: {}", e.code),
                })
            })
            .collect();
        ApiError::Validation("Request failed validation".to_string(), details)
    }
}
