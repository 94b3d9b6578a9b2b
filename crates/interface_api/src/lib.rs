//! HTTP API Layer
//!
//! REST surface of the claim adjudication core, using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: thin wrappers over [`ClaimWorkflow`] operations
//! - **Middleware**: bearer authentication, request ids, tracing, audit logging
//! - **DTOs**: request validation and response shapes
//! - **Error Handling**: domain errors mapped to status codes in one place
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(workflow, store_health, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use core_kernel::HealthCheckable;
use domain_claims::ClaimWorkflow;

use crate::config::ApiConfig;
use crate::handlers::{claims, health};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<ClaimWorkflow>,
    /// Probed by the readiness check
    pub store_health: Arc<dyn HealthCheckable>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(
        workflow: ClaimWorkflow,
        store_health: Arc<dyn HealthCheckable>,
        config: ApiConfig,
    ) -> Self {
        Self {
            workflow: Arc::new(workflow),
            store_health,
            config,
        }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let claims_routes = Router::new()
        .route("/", post(claims::submit_claim))
        .route("/ai-submit", post(claims::submit_and_analyse))
        .route("/me", get(claims::my_claims))
        .route("/provider", get(claims::provider_claims))
        .route("/:id", get(claims::get_claim))
        .route("/:id/analysis", post(claims::run_analysis))
        .route("/:id/decision", post(claims::decide))
        .route("/:id/manual-review", post(claims::release_for_review))
        .route("/:id/payout/retry", post(claims::retry_payout))
        .route("/:id/payout/refresh", post(claims::refresh_payout))
        .route("/:id/payouts", get(claims::payout_history));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/claims", claims_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
