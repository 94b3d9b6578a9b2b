//! Claims API Server
//!
//! # Usage
//!
//! ```bash
//! # Sandbox integrations, local database
//! cargo run --bin claims-api
//!
//! # Live payout gateway
//! API_PAYOUT_MODE=live API_PAYOUT_CLIENT_ID=... API_PAYOUT_CLIENT_SECRET=... cargo run --bin claims-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` / `API_PORT` - Bind address (default: 0.0.0.0:8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_DATABASE_URL` - PostgreSQL connection string (`DATABASE_URL` also works)
//! * `API_LOG_LEVEL` - Used when `RUST_LOG` is unset (default: info)
//! * `API_LOG_JSON` - Emit JSON log lines
//! * `API_RECORDS_URL`, `API_RECORDS_API_KEY` - Health-record registry; unset uses the sandbox
//! * `API_ANALYSIS_PROVIDER`, `API_ANALYSIS_API_KEY`, `API_ANALYSIS_MODEL` - Fraud scoring
//! * `API_PAYOUT_MODE` - `sandbox` (default) or `live`
//! * `API_LEDGER_URL` - Ledger gateway; unset disables notarization

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_claims::{
    ClaimWorkflow, ExternalRecordsClient, LedgerClient, PayoutClient, RiskAnalysisClient,
    WorkflowDependencies,
};
use infra_db::{create_pool, PostgresClaimStore, PostgresNotifier, PostgresPolicyStore};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let mut config = ApiConfig::from_env().context("invalid API_* configuration")?;
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database_url = url;
    }

    init_tracing(&config.log_level, config.log_json);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        payout_mode = %config.payout_mode,
        analysis_provider = %config.analysis_provider,
        "Starting claims API server"
    );

    let pool = create_pool(config.database_config())
        .await
        .context("database unavailable")?;

    let claims = Arc::new(PostgresClaimStore::new(pool.clone()));
    let deps = WorkflowDependencies {
        policies: Arc::new(PostgresPolicyStore::new(pool.clone())),
        claims: claims.clone(),
        records: ExternalRecordsClient::from_config(&config.records_config()),
        analysis: RiskAnalysisClient::from_config(&config.analysis_config()?),
        payouts: PayoutClient::from_config(&config.payout_config()?)?,
        ledger: LedgerClient::from_config(&config.ledger_config()),
        notifier: Arc::new(PostgresNotifier::new(pool)),
    };
    let workflow = ClaimWorkflow::new(deps, config.workflow_config());

    for check in workflow.integration_health().await {
        tracing::info!(
            integration = %check.adapter_id,
            status = ?check.status,
            detail = check.message.as_deref().unwrap_or(""),
            "Integration configured"
        );
    }

    let addr: SocketAddr = config.server_addr().parse()?;
    let app = create_router(AppState::new(workflow, claims, config));

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for Ctrl+C or SIGTERM so in-flight requests can finish
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
