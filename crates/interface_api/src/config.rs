//! API configuration
//!
//! Every field can be set from an `API_`-prefixed environment variable
//! (`API_PORT`, `API_PAYOUT_MODE`, ...). Missing fields keep their defaults.

use serde::Deserialize;
use std::time::Duration;

use core_kernel::CoreError;
use domain_claims::{
    AnalysisConfig, AnalysisProvider, LedgerConfig, PayoutConfig, PayoutMode, RecordsConfig,
    WorkflowConfig,
};
use infra_db::DatabaseConfig;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    pub database_max_connections: u32,
    /// Log level, used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Health-record registry; unset selects the sandbox registry
    pub records_url: Option<String>,
    pub records_api_key: Option<String>,
    pub records_timeout_secs: u64,

    /// `groq`, `perplexity`, `gemini` or `disabled`
    pub analysis_provider: String,
    pub analysis_api_key: Option<String>,
    pub analysis_model: Option<String>,
    pub analysis_timeout_secs: u64,
    /// How long a claim may sit in `analysis_pending` before another run may take it over
    pub analysis_lease_secs: u64,

    /// `sandbox` or `live`
    pub payout_mode: String,
    pub payout_base_url: Option<String>,
    pub payout_client_id: Option<String>,
    pub payout_client_secret: Option<String>,
    pub payout_timeout_secs: u64,

    /// Ledger gateway; unset disables notarization
    pub ledger_url: Option<String>,
    pub ledger_api_key: Option<String>,
    pub ledger_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/claims".to_string(),
            database_max_connections: 10,
            log_level: "info".to_string(),
            log_json: false,
            records_url: None,
            records_api_key: None,
            records_timeout_secs: 10,
            analysis_provider: "groq".to_string(),
            analysis_api_key: None,
            analysis_model: None,
            analysis_timeout_secs: 30,
            analysis_lease_secs: 300,
            payout_mode: "sandbox".to_string(),
            payout_base_url: None,
            payout_client_id: None,
            payout_client_secret: None,
            payout_timeout_secs: 15,
            ledger_url: None,
            ledger_api_key: None,
            ledger_timeout_secs: 5,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database_url).max_connections(self.database_max_connections)
    }

    pub fn records_config(&self) -> RecordsConfig {
        RecordsConfig {
            base_url: non_empty(&self.records_url),
            api_key: non_empty(&self.records_api_key),
            timeout: Duration::from_secs(self.records_timeout_secs),
        }
    }

    pub fn analysis_config(&self) -> Result<AnalysisConfig, CoreError> {
        let provider = self
            .analysis_provider
            .parse::<AnalysisProvider>()
            .map_err(CoreError::configuration)?;
        Ok(AnalysisConfig {
            provider,
            api_key: non_empty(&self.analysis_api_key),
            model: non_empty(&self.analysis_model),
            timeout: Duration::from_secs(self.analysis_timeout_secs),
        })
    }

    pub fn payout_config(&self) -> Result<PayoutConfig, CoreError> {
        let mode = self
            .payout_mode
            .parse::<PayoutMode>()
            .map_err(CoreError::configuration)?;
        let defaults = PayoutConfig::default();
        Ok(PayoutConfig {
            mode,
            base_url: non_empty(&self.payout_base_url).unwrap_or(defaults.base_url),
            client_id: non_empty(&self.payout_client_id),
            client_secret: non_empty(&self.payout_client_secret),
            timeout: Duration::from_secs(self.payout_timeout_secs),
        })
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            endpoint: non_empty(&self.ledger_url),
            api_key: non_empty(&self.ledger_api_key),
            timeout: Duration::from_secs(self.ledger_timeout_secs),
        }
    }

    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            analysis_lease: Duration::from_secs(self.analysis_lease_secs),
        }
    }
}

/// Treats blank strings from the environment as unset
fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
