//! AI fraud-scoring client
//!
//! `analyze` is total: whatever the backend does (hang, error, answer in
//! prose, answer nothing) the caller gets a complete [`RiskVerdict`].

mod backends;
mod parser;
mod prompt;

pub use backends::{AnalysisBackend, ChatCompletionsBackend, GeminiBackend};
pub use parser::parse_verdict;
pub use prompt::{build_prompt, AnalysisContext, SYSTEM_PROMPT};

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable};

use crate::verdict::RiskVerdict;

/// Which scoring service to call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisProvider {
    Groq,
    Perplexity,
    Gemini,
    /// Always use the fallback verdict
    Disabled,
}

impl FromStr for AnalysisProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(AnalysisProvider::Groq),
            "perplexity" => Ok(AnalysisProvider::Perplexity),
            "gemini" => Ok(AnalysisProvider::Gemini),
            "disabled" | "none" | "" => Ok(AnalysisProvider::Disabled),
            other => Err(format!("unknown analysis provider '{other}'")),
        }
    }
}

impl fmt::Display for AnalysisProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisProvider::Groq => "groq",
            AnalysisProvider::Perplexity => "perplexity",
            AnalysisProvider::Gemini => "gemini",
            AnalysisProvider::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub provider: AnalysisProvider,
    pub api_key: Option<String>,
    /// Overrides the provider's default model
    pub model: Option<String>,
    pub timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            provider: AnalysisProvider::Groq,
            api_key: None,
            model: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Fraud-scoring client with a deterministic fallback
#[derive(Clone)]
pub struct RiskAnalysisClient {
    backend: Option<Arc<dyn AnalysisBackend>>,
    timeout: Duration,
}

impl RiskAnalysisClient {
    pub fn new(backend: Arc<dyn AnalysisBackend>, timeout: Duration) -> Self {
        Self {
            backend: Some(backend),
            timeout,
        }
    }

    /// Client that always answers with the fallback verdict
    pub fn fallback_only() -> Self {
        Self {
            backend: None,
            timeout: Duration::ZERO,
        }
    }

    /// Builds the configured backend; a missing key degrades to fallback-only
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let key = match (&config.provider, &config.api_key) {
            (AnalysisProvider::Disabled, _) => return Self::fallback_only(),
            (_, Some(key)) if !key.trim().is_empty() => key.clone(),
            (provider, _) => {
                warn!(%provider, "No API key for analysis provider, using fallback verdicts");
                return Self::fallback_only();
            }
        };

        let model = config.model.clone();
        let backend: Arc<dyn AnalysisBackend> = match config.provider {
            AnalysisProvider::Groq => Arc::new(ChatCompletionsBackend::groq(key, model, config.timeout)),
            AnalysisProvider::Perplexity => {
                Arc::new(ChatCompletionsBackend::perplexity(key, model, config.timeout))
            }
            AnalysisProvider::Gemini => Arc::new(GeminiBackend::new(key, model, config.timeout)),
            AnalysisProvider::Disabled => return Self::fallback_only(),
        };
        Self::new(backend, config.timeout)
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.name())
    }

    /// Scores a claim; never fails
    pub async fn analyze(&self, ctx: &AnalysisContext) -> RiskVerdict {
        let Some(backend) = &self.backend else {
            return RiskVerdict::fallback();
        };

        let prompt = build_prompt(ctx);
        let started = Instant::now();

        match tokio::time::timeout(self.timeout, backend.complete(SYSTEM_PROMPT, &prompt)).await {
            Ok(Ok(text)) => {
                let verdict = parse_verdict(&text);
                info!(
                    backend = backend.name(),
                    source = ?verdict.source,
                    fraud_score = verdict.fraud_score,
                    risk_level = %verdict.risk_level,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Risk analysis completed"
                );
                verdict
            }
            Ok(Err(e)) => {
                warn!(backend = backend.name(), error = %e, "Risk analysis failed, using fallback verdict");
                RiskVerdict::fallback()
            }
            Err(_) => {
                warn!(
                    backend = backend.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Risk analysis timed out, using fallback verdict"
                );
                RiskVerdict::fallback()
            }
        }
    }
}

#[async_trait]
impl HealthCheckable for RiskAnalysisClient {
    async fn health_check(&self) -> HealthCheckResult {
        match self.backend_name() {
            Some(name) => HealthCheckResult::new("analysis", AdapterHealth::Healthy, 0).with_message(name),
            None => HealthCheckResult::new("analysis", AdapterHealth::Degraded, 0)
                .with_message("fallback verdicts only"),
        }
    }
}
