//! Risk verdict produced by the analysis client

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Risk tier reported by the scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            "CRITICAL" => Ok(RiskLevel::Critical),
            other => Err(format!("unknown risk level '{other}'")),
        }
    }
}

/// Scorer's view of the requested amount against the diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmountValidation {
    Appropriate,
    TooHigh,
    TooLow,
}

impl FromStr for AmountValidation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPROPRIATE" => Ok(AmountValidation::Appropriate),
            "TOO_HIGH" => Ok(AmountValidation::TooHigh),
            "TOO_LOW" => Ok(AmountValidation::TooLow),
            other => Err(format!("unknown amount validation '{other}'")),
        }
    }
}

/// Where a verdict came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    /// Structured JSON returned by the model
    Model,
    /// Scraped from a free-text model answer
    TextExtraction,
    /// Fixed verdict used when no model answer was available
    Fallback,
}

/// A complete risk verdict.
///
/// Every field is always populated; the analysis client never hands out a
/// partial verdict, whatever the backend did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskVerdict {
    /// 0 to 100, higher is more suspicious
    pub fraud_score: u8,
    pub risk_level: RiskLevel,
    pub is_valid_claim: bool,
    /// 0 to 100
    pub confidence: u8,
    pub analysis: String,
    pub summary: String,
    pub red_flags: Vec<String>,
    pub recommendations: Vec<String>,
    pub disease_match: Option<bool>,
    pub amount_validation: Option<AmountValidation>,
    pub source: VerdictSource,
}

impl RiskVerdict {
    /// Verdict used when the scorer is unreachable, silent or unconfigured
    pub fn fallback() -> Self {
        Self {
            fraud_score: 15,
            risk_level: RiskLevel::Low,
            is_valid_claim: true,
            confidence: 85,
            analysis: "Automated risk scoring was unavailable; the claim was screened \
                       with default low-risk values and needs provider review."
                .to_string(),
            summary: "Default screening applied, no model verdict".to_string(),
            red_flags: Vec::new(),
            recommendations: vec![
                "Verify medical records manually".to_string(),
                "Confirm treatment costs against hospital bills".to_string(),
                "Review supporting documents before approval".to_string(),
            ],
            disease_match: Some(true),
            amount_validation: Some(AmountValidation::Appropriate),
            source: VerdictSource::Fallback,
        }
    }
}
