//! Turning model output into a complete verdict
//!
//! Three tiers, first success wins:
//!
//! 1. the outermost `{...}` span parsed as JSON, provided it carries both
//!    `fraudScore` and `riskLevel`;
//! 2. regex extraction from free text;
//! 3. the fixed fallback verdict, for empty output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::num::IntErrorKind;

use crate::verdict::{AmountValidation, RiskLevel, RiskVerdict, VerdictSource};

static FRAUD_SCORE_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)fraud[^0-9]*([0-9]+)").expect("fraud score pattern compiles"));

const TEXT_ANALYSIS_CHARS: usize = 500;

/// Parses a model answer; always yields a complete verdict
pub fn parse_verdict(text: &str) -> RiskVerdict {
    if text.trim().is_empty() {
        return RiskVerdict::fallback();
    }
    parse_structured(text).unwrap_or_else(|| extract_from_text(text))
}

fn parse_structured(text: &str) -> Option<RiskVerdict> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let value: Value = serde_json::from_str(&text[start..=end]).ok()?;
    let obj = value.as_object()?;

    let fraud_score = score(obj.get("fraudScore")?)?;
    let risk_level: RiskLevel = obj.get("riskLevel")?.as_str()?.parse().ok()?;

    let analysis = string_field(obj, "analysis").unwrap_or_default();
    let summary = string_field(obj, "summary")
        .unwrap_or_else(|| format!("{risk_level} risk, fraud score {fraud_score}"));

    Some(RiskVerdict {
        fraud_score,
        risk_level,
        is_valid_claim: obj.get("isValidClaim").and_then(boolean).unwrap_or(true),
        confidence: obj.get("confidence").and_then(score).unwrap_or(50),
        analysis,
        summary,
        red_flags: string_list(obj, "redFlags"),
        recommendations: string_list(obj, "recommendations"),
        disease_match: obj.get("diseaseMatch").and_then(boolean),
        amount_validation: obj
            .get("amountValidation")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<AmountValidation>().ok()),
        source: VerdictSource::Model,
    })
}

fn extract_from_text(text: &str) -> RiskVerdict {
    let fraud_score = FRAUD_SCORE_IN_TEXT
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| clamp_digits(m.as_str()))
        .unwrap_or(25);

    let lower = text.to_lowercase();
    let risk_level = if lower.contains("high risk") || lower.contains("critical") {
        RiskLevel::High
    } else if lower.contains("medium risk") {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    RiskVerdict {
        fraud_score,
        risk_level,
        is_valid_claim: true,
        confidence: 75,
        analysis: text.chars().take(TEXT_ANALYSIS_CHARS).collect(),
        summary: format!("{risk_level} risk, fraud score {fraud_score} (read from unstructured output)"),
        red_flags: Vec::new(),
        recommendations: vec!["Claim appears valid based on available data".to_string()],
        disease_match: Some(true),
        amount_validation: Some(AmountValidation::Appropriate),
        source: VerdictSource::TextExtraction,
    }
}

/// ASCII digit run clamped to 0..=100; runs too long for `u64` saturate
fn clamp_digits(digits: &str) -> Option<u8> {
    match digits.parse::<u64>() {
        Ok(n) => Some(n.min(100) as u8),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Some(100),
        Err(_) => None,
    }
}

fn score(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    if n.is_nan() {
        return None;
    }
    Some(n.round().clamp(0.0, 100.0) as u8)
}

fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.trim().is_empty())
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn any_text_yields_bounded_verdict(text in ".{0,300}") {
            let verdict = parse_verdict(&text);
            prop_assert!(verdict.fraud_score <= 100);
            prop_assert!(verdict.confidence <= 100);
            prop_assert!(verdict.analysis.chars().count() <= 500 || verdict.source == VerdictSource::Model);
        }

        #[test]
        fn json_scores_always_clamped(score in -1000i64..1000i64) {
            let text = format!(r#"{{"fraudScore": {score}, "riskLevel": "LOW"}}"#);
            let verdict = parse_verdict(&text);
            prop_assert_eq!(verdict.fraud_score as i64, score.clamp(0, 100));
        }
    }
}
