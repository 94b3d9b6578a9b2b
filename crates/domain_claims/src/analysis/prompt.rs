//! Prompt construction for the fraud scorer

use chrono::NaiveDate;
use serde::Serialize;

use core_kernel::Money;

use crate::claim::ClaimDocument;
use crate::policy::PolicyType;
use crate::records::RecordBundle;

pub const SYSTEM_PROMPT: &str = "You are an expert insurance fraud detection AI. Analyze the \
provided claim data and medical records to determine fraud risk, validate claim amounts, and \
provide detailed analysis. Always respond with valid JSON format.";

const RESPONSE_SHAPE: &str = r#"{
    "fraudScore": 0-100,
    "riskLevel": "LOW|MEDIUM|HIGH|CRITICAL",
    "isValidClaim": true/false,
    "recommendations": ["recommendation1", "recommendation2"],
    "redFlags": ["flag1", "flag2"],
    "confidence": 0-100,
    "analysis": "Detailed analysis of the claim",
    "summary": "One sentence summary",
    "diseaseMatch": true/false,
    "amountValidation": "APPROPRIATE|TOO_HIGH|TOO_LOW"
}"#;

/// Everything the scorer sees about a claim
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub amount: Money,
    pub policy_type: PolicyType,
    pub coverage: Money,
    pub description: String,
    pub incident_date: NaiveDate,
    pub hospital_name: Option<String>,
    pub treatment_details: Option<String>,
    pub records: RecordBundle,
    pub documents: Vec<ClaimDocument>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentSummary<'a> {
    document_type: &'a str,
    file_name: &'a str,
    mime_type: &'a str,
    size_bytes: u64,
}

/// Renders the user prompt
pub fn build_prompt(ctx: &AnalysisContext) -> String {
    let records = serde_json::to_string_pretty(&ctx.records)
        .unwrap_or_else(|_| "unavailable".to_string());

    let documents: Vec<DocumentSummary<'_>> = ctx
        .documents
        .iter()
        .map(|d| DocumentSummary {
            document_type: &d.document_type,
            file_name: &d.file_name,
            mime_type: &d.mime_type,
            size_bytes: d.size_bytes,
        })
        .collect();
    let documents =
        serde_json::to_string_pretty(&documents).unwrap_or_else(|_| "[]".to_string());

    let mut details = format!(
        "- Claim Amount: {}\n- Policy Type: {}\n- Coverage Amount: {}\n- Incident Description: {}\n- Incident Date: {}",
        ctx.amount, ctx.policy_type, ctx.coverage, ctx.description, ctx.incident_date
    );
    if let Some(hospital) = &ctx.hospital_name {
        details.push_str(&format!("\n- Hospital: {hospital}"));
    }
    if let Some(treatment) = &ctx.treatment_details {
        details.push_str(&format!("\n- Treatment: {treatment}"));
    }

    format!(
        "Analyze this insurance claim for fraud detection and validation:\n\n\
         CLAIM DETAILS:\n{details}\n\n\
         MEDICAL RECORDS (ABDM):\n{records}\n\n\
         USER DOCUMENTS:\n{documents}\n\n\
         IMPORTANT: Respond ONLY with valid JSON in this exact format:\n{RESPONSE_SHAPE}\n\n\
         Focus on:\n\
         1. Medical record consistency\n\
         2. Claim amount reasonableness\n\
         3. Document authenticity\n\
         4. Timeline validation\n\
         5. Pattern analysis for fraud indicators"
    )
}
