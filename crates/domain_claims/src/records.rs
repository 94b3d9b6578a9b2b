//! External health-record registry client
//!
//! Fetches a patient's medical history by registry id. The id format is
//! checked locally first so a malformed id never costs a network call.
//!
//! Two sources exist: a sandbox registry seeded with reference patients,
//! used when no registry URL is configured, and an HTTP registry.

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable, PortError};

static RECORD_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ABDM[0-9]{9}$").expect("record id pattern compiles"));

/// Registry patient id, `ABDM` followed by exactly nine digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    pub fn parse(raw: &str) -> Result<Self, RecordsError> {
        let trimmed = raw.trim();
        if RECORD_ID_PATTERN.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(RecordsError::InvalidFormat(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RecordId {
    type Error = RecordsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RecordId::parse(&value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> String {
        id.0
    }
}

/// Why the registry could not supply a bundle
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordsError {
    #[error("'{0}' is not a valid health-record id (expected ABDM followed by 9 digits)")]
    InvalidFormat(String),

    #[error("no patient with id {0} in the registry")]
    NotFound(String),

    #[error("records registry unavailable: {0}")]
    Unavailable(String),
}

impl RecordsError {
    /// Short machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            RecordsError::InvalidFormat(_) => "invalid_format",
            RecordsError::NotFound(_) => "not_found",
            RecordsError::Unavailable(_) => "unavailable",
        }
    }
}

/// One hospital episode in the patient's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalEncounter {
    pub record_id: String,
    pub hospital_name: String,
    pub admission_date: NaiveDate,
    pub discharge_date: Option<NaiveDate>,
    pub diagnosis: String,
    pub icd10_code: String,
    pub treatment: String,
    pub total_amount: Decimal,
    pub insurance_claimed: Decimal,
}

/// Patient history returned by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBundle {
    pub patient_id: String,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    #[serde(default)]
    pub medical_records: Vec<MedicalEncounter>,
    #[serde(default)]
    pub current_medications: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

/// Where patient histories come from
#[async_trait]
pub trait RecordsSource: Send + Sync {
    /// `Ok(None)` when the registry answers but has no such patient
    async fn lookup(&self, id: &RecordId) -> Result<Option<RecordBundle>, PortError>;

    fn name(&self) -> &'static str;
}

/// Registry client configuration
#[derive(Debug, Clone)]
pub struct RecordsConfig {
    /// Registry base URL; `None` selects the sandbox registry
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for the health-record registry
#[derive(Clone)]
pub struct ExternalRecordsClient {
    source: Arc<dyn RecordsSource>,
    timeout: Duration,
}

impl ExternalRecordsClient {
    pub fn new(source: Arc<dyn RecordsSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Picks the HTTP registry when a URL is configured, the sandbox otherwise
    pub fn from_config(config: &RecordsConfig) -> Self {
        let source: Arc<dyn RecordsSource> = match &config.base_url {
            Some(url) => Arc::new(HttpRecordsSource::new(url, config.api_key.clone(), config.timeout)),
            None => Arc::new(SandboxRecordsSource::seeded()),
        };
        Self::new(source, config.timeout)
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Fetches the patient history for a raw registry id
    pub async fn fetch(&self, raw_id: &str) -> Result<RecordBundle, RecordsError> {
        let id = RecordId::parse(raw_id)?;
        self.fetch_id(&id).await
    }

    /// Fetches the patient history for an already validated id
    pub async fn fetch_id(&self, id: &RecordId) -> Result<RecordBundle, RecordsError> {
        debug!(record_id = %id, source = self.source.name(), "Fetching patient records");

        match tokio::time::timeout(self.timeout, self.source.lookup(id)).await {
            Ok(Ok(Some(bundle))) => Ok(bundle),
            Ok(Ok(None)) => Err(RecordsError::NotFound(id.to_string())),
            Ok(Err(e)) if e.is_not_found() => Err(RecordsError::NotFound(id.to_string())),
            Ok(Err(e)) => {
                warn!(record_id = %id, error = %e, "Records registry call failed");
                Err(RecordsError::Unavailable(e.to_string()))
            }
            Err(_) => {
                warn!(record_id = %id, timeout_ms = self.timeout.as_millis() as u64, "Records registry timed out");
                Err(RecordsError::Unavailable(
                    PortError::timeout("fetch_records", self.timeout).to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl HealthCheckable for ExternalRecordsClient {
    async fn health_check(&self) -> HealthCheckResult {
        let status = if self.source.name() == SandboxRecordsSource::NAME {
            AdapterHealth::Degraded
        } else {
            AdapterHealth::Healthy
        };
        HealthCheckResult::new("records", status, 0).with_message(self.source.name())
    }
}

/// In-process registry seeded with reference patients
#[derive(Debug, Default)]
pub struct SandboxRecordsSource {
    patients: HashMap<String, RecordBundle>,
}

impl SandboxRecordsSource {
    pub const NAME: &'static str = "sandbox";

    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the two reference patients used in demos and tests
    pub fn seeded() -> Self {
        let mut source = Self::empty();
        source.insert(rajesh_kumar());
        source.insert(priya_sharma());
        source
    }

    pub fn insert(&mut self, bundle: RecordBundle) {
        self.patients.insert(bundle.patient_id.clone(), bundle);
    }
}

#[async_trait]
impl RecordsSource for SandboxRecordsSource {
    async fn lookup(&self, id: &RecordId) -> Result<Option<RecordBundle>, PortError> {
        Ok(self.patients.get(id.as_str()).cloned())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

/// Registry reached over HTTP: `GET {base}/patients/{id}/records`
pub struct HttpRecordsSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRecordsSource {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl RecordsSource for HttpRecordsSource {
    async fn lookup(&self, id: &RecordId) -> Result<Option<RecordBundle>, PortError> {
        let url = format!("{}/patients/{}/records", self.base_url, id);
        let started = Instant::now();

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PortError::connection(format!("records registry: {e}")))?;

        let status = response.status();
        debug!(record_id = %id, status = status.as_u16(), elapsed_ms = started.elapsed().as_millis() as u64, "Records registry answered");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(PortError::unavailable(format!(
                "records registry returned {status}"
            )));
        }

        response
            .json::<RecordBundle>()
            .await
            .map(Some)
            .map_err(|e| PortError::transformation(format!("records registry payload: {e}")))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

#[allow(clippy::too_many_arguments)]
fn encounter(
    record_id: &str,
    hospital: &str,
    admitted: (i32, u32, u32),
    discharged: (i32, u32, u32),
    diagnosis: &str,
    icd10: &str,
    treatment: &str,
    total: Decimal,
    claimed: Decimal,
) -> Option<MedicalEncounter> {
    Some(MedicalEncounter {
        record_id: record_id.to_string(),
        hospital_name: hospital.to_string(),
        admission_date: date(admitted.0, admitted.1, admitted.2)?,
        discharge_date: date(discharged.0, discharged.1, discharged.2),
        diagnosis: diagnosis.to_string(),
        icd10_code: icd10.to_string(),
        treatment: treatment.to_string(),
        total_amount: total,
        insurance_claimed: claimed,
    })
}

fn rajesh_kumar() -> RecordBundle {
    RecordBundle {
        patient_id: "ABDM123456789".to_string(),
        full_name: "Rajesh Kumar".to_string(),
        date_of_birth: date(1985, 3, 15),
        gender: Some("Male".to_string()),
        medical_records: [
            encounter(
                "MR001",
                "Apollo Hospital, Delhi",
                (2024, 1, 15),
                (2024, 1, 20),
                "Acute Myocardial Infarction (Heart Attack)",
                "I21.9",
                "Angioplasty with Stent Placement",
                dec!(450000),
                dec!(400000),
            ),
            encounter(
                "MR002",
                "Fortis Hospital, Mumbai",
                (2023, 8, 10),
                (2023, 8, 15),
                "Type 2 Diabetes with Complications",
                "E11.9",
                "Insulin Therapy and Dietary Management",
                dec!(25000),
                dec!(20000),
            ),
        ]
        .into_iter()
        .flatten()
        .collect(),
        current_medications: vec![
            "Metformin 500mg".to_string(),
            "Aspirin 75mg".to_string(),
            "Atorvastatin 20mg".to_string(),
        ],
        allergies: vec!["Penicillin".to_string(), "Shellfish".to_string()],
    }
}

fn priya_sharma() -> RecordBundle {
    RecordBundle {
        patient_id: "ABDM987654321".to_string(),
        full_name: "Priya Sharma".to_string(),
        date_of_birth: date(1990, 7, 22),
        gender: Some("Female".to_string()),
        medical_records: encounter(
            "MR003",
            "Manipal Hospital, Bangalore",
            (2024, 2, 10),
            (2024, 2, 15),
            "Appendicitis with Peritonitis",
            "K35.9",
            "Laparoscopic Appendectomy",
            dec!(180000),
            dec!(150000),
        )
        .into_iter()
        .collect(),
        current_medications: vec![
            "Paracetamol 500mg".to_string(),
            "Ibuprofen 400mg".to_string(),
        ],
        allergies: vec!["Latex".to_string()],
    }
}
