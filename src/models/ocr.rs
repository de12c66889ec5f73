use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Status of an OCR job as reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OcrJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Retrying,
}

impl OcrJobStatus {
    /// Completed and failed jobs never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, OcrJobStatus::Completed | OcrJobStatus::Failed)
    }
}

/// Settings forwarded to the OCR backend with every job.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ProcessingSettings {
    #[garde(length(min = 2, max = 16))]
    pub language: String,

    #[garde(range(min = 72, max = 1200))]
    pub dpi: u32,

    #[garde(skip)]
    pub deskew: bool,

    #[garde(skip)]
    pub denoise: bool,

    #[garde(skip)]
    pub detect_tables: bool,

    #[garde(range(min = 0.0, max = 1.0))]
    pub confidence_threshold: f64,

    /// Page selection such as "1-3,7". `None` means every page.
    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_range: Option<String>,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            dpi: 300,
            deskew: true,
            denoise: false,
            detect_tables: false,
            confidence_threshold: 0.6,
            page_range: None,
        }
    }
}

/// Partial settings applied on top of a job's settings when it is retried.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SettingsOverrides {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub dpi: Option<u32>,
    #[serde(default)]
    pub deskew: Option<bool>,
    #[serde(default)]
    pub denoise: Option<bool>,
    #[serde(default)]
    pub detect_tables: Option<bool>,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
    #[serde(default)]
    pub page_range: Option<String>,
}

impl ProcessingSettings {
    /// Returns a copy of these settings with every present override applied.
    pub fn merged(&self, overrides: &SettingsOverrides) -> Self {
        Self {
            language: overrides
                .language
                .clone()
                .unwrap_or_else(|| self.language.clone()),
            dpi: overrides.dpi.unwrap_or(self.dpi),
            deskew: overrides.deskew.unwrap_or(self.deskew),
            denoise: overrides.denoise.unwrap_or(self.denoise),
            detect_tables: overrides.detect_tables.unwrap_or(self.detect_tables),
            confidence_threshold: overrides
                .confidence_threshold
                .unwrap_or(self.confidence_threshold),
            page_range: overrides
                .page_range
                .clone()
                .or_else(|| self.page_range.clone()),
        }
    }
}

/// Error codes surfaced to the console when an OCR job cannot finish.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OcrErrorCode {
    IncompatibleDocument,
    StartJobFailed,
    ProcessingFailed,
    PollingFailed,
    JobCancelled,
    MaxRetriesExceeded,
    /// A code reported by the backend that the console does not know about.
    Other(String),
}

impl OcrErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            OcrErrorCode::IncompatibleDocument => "INCOMPATIBLE_DOCUMENT",
            OcrErrorCode::StartJobFailed => "START_JOB_FAILED",
            OcrErrorCode::ProcessingFailed => "PROCESSING_FAILED",
            OcrErrorCode::PollingFailed => "POLLING_FAILED",
            OcrErrorCode::JobCancelled => "JOB_CANCELLED",
            OcrErrorCode::MaxRetriesExceeded => "MAX_RETRIES_EXCEEDED",
            OcrErrorCode::Other(code) => code,
        }
    }
}

impl std::fmt::Display for OcrErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for OcrErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "INCOMPATIBLE_DOCUMENT" => OcrErrorCode::IncompatibleDocument,
            "START_JOB_FAILED" => OcrErrorCode::StartJobFailed,
            "PROCESSING_FAILED" => OcrErrorCode::ProcessingFailed,
            "POLLING_FAILED" => OcrErrorCode::PollingFailed,
            "JOB_CANCELLED" => OcrErrorCode::JobCancelled,
            "MAX_RETRIES_EXCEEDED" => OcrErrorCode::MaxRetriesExceeded,
            _ => OcrErrorCode::Other(code),
        }
    }
}

impl From<OcrErrorCode> for String {
    fn from(code: OcrErrorCode) -> Self {
        code.as_str().to_string()
    }
}

/// An OCR failure as delivered to `on_error` and stored on the job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrError {
    pub code: OcrErrorCode,
    pub message: String,
    pub recoverable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl OcrError {
    pub fn new(code: OcrErrorCode, message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            code,
            message: message.into(),
            recoverable,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// An OCR job tracked by the console.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrJob {
    pub id: String,
    pub document_id: String,
    pub status: OcrJobStatus,
    pub progress: u8,
    pub language: String,
    pub retry_count: u32,
    pub max_retries: u32,
    pub settings: ProcessingSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OcrError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_secs: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OcrJob {
    pub fn new(
        id: impl Into<String>,
        document_id: impl Into<String>,
        settings: ProcessingSettings,
        max_retries: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            document_id: document_id.into(),
            status: OcrJobStatus::Pending,
            progress: 0,
            language: settings.language.clone(),
            retry_count: 0,
            max_retries,
            settings,
            error: None,
            estimated_time_secs: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Block,
    Line,
    Word,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A positioned run of recognised text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub confidence: f64,
    pub page: u32,
    pub bbox: BoundingBox,
    pub kind: BlockKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QualityMetrics {
    pub readability: f64,
    pub text_density: f64,
    pub low_confidence_words: u32,
    pub word_count: u32,
}

/// Text extracted from a document. Created once when its job completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrResult {
    pub document_id: String,
    pub job_id: String,
    pub text: String,
    /// Overall confidence in 0.0..=1.0.
    pub confidence: f64,
    #[serde(default)]
    pub page_confidences: Vec<f64>,
    #[serde(default)]
    pub quality: QualityMetrics,
    #[serde(default)]
    pub blocks: Vec<TextBlock>,
    pub language: String,
    pub completed_at: DateTime<Utc>,
}

impl OcrResult {
    pub fn low_confidence_blocks(&self, threshold: f64) -> impl Iterator<Item = &TextBlock> {
        self.blocks.iter().filter(move |b| b.confidence < threshold)
    }
}

/// Body of `POST /api/v1/ocr/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJobRequest {
    pub document_id: String,
    pub document_url: String,
    pub settings: ProcessingSettings,
}

/// Response of `POST /api/v1/ocr/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJobResponse {
    pub job_id: String,
    #[serde(default)]
    pub estimated_time: Option<u64>,
    pub status: OcrJobStatus,
}

/// One tick of a status poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusUpdate {
    pub job_id: String,
    pub status: OcrJobStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub result: Option<OcrResult>,
    #[serde(default)]
    pub error: Option<OcrError>,
}

impl JobStatusUpdate {
    pub fn progress(job_id: impl Into<String>, progress: u8) -> Self {
        Self {
            job_id: job_id.into(),
            status: OcrJobStatus::Processing,
            progress,
            result: None,
            error: None,
        }
    }

    pub fn completed(job_id: impl Into<String>, result: OcrResult) -> Self {
        Self {
            job_id: job_id.into(),
            status: OcrJobStatus::Completed,
            progress: 100,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(job_id: impl Into<String>, error: OcrError) -> Self {
        Self {
            job_id: job_id.into(),
            status: OcrJobStatus::Failed,
            progress: 0,
            result: None,
            error: Some(error),
        }
    }
}

/// Fresh identifier for locally created records such as queue entries.
pub fn new_local_id() -> String {
    Uuid::new_v4().to_string()
}
