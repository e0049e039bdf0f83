//! Request and response bodies

use chrono::{DateTime, Utc};
use form_fill::{BackflowRecord, ElementSummary, ReportStrategy, SkippedElement};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::stores::StoredDocument;

/// An identifier the web client sends either as a number or a string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Id(pub String);

impl Id {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Integer(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Id(text),
            Raw::Integer(n) => Id(n.to_string()),
        })
    }
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub mode: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub template_configured: bool,
}

/// Stamp elements onto a PDF sent inline
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRequest {
    pub pdf_base64: String,
    #[serde(default)]
    pub elements: Vec<Value>,
}

/// Fill a job attachment and upload the completed form back to the job
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAttachmentRequest {
    #[serde(default)]
    pub editable_elements: Vec<Value>,
    pub original_file_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAttachmentResponse {
    pub success: bool,
    pub message: String,
    pub file_name: String,
    pub file_size: usize,
    pub elements_processed: usize,
    pub upload_details: UploadDetails,
    pub skipped: Vec<SkippedElement>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDetails {
    pub service_titan_id: String,
    pub uploaded_at: DateTime<Utc>,
    pub original_file_name: String,
    pub fields_processed: ElementSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDraftRequest {
    pub job_id: Option<Id>,
    pub attachment_id: Option<Id>,
    pub file_name: Option<String>,
    pub objects: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDraftRequest {
    pub job_id: Option<Id>,
    pub file_name: Option<String>,
    pub objects: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub success: bool,
    pub message: String,
    pub file_id: String,
    pub file_name: String,
    pub folder: String,
    pub skipped: Vec<SkippedElement>,
}

/// Drafts and completed forms kept for a job
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftListResponse {
    pub success: bool,
    pub job_id: String,
    pub drafts: Vec<StoredDocument>,
    pub completed: Vec<StoredDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteDraftRequest {
    pub job_id: Option<Id>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteDraftResponse {
    pub success: bool,
    pub message: String,
    pub file_id: String,
    pub file_name: String,
    pub folder: String,
    pub uploaded_at: DateTime<Utc>,
    pub service_titan_id: String,
}

/// Produce a test report for a device
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub job_id: Option<Id>,
    pub device_id: Option<Id>,
    pub test_record_id: Option<Id>,
    #[serde(flatten)]
    pub record: BackflowRecord,
}

/// A report kept for download
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPdf {
    pub id: String,
    pub device_id: Option<Id>,
    pub test_record_id: Option<Id>,
    pub job_id: Option<Id>,
    pub file_name: String,
    pub city_code: String,
    pub strategy: ReportStrategy,
    pub service_titan_attachment_id: Option<String>,
    pub is_online_reference: bool,
    pub created_at: DateTime<Utc>,
    /// Present until the report has been handed to the job
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}
