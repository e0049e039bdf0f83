//! HTTP handlers

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use form_fill::{
    fill_json, generate_backflow_report, parse_elements, render_reference_sheet,
    ElementSummary, FillOutput, ReportStrategy,
};
use pdf_core::has_pdf_magic;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::models::*;
use crate::state::AppState;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const SKIPPED_ELEMENTS_HEADER: &str = "x-skipped-elements";
const DEFAULT_FORM_NAME: &str = "Form";
const DEFAULT_DRAFT_NAME: &str = "Draft.pdf";
const DEFAULT_COMPLETED_NAME: &str = "Completed Form.pdf";

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "TitanPDF Backend API",
        mode: state.environment.as_str(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        template_configured: state.tceq_template.is_some(),
    })
}

/// Stamp elements onto an inline PDF and return the result
pub async fn fill_pdf(ApiJson(req): ApiJson<FillRequest>) -> Result<Response, ApiError> {
    let source = BASE64
        .decode(req.pdf_base64.trim())
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid PDF base64: {}", e)))?;

    let output = run_fill(source, req.elements).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE));
    let skipped = serde_json::to_string(&output.skipped).map_err(|e| ApiError::Internal(e.into()))?;
    match HeaderValue::from_str(&skipped) {
        Ok(value) => {
            headers.insert(SKIPPED_ELEMENTS_HEADER, value);
        }
        Err(_) => tracing::warn!("Skipped element report is not a valid header value"),
    }

    Ok((headers, output.bytes).into_response())
}

/// Stream a job attachment back to the editor
pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    Path((_job_id, attachment_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let bytes = download_pdf(&state, &attachment_id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE));
    let disposition = format!(
        "inline; filename=\"attachment_{}.pdf\"",
        attachment_id.replace('"', "")
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=3600"),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    Ok((headers, bytes).into_response())
}

/// Fill a job attachment and upload the completed form to the job
pub async fn save_attachment(
    State(state): State<Arc<AppState>>,
    Path((job_id, attachment_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<SaveAttachmentRequest>,
) -> Result<Json<SaveAttachmentResponse>, ApiError> {
    if req.editable_elements.is_empty() {
        return Err(ApiError::InvalidRequest(
            "No form elements provided".to_string(),
        ));
    }

    let original = download_pdf(&state, &attachment_id).await?;
    let elements = req.editable_elements;
    let element_count = elements.len();

    let (output, summary) = tokio::task::spawn_blocking(move || {
        let output = fill_json(&original, &elements)?;
        let parsed = parse_elements(&elements)?;
        let summary = ElementSummary::from_elements(parsed.elements.iter().map(|(_, e)| e));
        Ok::<_, form_fill::FillError>((output, summary))
    })
    .await
    .map_err(|e| ApiError::Internal(e.into()))??;

    let original_file_name = req
        .original_file_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_FORM_NAME.to_string());
    let file_name = completed_file_name(&original_file_name);
    let file_size = output.bytes.len();

    let receipt = state
        .attachments
        .upload(&job_id, &file_name, output.bytes)
        .await?;

    tracing::info!(
        "Uploaded {} ({} bytes) to job {} as attachment {}",
        file_name,
        file_size,
        job_id,
        receipt.id
    );

    Ok(Json(SaveAttachmentResponse {
        success: true,
        message: "PDF form completed and uploaded successfully".to_string(),
        file_name,
        file_size,
        elements_processed: element_count,
        upload_details: UploadDetails {
            service_titan_id: receipt.id,
            uploaded_at: receipt.uploaded_at,
            original_file_name,
            fields_processed: summary,
        },
        skipped: output.skipped,
    }))
}

/// Fill a job attachment and keep it as a draft
pub async fn save_draft(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SaveDraftRequest>,
) -> Result<Json<DraftResponse>, ApiError> {
    let (Some(job_id), Some(attachment_id), Some(objects)) = (
        non_empty(req.job_id),
        non_empty(req.attachment_id),
        req.objects,
    ) else {
        return Err(ApiError::InvalidRequest(
            "Missing required fields: jobId, attachmentId, objects".to_string(),
        ));
    };
    let file_name = req
        .file_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_DRAFT_NAME.to_string());

    let original = download_pdf(&state, attachment_id.as_str()).await?;
    let output = run_fill(original, objects).await?;

    let stored = state
        .documents
        .put(&draft_folder(&job_id), &file_name, output.bytes)
        .await?;

    tracing::info!("Saved draft {} for job {}", stored.id, job_id.as_str());

    Ok(Json(DraftResponse {
        success: true,
        message: "PDF saved as draft".to_string(),
        file_id: stored.id,
        file_name: stored.file_name,
        folder: stored.folder,
        skipped: output.skipped,
    }))
}

/// Re-fill a stored draft and replace it
pub async fn update_draft(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    ApiJson(req): ApiJson<UpdateDraftRequest>,
) -> Result<Json<DraftResponse>, ApiError> {
    let (Some(job_id), Some(objects)) = (non_empty(req.job_id), req.objects) else {
        return Err(ApiError::InvalidRequest(
            "Missing required fields: jobId, objects".to_string(),
        ));
    };
    let file_name = req
        .file_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_DRAFT_NAME.to_string());

    let existing = state.documents.get(&file_id).await?;
    let output = run_fill(existing, objects).await?;

    let stored = state
        .documents
        .update(&file_id, &file_name, output.bytes)
        .await?;

    tracing::info!("Updated draft {} for job {}", stored.id, job_id.as_str());

    Ok(Json(DraftResponse {
        success: true,
        message: "Draft updated successfully".to_string(),
        file_id: stored.id,
        file_name: stored.file_name,
        folder: stored.folder,
        skipped: output.skipped,
    }))
}

/// Drafts and completed forms for a job
pub async fn list_drafts(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<DraftListResponse>, ApiError> {
    let job = Id(job_id);
    let drafts = state.documents.list(&draft_folder(&job)).await?;
    let completed = state.documents.list(&completed_folder(&job)).await?;

    Ok(Json(DraftListResponse {
        success: true,
        job_id: job.0,
        drafts,
        completed,
    }))
}

/// Download a stored draft
pub async fn download_draft(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.documents.get(&file_id).await?;
    if bytes.is_empty() {
        return Err(ApiError::NotFound("File".to_string()));
    }
    if !has_pdf_magic(&bytes) {
        return Err(ApiError::InvalidRequest(
            "Downloaded file is not a valid PDF".to_string(),
        ));
    }

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, no-cache"),
    );

    Ok((headers, bytes).into_response())
}

/// Move a draft to the job's completed folder and upload it to the job
pub async fn complete_draft(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    ApiJson(req): ApiJson<CompleteDraftRequest>,
) -> Result<Json<CompleteDraftResponse>, ApiError> {
    let Some(job_id) = non_empty(req.job_id) else {
        return Err(ApiError::InvalidRequest(
            "Missing required field: jobId".to_string(),
        ));
    };

    let moved = state
        .documents
        .move_to(&file_id, &completed_folder(&job_id))
        .await?;
    let bytes = state.documents.get(&file_id).await?;
    let file_name = finalized_draft_name(&moved.file_name);

    let receipt = state
        .attachments
        .upload(job_id.as_str(), &file_name, bytes)
        .await?;

    tracing::info!(
        "Completed draft {} as {} on job {}",
        file_id,
        file_name,
        job_id.as_str()
    );

    Ok(Json(CompleteDraftResponse {
        success: true,
        message: "Form completed and uploaded successfully".to_string(),
        file_id,
        file_name,
        folder: moved.folder,
        uploaded_at: receipt.uploaded_at,
        service_titan_id: receipt.id,
    }))
}

/// Generate a test report, upload it to the job and register it
pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GenerateReportRequest>,
) -> Result<Json<DataResponse<GeneratedPdf>>, ApiError> {
    let template = state.tceq_template.clone();
    let record = req.record;
    let city_code = record.city_code.clone();

    let report = tokio::task::spawn_blocking(move || {
        generate_backflow_report(template.as_deref().map(Vec::as_slice), &record)
    })
    .await
    .map_err(|e| ApiError::Internal(e.into()))??;

    let mut attachment_id = None;
    if let Some(job_id) = req.job_id.as_ref().filter(|id| !id.as_str().is_empty()) {
        match state
            .attachments
            .upload(job_id.as_str(), &report.file_name, report.bytes.clone())
            .await
        {
            Ok(receipt) => {
                tracing::info!(
                    "Uploaded {} to job {} as attachment {}",
                    report.file_name,
                    job_id.as_str(),
                    receipt.id
                );
                attachment_id = Some(receipt.id);
            }
            Err(e) => tracing::warn!("Report upload to job {} failed: {}", job_id.as_str(), e),
        }
    }

    // Reports that reached the job are only downloadable from there
    let bytes = match attachment_id {
        Some(_) => None,
        None => Some(report.bytes),
    };

    let generated = GeneratedPdf {
        id: format!("pdf-{}", Uuid::new_v4()),
        device_id: req.device_id,
        test_record_id: req.test_record_id,
        job_id: req.job_id,
        file_name: report.file_name,
        city_code,
        strategy: report.strategy,
        service_titan_attachment_id: attachment_id,
        is_online_reference: false,
        created_at: Utc::now(),
        bytes,
    };
    register(&state, &generated).await;

    Ok(Json(DataResponse {
        success: true,
        data: generated,
    }))
}

/// Generate the reference sheet and keep it for download
pub async fn generate_online_reference(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GenerateReportRequest>,
) -> Result<Json<DataResponse<GeneratedPdf>>, ApiError> {
    let record = req.record;
    let file_name = record.reference_file_name();
    let city_code = record.city_code.clone();

    let bytes = tokio::task::spawn_blocking(move || render_reference_sheet(&record))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??;

    let generated = GeneratedPdf {
        id: format!("pdf-{}", Uuid::new_v4()),
        device_id: req.device_id,
        test_record_id: req.test_record_id,
        job_id: req.job_id,
        file_name,
        city_code,
        strategy: ReportStrategy::ReferenceSheet,
        service_titan_attachment_id: None,
        is_online_reference: true,
        created_at: Utc::now(),
        bytes: Some(bytes),
    };
    register(&state, &generated).await;

    Ok(Json(DataResponse {
        success: true,
        data: generated,
    }))
}

/// Download a generated report
pub async fn get_generated(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let (file_name, bytes) = {
        let mut generated = state.generated.lock().await;
        let pdf = generated
            .get(&id)
            .ok_or_else(|| ApiError::NotFound("PDF".to_string()))?;
        let bytes = pdf.bytes.clone().ok_or_else(|| {
            ApiError::Gone(
                "PDF was uploaded to the job and is no longer stored locally. \
                 Download it from the job attachments."
                    .to_string(),
            )
        })?;
        (pdf.file_name.clone(), bytes)
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE));
    let disposition = format!("attachment; filename=\"{}\"", file_name.replace('"', ""));
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    Ok((headers, bytes).into_response())
}

/// `Completed - {name}.pdf`, where the name loses its `.pdf` extension,
/// any folder prefix and an upload suffix such as `@@1234-abc`
pub fn completed_file_name(original: &str) -> String {
    let mut name = original;

    if let Some(stem_len) = name.len().checked_sub(4) {
        if name
            .get(stem_len..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(".pdf"))
        {
            name = &name[..stem_len];
        }
    }

    if let Some((_, last)) = name.rsplit_once('/') {
        name = last;
    }

    let suffix = name.match_indices("@@").find(|(pos, _)| {
        name.as_bytes()
            .get(pos + 2)
            .is_some_and(|b| b.is_ascii_digit())
    });
    if let Some((pos, _)) = suffix {
        name = &name[..pos];
    }

    format!("Completed - {name}.pdf")
}

/// `Completed - {name}` for a finished draft, without doubling the prefix
/// or keeping an `Attaches/` folder prefix
pub fn finalized_draft_name(stored: &str) -> String {
    let name = if stored.is_empty() {
        DEFAULT_COMPLETED_NAME
    } else {
        stored
    };
    let name = name.strip_prefix("Attaches/").unwrap_or(name);
    let name = strip_completed_prefix(name);

    if name.to_ascii_lowercase().ends_with(".pdf") {
        format!("Completed - {name}")
    } else {
        format!("Completed - {name}.pdf")
    }
}

/// Drop a leading `Completed -`, in any case and with any spacing
fn strip_completed_prefix(name: &str) -> &str {
    const PREFIX: &str = "completed";
    match name.get(..PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(PREFIX) => {
            match name[PREFIX.len()..].trim_start().strip_prefix('-') {
                Some(rest) => rest.trim_start(),
                None => name,
            }
        }
        _ => name,
    }
}

async fn download_pdf(state: &AppState, attachment_id: &str) -> Result<Vec<u8>, ApiError> {
    let bytes = state.attachments.download(attachment_id).await?;
    if !has_pdf_magic(&bytes) {
        return Err(ApiError::Upstream(
            "Downloaded file is not a valid PDF".to_string(),
        ));
    }
    Ok(bytes)
}

async fn run_fill(source: Vec<u8>, elements: Vec<Value>) -> Result<FillOutput, ApiError> {
    let output = tokio::task::spawn_blocking(move || fill_json(&source, &elements))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??;
    Ok(output)
}

async fn register(state: &AppState, generated: &GeneratedPdf) {
    let mut cache = state.generated.lock().await;
    cache.insert(generated.id.clone(), generated.clone());
}

fn draft_folder(job_id: &Id) -> String {
    format!("drafts/{}", job_id.as_str())
}

fn completed_folder(job_id: &Id) -> String {
    format!("completed/{}", job_id.as_str())
}

fn non_empty(id: Option<Id>) -> Option<Id> {
    id.filter(|id| !id.as_str().is_empty())
}
