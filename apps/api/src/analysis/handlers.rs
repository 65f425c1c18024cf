//! Axum route handlers for uploads and stored resumes.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::jobs::JobSnapshot;
use crate::analysis::upload_flow::AnalyzeRequest;
use crate::errors::AppError;
use crate::models::resume::{resume_key, ResumeRecord, RESUME_KEY_PREFIX};
use crate::render::{UploadFile, PDF_MIME};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAccepted {
    pub job_id: Uuid,
    pub status_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSummary {
    pub id: Uuid,
    pub company_name: String,
    pub job_title: String,
    pub image_path: String,
    pub overall_score: Option<f64>,
    pub complete: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&ResumeRecord> for ResumeSummary {
    fn from(record: &ResumeRecord) -> Self {
        Self {
            id: record.id,
            company_name: record.company_name.clone(),
            job_title: record.job_title.clone(),
            image_path: record.image_path.clone(),
            overall_score: record.feedback.overall_score(),
            complete: record.is_complete(),
            created_at: record.created_at,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resumes
///
/// Multipart form: `companyName`, `jobTitle`, `jobDescription`, `file`.
/// Starts the upload flow in the background and returns its job id.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadAccepted>), AppError> {
    let request = read_upload_form(multipart, state.config.max_upload_bytes).await?;
    info!(
        "Accepted {} ({} bytes) for {} at {}",
        request.file.name,
        request.file.data.len(),
        request.job_title,
        request.company_name
    );

    let job = state.uploads.start();
    let job_id = job.id();
    tokio::spawn(job.track(state.upload_flow(), request));

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadAccepted {
            job_id,
            status_url: format!("/api/v1/uploads/{job_id}"),
        }),
    ))
}

/// GET /api/v1/uploads/:job_id
pub async fn handle_get_upload(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobSnapshot>, AppError> {
    state
        .uploads
        .get(&job_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Upload {job_id} not found")))
}

/// GET /api/v1/resumes
///
/// All stored resumes, newest first.
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResumeSummary>>, AppError> {
    let entries = state.kv.list(RESUME_KEY_PREFIX).await?;

    let mut records: Vec<ResumeRecord> = entries
        .iter()
        .filter_map(|(key, value)| match serde_json::from_str(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping unreadable record {key}: {e}");
                None
            }
        })
        .collect();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(records.iter().map(ResumeSummary::from).collect()))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeRecord>, AppError> {
    let raw = state
        .kv
        .get(&resume_key(&id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;

    let record = serde_json::from_str(&raw)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt record {id}: {e}")))?;
    Ok(Json(record))
}

// ────────────────────────────────────────────────────────────────────────────
// Form parsing
// ────────────────────────────────────────────────────────────────────────────

async fn read_upload_form(
    mut multipart: Multipart,
    max_upload_bytes: usize,
) -> Result<AnalyzeRequest, AppError> {
    let mut company_name = None;
    let mut job_title = None;
    let mut job_description = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "companyName" => company_name = Some(field.text().await.map_err(multipart_error)?),
            "jobTitle" => job_title = Some(field.text().await.map_err(multipart_error)?),
            "jobDescription" => {
                job_description = Some(field.text().await.map_err(multipart_error)?)
            }
            "file" => {
                let name = field.file_name().unwrap_or("resume.pdf").to_string();
                let content_type = field.content_type().map(str::to_string);
                if !is_pdf(content_type.as_deref(), &name) {
                    return Err(AppError::UnsupportedMediaType(format!(
                        "{name}: only PDF files are accepted"
                    )));
                }
                let data: Bytes = field.bytes().await.map_err(multipart_error)?;
                if data.len() > max_upload_bytes {
                    return Err(AppError::PayloadTooLarge(format!(
                        "{name} is {} bytes; the limit is {max_upload_bytes}",
                        data.len()
                    )));
                }
                file = Some(UploadFile {
                    name,
                    content_type: PDF_MIME.to_string(),
                    data,
                });
            }
            other => warn!("Ignoring unexpected form field '{other}'"),
        }
    }

    let file = file
        .filter(|f| !f.data.is_empty())
        .ok_or_else(|| AppError::Validation("Please upload a resume file".to_string()))?;

    Ok(AnalyzeRequest {
        company_name: required(company_name, "companyName")?,
        job_title: required(job_title, "jobTitle")?,
        job_description: required(job_description, "jobDescription")?,
        file,
    })
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

fn is_pdf(content_type: Option<&str>, file_name: &str) -> bool {
    let named_pdf = file_name.to_ascii_lowercase().ends_with(".pdf");
    match content_type {
        Some(PDF_MIME) => true,
        None | Some("application/octet-stream") => named_pdf,
        Some(_) => false,
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Invalid upload form: {}", e.body_text()))
    }
}
