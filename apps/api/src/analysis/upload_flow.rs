//! Upload flow: PDF upload → preview render → image upload → record → AI feedback.
//!
//! Each checkpoint publishes a status string. A failing checkpoint ends the flow
//! with an `Error:` status; nothing is raised and nothing is rolled back, so an
//! abort after step 1 leaves the uploaded PDF behind.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::feedback::{parse_feedback, FeedbackProvider};
use crate::analysis::prompts::prepare_instructions;
use crate::models::resume::{resume_key, FeedbackState, ResumeRecord};
use crate::previews::PreviewRegistry;
use crate::render::{convert_pdf_to_image, PageRasterizer, UploadFile};
use crate::storage::{BlobStore, KvStore};

pub const STATUS_UPLOADING_PDF: &str = "Uploading the File..";
pub const STATUS_CONVERTING: &str = "Converting to Image...";
pub const STATUS_UPLOADING_IMAGE: &str = "Uploading image..";
pub const STATUS_PREPARING: &str = "Preparing data...";
pub const STATUS_ANALYZING: &str = "Analyzing ...";
pub const STATUS_COMPLETE: &str = "Analysis complete, redirecting...";

pub const ERR_UPLOAD_PDF: &str = "Error: Uploading PDF failed";
pub const ERR_CONVERT: &str = "Error: Failed to convert PDF file to image";
pub const ERR_UPLOAD_IMAGE: &str = "Error: Uploading Image failed";
pub const ERR_ANALYZE: &str = "Error: Failed to analyze resume";
pub const ERR_FEEDBACK_FORMAT: &str = "Error: Invalid feedback format";
pub const ERR_UNEXPECTED: &str = "Error: Upload stopped unexpectedly";

/// Observer for flow progress.
pub trait StatusSink: Send + Sync {
    fn report(&self, status: &str);
    /// Preview of the rendered page while the flow runs; `None` once released.
    fn preview(&self, _url: Option<&str>) {}
}

#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub file: UploadFile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlowOutcome {
    Completed { id: Uuid, redirect: String },
    Aborted { status: String },
}

#[derive(Clone)]
pub struct UploadFlow {
    pub blobs: Arc<dyn BlobStore>,
    pub kv: Arc<dyn KvStore>,
    pub feedback: Arc<dyn FeedbackProvider>,
    pub rasterizer: Arc<dyn PageRasterizer>,
    pub previews: PreviewRegistry,
    pub render_scale: f32,
}

impl UploadFlow {
    pub async fn run(&self, request: AnalyzeRequest, sink: &dyn StatusSink) -> FlowOutcome {
        let mut preview_url = None;
        let result = self.checkpoints(request, sink, &mut preview_url).await;

        if let Some(url) = preview_url {
            self.previews.revoke_object_url(&url);
            sink.preview(None);
        }

        match result {
            Ok(id) => {
                sink.report(STATUS_COMPLETE);
                info!("Analysis of resume {id} complete");
                FlowOutcome::Completed {
                    id,
                    redirect: format!("/resume/{id}"),
                }
            }
            Err(status) => {
                sink.report(&status);
                FlowOutcome::Aborted { status }
            }
        }
    }

    async fn checkpoints(
        &self,
        request: AnalyzeRequest,
        sink: &dyn StatusSink,
        preview_url: &mut Option<String>,
    ) -> Result<Uuid, String> {
        let AnalyzeRequest {
            company_name,
            job_title,
            job_description,
            file,
        } = request;

        // 1. Original PDF
        sink.report(STATUS_UPLOADING_PDF);
        let uploaded_file = self
            .blobs
            .upload(&file.name, &file.content_type, file.data.clone())
            .await
            .map_err(|e| {
                warn!("Uploading {} failed: {e}", file.name);
                ERR_UPLOAD_PDF.to_string()
            })?;
        info!("Stored {} at {}", uploaded_file.name, uploaded_file.path);

        // 2. Page 1 preview
        sink.report(STATUS_CONVERTING);
        let conversion =
            convert_pdf_to_image(self.rasterizer.clone(), &self.previews, &file, self.render_scale)
                .await;
        let Some(image_file) = conversion.file else {
            return Err(conversion
                .error
                .map(|e| format!("Error: {e}"))
                .unwrap_or_else(|| ERR_CONVERT.to_string()));
        };
        sink.preview(Some(&conversion.image_url));
        *preview_url = Some(conversion.image_url);

        // 3. Preview image
        sink.report(STATUS_UPLOADING_IMAGE);
        let uploaded_image = self
            .blobs
            .upload(&image_file.name, &image_file.content_type, image_file.data)
            .await
            .map_err(|e| {
                warn!("Uploading {} failed: {e}", image_file.name);
                ERR_UPLOAD_IMAGE.to_string()
            })?;
        info!("Stored {} at {}", uploaded_image.name, uploaded_image.path);

        // 4. Pending record
        sink.report(STATUS_PREPARING);
        let id = Uuid::new_v4();
        let key = resume_key(&id);
        let mut record = ResumeRecord {
            id,
            resume_path: uploaded_file.path.clone(),
            image_path: uploaded_image.path,
            company_name,
            job_title,
            job_description,
            feedback: FeedbackState::Pending,
            created_at: Some(Utc::now()),
        };
        self.persist(&key, &record).await?;

        // 5. AI feedback
        sink.report(STATUS_ANALYZING);
        let instructions = prepare_instructions(&record.job_title, &record.job_description);
        let response = match self
            .feedback
            .feedback(&uploaded_file.path, &instructions)
            .await
        {
            Ok(Some(response)) => response,
            Ok(None) => return Err(ERR_ANALYZE.to_string()),
            Err(e) => {
                error!("Analysis of resume {id} failed: {e}");
                return Err(ERR_ANALYZE.to_string());
            }
        };

        let feedback = parse_feedback(response.text().unwrap_or_default()).ok_or_else(|| {
            error!("Failed to parse feedback for resume {id}");
            ERR_FEEDBACK_FORMAT.to_string()
        })?;
        record.feedback = FeedbackState::Ready(feedback);
        self.persist(&key, &record).await?;

        Ok(id)
    }

    async fn persist(&self, key: &str, record: &ResumeRecord) -> Result<(), String> {
        let json = serde_json::to_string(record).map_err(|e| format!("Error: {e}"))?;
        self.kv.set(key, &json).await.map_err(|e| {
            error!("Persisting {key} failed: {e}");
            format!("Error: {e}")
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use parking_lot::Mutex;

    use super::*;
    use crate::render::{MupdfRasterizer, RenderError, PDF_MIME};
    use crate::storage::MemoryKv;
    use crate::test_support::{
        sample_pdf, FailingBlobStore, MemoryBlobStore, StubFeedback, StubRasterizer,
    };

    #[derive(Default)]
    struct RecordingSink {
        statuses: Mutex<Vec<String>>,
        previews: Mutex<Vec<Option<String>>>,
    }

    impl RecordingSink {
        fn statuses(&self) -> Vec<String> {
            self.statuses.lock().clone()
        }
    }

    impl StatusSink for RecordingSink {
        fn report(&self, status: &str) {
            self.statuses.lock().push(status.to_string());
        }
        fn preview(&self, url: Option<&str>) {
            self.previews.lock().push(url.map(String::from));
        }
    }

    fn request() -> AnalyzeRequest {
        AnalyzeRequest {
            company_name: "Acme".into(),
            job_title: "Platform Engineer".into(),
            job_description: "Run the fleet".into(),
            file: UploadFile {
                name: "jane.pdf".into(),
                content_type: PDF_MIME.into(),
                data: Bytes::from(sample_pdf(200, 100)),
            },
        }
    }

    struct Harness {
        flow: UploadFlow,
        kv: MemoryKv,
        previews: PreviewRegistry,
    }

    fn harness(
        blobs: Arc<dyn BlobStore>,
        feedback: StubFeedback,
        rasterizer: Arc<dyn PageRasterizer>,
    ) -> Harness {
        let kv = MemoryKv::new();
        let previews = PreviewRegistry::new();
        let flow = UploadFlow {
            blobs,
            kv: Arc::new(kv.clone()),
            feedback: Arc::new(feedback),
            rasterizer,
            previews: previews.clone(),
            render_scale: 2.0,
        };
        Harness { flow, kv, previews }
    }

    const GOOD_FEEDBACK: &str =
        r#"{"overallScore": 78, "ATS": {"score": 70, "tips": [{"type": "improve", "tip": "Add keywords"}]}}"#;

    #[tokio::test]
    async fn test_full_flow_persists_parsed_feedback() {
        let blobs = MemoryBlobStore::default();
        let feedback = StubFeedback::replying(GOOD_FEEDBACK);
        let h = harness(
            Arc::new(blobs.clone()),
            feedback.clone(),
            Arc::new(MupdfRasterizer),
        );
        let sink = RecordingSink::default();

        let outcome = h.flow.run(request(), &sink).await;

        let FlowOutcome::Completed { id, redirect } = outcome else {
            panic!("flow aborted: {:?}", sink.statuses());
        };
        assert_eq!(redirect, format!("/resume/{id}"));
        assert_eq!(
            sink.statuses(),
            vec![
                STATUS_UPLOADING_PDF,
                STATUS_CONVERTING,
                STATUS_UPLOADING_IMAGE,
                STATUS_PREPARING,
                STATUS_ANALYZING,
                STATUS_COMPLETE,
            ]
        );

        let stored = h.kv.get(&resume_key(&id)).await.unwrap().unwrap();
        let raw: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert!(raw["feedback"]["overallScore"].is_number());

        let record: ResumeRecord = serde_json::from_str(&stored).unwrap();
        assert!(record.is_complete());
        assert_eq!(record.company_name, "Acme");
        assert!(record.image_path.ends_with("/jane.png"));
        assert_eq!(blobs.len(), 2);

        // AI saw the uploaded PDF path and the job-specific instructions.
        let calls = feedback.calls();
        assert_eq!(calls[0].0, record.resume_path);
        assert!(calls[0].1.contains("Platform Engineer"));

        // The transient preview is released when the flow ends.
        assert_eq!(h.previews.live_count(), 0);
        let previews = sink.previews.lock().clone();
        assert!(previews[0].is_some());
        assert_eq!(previews.last().unwrap(), &None);
    }

    #[tokio::test]
    async fn test_image_upload_failure_never_writes_record() {
        let blobs = FailingBlobStore::fail_on_upload(2);
        let h = harness(
            Arc::new(blobs),
            StubFeedback::replying(GOOD_FEEDBACK),
            Arc::new(StubRasterizer::blank(10, 10)),
        );
        let sink = RecordingSink::default();

        let outcome = h.flow.run(request(), &sink).await;

        assert_eq!(
            outcome,
            FlowOutcome::Aborted {
                status: ERR_UPLOAD_IMAGE.to_string()
            }
        );
        assert!(!sink.statuses().contains(&STATUS_PREPARING.to_string()));
        assert!(h.kv.list("resume:").await.unwrap().is_empty());
        assert_eq!(h.previews.live_count(), 0);
    }

    #[tokio::test]
    async fn test_pdf_upload_failure_stops_before_conversion() {
        let h = harness(
            Arc::new(FailingBlobStore::fail_on_upload(1)),
            StubFeedback::replying(GOOD_FEEDBACK),
            Arc::new(StubRasterizer::blank(10, 10)),
        );
        let sink = RecordingSink::default();

        h.flow.run(request(), &sink).await;

        assert_eq!(sink.statuses(), vec![STATUS_UPLOADING_PDF, ERR_UPLOAD_PDF]);
    }

    #[tokio::test]
    async fn test_conversion_failure_surfaces_error_status() {
        let blobs = MemoryBlobStore::default();
        let h = harness(
            Arc::new(blobs.clone()),
            StubFeedback::replying(GOOD_FEEDBACK),
            Arc::new(StubRasterizer::failing(|| RenderError::SurfaceUnavailable {
                width: 0,
                height: 0,
            })),
        );
        let sink = RecordingSink::default();

        let outcome = h.flow.run(request(), &sink).await;

        let FlowOutcome::Aborted { status } = outcome else {
            panic!("expected abort");
        };
        assert!(status.starts_with("Error: "));
        assert!(status.contains("surface unavailable"));
        // Only the original PDF made it to storage.
        assert_eq!(blobs.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_feedback_leaves_record_pending() {
        let h = harness(
            Arc::new(MemoryBlobStore::default()),
            StubFeedback::replying("I think this resume is great!"),
            Arc::new(StubRasterizer::blank(10, 10)),
        );
        let sink = RecordingSink::default();

        let outcome = h.flow.run(request(), &sink).await;

        assert_eq!(
            outcome,
            FlowOutcome::Aborted {
                status: ERR_FEEDBACK_FORMAT.to_string()
            }
        );
        let records = h.kv.list("resume:").await.unwrap();
        assert_eq!(records.len(), 1);
        let record: ResumeRecord = serde_json::from_str(&records[0].1).unwrap();
        assert_eq!(record.feedback, FeedbackState::Pending);
    }

    #[tokio::test]
    async fn test_unavailable_ai_aborts_analysis() {
        let h = harness(
            Arc::new(MemoryBlobStore::default()),
            StubFeedback::unavailable(),
            Arc::new(StubRasterizer::blank(10, 10)),
        );
        let sink = RecordingSink::default();

        let outcome = h.flow.run(request(), &sink).await;

        assert_eq!(
            outcome,
            FlowOutcome::Aborted {
                status: ERR_ANALYZE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_flows_get_distinct_ids() {
        let h = harness(
            Arc::new(MemoryBlobStore::default()),
            StubFeedback::replying(GOOD_FEEDBACK),
            Arc::new(StubRasterizer::blank(10, 10)),
        );
        let (a, b) = (RecordingSink::default(), RecordingSink::default());

        let (first, second) = tokio::join!(h.flow.run(request(), &a), h.flow.run(request(), &b));

        match (first, second) {
            (FlowOutcome::Completed { id: x, .. }, FlowOutcome::Completed { id: y, .. }) => {
                assert_ne!(x, y)
            }
            other => panic!("unexpected outcomes: {other:?}"),
        }
        assert_eq!(h.kv.list("resume:").await.unwrap().len(), 2);
    }
}
