use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::error;
use uuid::Uuid;

use super::ViewContext;
use crate::models::resume::{resume_key, AtsSection, FeedbackState, ResumeRecord};
use crate::previews::{PreviewCell, PreviewSlot};
use crate::render::{PDF_MIME, PNG_MIME};

pub const ERR_NOT_FOUND: &str = "Resume not found";
pub const ERR_LOAD_FAILED: &str = "Failed to load resume data";

/// Detail page: PDF link, page preview and the full feedback.
pub struct ResumeDetailView {
    ctx: ViewContext,
    resume_id: Uuid,
    pdf: PreviewSlot,
    pdf_cell: PreviewCell,
    image: PreviewSlot,
    image_cell: PreviewCell,
    record: Option<ResumeRecord>,
    load_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailSnapshot {
    pub resume_id: Uuid,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub resume_url: Option<String>,
    pub image_url: Option<String>,
    /// `None` while analysis is pending.
    pub feedback: Option<Value>,
    pub ats: Option<AtsSection>,
    pub load_error: Option<String>,
}

impl ResumeDetailView {
    pub fn mount(ctx: &ViewContext, resume_id: Uuid) -> Self {
        let pdf_cell = PreviewCell::default();
        let image_cell = PreviewCell::default();
        Self {
            pdf: PreviewSlot::new(
                ctx.blobs.clone(),
                ctx.previews.clone(),
                PDF_MIME,
                Arc::new(pdf_cell.clone()),
            ),
            image: PreviewSlot::new(
                ctx.blobs.clone(),
                ctx.previews.clone(),
                PNG_MIME,
                Arc::new(image_cell.clone()),
            ),
            ctx: ctx.clone(),
            resume_id,
            pdf_cell,
            image_cell,
            record: None,
            load_error: None,
        }
    }

    /// Reads the record and points both previews at its blobs.
    /// Calling it again only reloads previews whose path changed.
    pub async fn load(&mut self) {
        let record = match self.ctx.kv.get(&resume_key(&self.resume_id)).await {
            Ok(Some(raw)) => match serde_json::from_str::<ResumeRecord>(&raw) {
                Ok(record) => record,
                Err(e) => {
                    error!("Error parsing resume {}: {e}", self.resume_id);
                    return self.fail(ERR_LOAD_FAILED);
                }
            },
            Ok(None) => return self.fail(ERR_NOT_FOUND),
            Err(e) => {
                error!("Error loading resume {}: {e}", self.resume_id);
                return self.fail(ERR_LOAD_FAILED);
            }
        };

        self.load_error = None;
        self.pdf.set_source(&record.resume_path);
        self.image.set_source(&record.image_path);
        self.record = Some(record);

        tokio::join!(self.pdf.settled(), self.image.settled());
    }

    /// Drops whatever an earlier load showed; only the error remains.
    fn fail(&mut self, message: &str) {
        self.load_error = Some(message.to_string());
        self.record = None;
        self.pdf.clear();
        self.image.clear();
    }

    pub fn snapshot(&self) -> DetailSnapshot {
        let record = self.record.as_ref();
        let feedback = record.map(|r| &r.feedback);
        DetailSnapshot {
            resume_id: self.resume_id,
            company_name: record.map(|r| r.company_name.clone()),
            job_title: record.map(|r| r.job_title.clone()),
            resume_url: self.pdf_cell.snapshot().url,
            image_url: self.image_cell.snapshot().url,
            feedback: feedback
                .filter(|f| f.is_ready())
                .map(|f| Value::from(f.clone())),
            ats: feedback.filter(|f| f.is_ready()).map(FeedbackState::ats),
            load_error: self.load_error.clone(),
        }
    }
}
